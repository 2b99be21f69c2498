//! Memoized compilation of one function, keyed by input type.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, trace};

use super::{Callable, Compiler};
use crate::error::{Error, Result};
use crate::semantic::FunctionExpr;
use crate::types::{MonoType, TypeId, TypeInterner};

type Slot = Arc<OnceLock<Result<Arc<Callable>>>>;

#[derive(Default)]
struct Entries {
    interner: TypeInterner,
    compiled: HashMap<TypeId, Slot>,
}

/// Compiles a function at most once per distinct input type.
///
/// Concurrent requests for the same input type wait for the first
/// compilation and share its result, errors included.
pub struct CompilationCache<'a> {
    compiler: Compiler<'a>,
    function: &'a FunctionExpr,
    entries: Mutex<Entries>,
}

impl<'a> CompilationCache<'a> {
    pub fn new(compiler: Compiler<'a>, function: &'a FunctionExpr) -> Self {
        Self {
            compiler,
            function,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn get(&self, input: &MonoType) -> Result<Arc<Callable>> {
        let slot = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| Error::internal("compilation cache lock poisoned"))?;
            let cached = entries
                .interner
                .lookup(input)
                .and_then(|id| entries.compiled.get(&id).cloned());
            match cached {
                Some(slot) => {
                    trace!(input = %input, "compilation cache hit");
                    Some(slot)
                }
                None if self
                    .compiler
                    .config()
                    .cache_limit
                    .is_some_and(|limit| entries.compiled.len() >= limit) =>
                {
                    debug!(input = %input, "compilation cache full");
                    None
                }
                None => {
                    debug!(input = %input, "compilation cache miss");
                    let id = entries.interner.intern(input);
                    Some(entries.compiled.entry(id).or_default().clone())
                }
            }
        };

        match slot {
            Some(slot) => slot
                .get_or_init(|| self.compile(input))
                .clone(),
            None => self.compile(input),
        }
    }

    /// Number of memoized input types.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.compiled.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compile(&self, input: &MonoType) -> Result<Arc<Callable>> {
        self.compiler.compile(self.function, input).map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::infer::{NoImports, infer};
    use crate::semantic::{Builder, Operator};
    use crate::vm::Value;

    #[test]
    fn test_memoizes_per_input_type() {
        let b = Builder::new();
        let pkg = b.package(vec![b.variable(
            "double",
            b.function(
                vec![b.param("x")],
                b.binary(Operator::Add, b.ident("x"), b.ident("x")),
            ),
        )]);
        let solution = infer(&pkg, &NoImports).unwrap();
        let double = pkg.find_function("double").unwrap();
        let cache = CompilationCache::new(Compiler::new(&solution), double);

        let ints = MonoType::object([("x", MonoType::INT)]);
        let floats = MonoType::object([("x", MonoType::FLOAT)]);
        let first = cache.get(&ints).unwrap();
        let second = cache.get(&ints).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        cache.get(&floats).unwrap();
        assert_eq!(cache.len(), 2);

        let result = first
            .eval(&Value::record([("x", Value::new_int(4))]))
            .unwrap();
        assert_eq!(result, Value::new_int(8));
    }

    #[test]
    fn test_limit_stops_memoizing() {
        let b = Builder::new();
        let pkg = b.package(vec![b.variable(
            "id",
            b.function(vec![b.param("x")], b.ident("x")),
        )]);
        let solution = infer(&pkg, &NoImports).unwrap();
        let id = pkg.find_function("id").unwrap();
        let config = CompilerConfig {
            cache_limit: Some(1),
            ..CompilerConfig::default()
        };
        let cache = CompilationCache::new(Compiler::new(&solution).with_config(config), id);

        cache.get(&MonoType::object([("x", MonoType::INT)])).unwrap();
        let a = cache.get(&MonoType::object([("x", MonoType::STRING)])).unwrap();
        let b = cache.get(&MonoType::object([("x", MonoType::STRING)])).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_cached() {
        let b = Builder::new();
        let pkg = b.package(vec![b.variable(
            "id",
            b.function(vec![b.param("x")], b.ident("x")),
        )]);
        let solution = infer(&pkg, &NoImports).unwrap();
        let id = pkg.find_function("id").unwrap();
        let cache = CompilationCache::new(Compiler::new(&solution), id);

        let wrong = MonoType::object([("y", MonoType::INT)]);
        assert!(cache.get(&wrong).is_err());
        assert!(cache.get(&wrong).is_err());
        assert_eq!(cache.len(), 1);
    }
}
