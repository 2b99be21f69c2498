//! Compilation of inferred functions to register programs.
//!
//! A function is compiled once per concrete input type: parameter types are
//! matched against the input, every node type is resolved under the
//! resulting substitution, and the body is lowered to a `Program`.

mod cache;
mod codegen;
mod dump;
mod monomorphise;

pub use cache::CompilationCache;
pub use dump::{Disassembler, format_program};
pub use monomorphise::match_types;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::infer::TypeSolution;
use crate::semantic::FunctionExpr;
use crate::types::{MonoType, ObjectType, Property};
use crate::vm::{NativeFunction, OperatorTable, Program, Value};

use codegen::Session;

/// Values in scope for compiled programs, keyed by name (`"name"` or
/// `"package.name"`). Native functions are bound as function values.
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    values: HashMap<String, Value>,
}

impl Builtins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn NativeFunction>) {
        self.bind(name, Value::new_function(function));
    }

    /// Bind a plain value, such as a package-level constant.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compiles functions of one inferred package.
#[derive(Debug, Clone)]
pub struct Compiler<'a> {
    solution: &'a TypeSolution,
    operators: &'a OperatorTable,
    builtins: Builtins,
    config: CompilerConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(solution: &'a TypeSolution) -> Self {
        Self {
            solution,
            operators: OperatorTable::builtin(),
            builtins: Builtins::new(),
            config: CompilerConfig::default(),
        }
    }

    pub fn with_builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_operators(mut self, operators: &'a OperatorTable) -> Self {
        self.operators = operators;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `function` for arguments described by `input`, which must be
    /// a record type keyed by parameter name.
    pub fn compile(&self, function: &FunctionExpr, input: &MonoType) -> Result<Callable> {
        let MonoType::Object(args) = input else {
            return Err(Error::conflict(&MonoType::Object(ObjectType::default()), input)
                .at(&function.meta.loc));
        };

        let session = Session::new(
            self.solution,
            &self.builtins,
            self.operators,
            self.config.null_test,
        );
        let lowered = session
            .lower(function, args)
            .map_err(|e| e.at(&function.meta.loc))?;

        debug!(
            input = %input,
            ret = %lowered.ret,
            ops = lowered.program.ops.len(),
            registers = lowered.program.registers,
            instances = session.instances(),
            "compiled function"
        );
        if self.config.dump_programs {
            debug!("\n{}", format_program(&lowered.program));
        }

        Ok(Callable {
            program: lowered.program,
            input: args.clone(),
            ret: lowered.ret,
        })
    }
}

/// Compile `function` with the default configuration and no builtins.
pub fn compile(solution: &TypeSolution, function: &FunctionExpr, input: &MonoType) -> Result<Callable> {
    Compiler::new(solution).compile(function, input)
}

/// A function compiled for one input type.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    program: Arc<Program>,
    input: ObjectType,
    ret: MonoType,
}

impl Callable {
    pub fn input_type(&self) -> &ObjectType {
        &self.input
    }

    /// The type of the values `eval` returns.
    pub fn return_type(&self) -> &MonoType {
        &self.ret
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn dump(&self) -> String {
        format_program(&self.program)
    }

    /// Run the program on a record of arguments laid out like the input type.
    pub fn eval(&self, args: &Value) -> Result<Value> {
        let expected = || MonoType::Object(self.input.clone());
        let record = args
            .as_record()
            .ok_or_else(|| Error::conflict(&expected(), &shape_of(args)))?;
        let matches = record.labels.len() == self.input.len()
            && record
                .labels
                .iter()
                .zip(self.input.labels())
                .all(|(a, b)| a == b);
        if !matches {
            return Err(Error::conflict(&expected(), &shape_of(args)));
        }
        self.program.execute(&record.values, &[])
    }
}

/// The type a value appears to have, for error messages.
fn shape_of(value: &Value) -> MonoType {
    if let Some(record) = value.as_record() {
        return MonoType::Object(ObjectType {
            properties: record
                .labels
                .iter()
                .zip(&record.values)
                .map(|(label, v)| Property {
                    label: label.clone(),
                    ty: shape_of(v),
                })
                .collect(),
        });
    }
    if let Some(array) = value.as_array() {
        return MonoType::array(array.elem.clone());
    }
    MonoType::Basic(value.nature())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::infer::{NoImports, infer};
    use crate::semantic::{Builder, Operator, Package};

    fn package(b: &Builder) -> Package {
        b.package(vec![b.variable(
            "add",
            b.function(
                vec![b.param("a"), b.param("b")],
                b.binary(Operator::Add, b.ident("a"), b.ident("b")),
            ),
        )])
    }

    #[test]
    fn test_input_must_be_a_record() {
        let b = Builder::new();
        let pkg = package(&b);
        let solution = infer(&pkg, &NoImports).unwrap();
        let add = pkg.find_function("add").unwrap();
        let err = compile(&solution, add, &MonoType::INT).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));
    }

    #[test]
    fn test_eval_checks_argument_layout() {
        let b = Builder::new();
        let pkg = package(&b);
        let solution = infer(&pkg, &NoImports).unwrap();
        let add = pkg.find_function("add").unwrap();
        let input = MonoType::object([("a", MonoType::INT), ("b", MonoType::INT)]);
        let callable = compile(&solution, add, &input).unwrap();
        assert_eq!(callable.return_type(), &MonoType::INT);

        let ok = Value::record([("a", Value::new_int(2)), ("b", Value::new_int(3))]);
        assert_eq!(callable.eval(&ok).unwrap(), Value::new_int(5));

        let swapped = Value::record([("b", Value::new_int(2)), ("a", Value::new_int(3))]);
        let err = callable.eval(&swapped).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));

        let err = callable.eval(&Value::new_int(1)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));
    }

    #[test]
    fn test_builtins() {
        #[derive(Debug)]
        struct Len;
        impl NativeFunction for Len {
            fn name(&self) -> &str {
                "len"
            }
            fn call(&self, args: &Value) -> Result<Value> {
                let s = args.field("v").and_then(|v| v.as_str().map(str::len)).unwrap_or(0);
                Ok(Value::new_int(s as i64))
            }
        }

        let mut builtins = Builtins::new();
        assert!(builtins.is_empty());
        builtins.register("strings.len", Arc::new(Len));
        assert_eq!(builtins.len(), 1);
        assert_eq!(
            builtins.get("strings.len").and_then(Value::as_function).unwrap().name(),
            "len"
        );
        assert!(builtins.get("len").is_none());

        builtins.bind("limit", Value::new_int(10));
        assert_eq!(builtins.len(), 2);
        assert_eq!(builtins.get("limit"), Some(&Value::new_int(10)));
    }
}
