use std::collections::{BTreeMap, BTreeSet};

use crate::semantic::{Meta, NodeId, SourceLocation};
use crate::types::{Kind, PolyType, Tvar, TvarSet};

/// Per-node inference record.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub var: Tvar,
    /// Set for nodes whose type was produced directly rather than solved,
    /// e.g. an instantiated identifier.
    pub ty: Option<PolyType>,
}

/// An equality between two types, with the location that demanded it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConstraint {
    pub left: PolyType,
    pub right: PolyType,
    pub loc: SourceLocation,
}

/// Everything the generator learned about a package.
///
/// Append-only while generating; the solver reads it and never mutates it.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    annotations: BTreeMap<NodeId, Annotation>,
    types: Vec<TypeConstraint>,
    kinds: BTreeMap<Tvar, Vec<Kind>>,
    /// Names bound to function expressions at package level.
    functions: BTreeSet<String>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotate(&mut self, meta: &Meta) {
        self.annotations.entry(meta.id).or_insert(Annotation {
            var: meta.var,
            ty: None,
        });
    }

    pub fn set_type(&mut self, meta: &Meta, ty: PolyType) {
        self.annotations.insert(
            meta.id,
            Annotation {
                var: meta.var,
                ty: Some(ty),
            },
        );
    }

    pub fn annotation(&self, id: NodeId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn add_type(&mut self, left: PolyType, right: PolyType, loc: &SourceLocation) {
        self.types.push(TypeConstraint {
            left,
            right,
            loc: loc.clone(),
        });
    }

    pub fn add_kind(&mut self, tv: Tvar, kind: Kind) {
        self.kinds.entry(tv).or_default().push(kind);
    }

    pub(crate) fn pop_type(&mut self) -> Option<TypeConstraint> {
        self.types.pop()
    }

    /// Record whether the package-level binding `name` holds a function.
    pub fn bind_name(&mut self, name: &str, is_function: bool) {
        if is_function {
            self.functions.insert(name.to_string());
        } else {
            self.functions.remove(name);
        }
    }

    pub fn is_package_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    pub fn type_constraints(&self) -> &[TypeConstraint] {
        &self.types
    }

    pub fn kind_constraints(&self) -> &BTreeMap<Tvar, Vec<Kind>> {
        &self.kinds
    }

    /// Free variables of `ty`, following the kinds attached to each variable.
    pub fn free_vars(&self, ty: &PolyType) -> TvarSet {
        let mut vars = TvarSet::new();
        let mut stack: Vec<Tvar> = ty.free_vars().into_iter().collect();
        while let Some(tv) = stack.pop() {
            if !vars.insert(tv) {
                continue;
            }
            for kind in self.kinds.get(&tv).into_iter().flatten() {
                stack.extend(kind.free_vars());
            }
        }
        vars
    }
}
