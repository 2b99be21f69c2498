use std::collections::HashMap;

use crate::types::{KindMap, PolyType, Substitution, TvarSet};

/// A generalized type: every variable in `free` is instantiated afresh at
/// each use of the bound identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub poly_type: PolyType,
    pub free: TvarSet,
    /// Quantified variables that were nullable where the scheme was built.
    pub nullable: TvarSet,
}

impl Scheme {
    /// A scheme with nothing quantified.
    pub fn mono(poly_type: PolyType) -> Self {
        Self {
            poly_type,
            free: TvarSet::new(),
            nullable: TvarSet::new(),
        }
    }

    /// A scheme quantified over every variable of `poly_type`.
    pub fn closed(poly_type: PolyType) -> Self {
        let free = poly_type.free_vars();
        Self {
            poly_type,
            free,
            nullable: TvarSet::new(),
        }
    }
}

/// Type environment: maps identifiers to schemes, with lexical scopes.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<HashMap<String, Scheme>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, scheme: Scheme) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), scheme);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Scheme> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Variables free in the environment under a solved substitution, with
    /// object kinds folded in.
    pub fn free_vars(&self, subst: &Substitution, kinds: &KindMap) -> TvarSet {
        let mut vars = TvarSet::new();
        for scheme in self.scopes.iter().flat_map(|scope| scope.values()) {
            if scheme.poly_type.free_vars().is_subset(&scheme.free) {
                continue;
            }
            let ty = subst.apply(&scheme.poly_type).resolve_poly_type(kinds);
            let quantified: TvarSet = scheme
                .free
                .iter()
                .map(|tv| subst.representative(*tv))
                .collect();
            vars.extend(ty.free_vars().difference(&quantified).copied());
        }
        vars
    }
}
