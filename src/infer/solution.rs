use tracing::debug;

use super::constraints::Constraints;
use super::solve::{Solved, solve};
use crate::error::{Error, Result};
use crate::semantic::{NodeId, SourceLocation};
use crate::types::{KindMap, MonoType, PolyType, Substitution, Tvar};

/// The solved types of every node in a package.
#[derive(Debug, Clone)]
pub struct TypeSolution {
    constraints: Constraints,
    solved: Solved,
}

impl TypeSolution {
    pub fn new(constraints: Constraints) -> Result<Self> {
        let solved = solve(&constraints)?;
        Ok(Self {
            constraints,
            solved,
        })
    }

    pub fn var_of(&self, id: NodeId) -> Result<Tvar> {
        self.constraints
            .annotation(id)
            .map(|a| a.var)
            .ok_or_else(|| Error::internal(format!("node {} was never annotated", id.0)))
    }

    /// Whether `name` is bound to a function expression at package level.
    pub fn is_package_function(&self, name: &str) -> bool {
        self.constraints.is_package_function(name)
    }

    /// The node's type with unconstrained variables left in place.
    pub fn poly_type_of(&self, id: NodeId) -> Result<PolyType> {
        let tv = self.var_of(id)?;
        Ok(self.apply(&PolyType::Var(tv)).resolve_poly_type(&self.solved.kinds))
    }

    /// The node's fully resolved type.
    pub fn type_of(&self, id: NodeId) -> Result<MonoType> {
        let tv = self.var_of(id)?;
        self.apply(&PolyType::Var(tv)).resolve_type(&self.solved.kinds)
    }

    /// Add one more equality and re-solve. On failure the solution is left
    /// as it was.
    pub fn add_constraint(&mut self, left: PolyType, right: PolyType) -> Result<()> {
        self.constraints
            .add_type(left, right, &SourceLocation::default());
        match solve(&self.constraints) {
            Ok(solved) => {
                self.solved = solved;
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "rejected added constraint");
                self.constraints.pop_type();
                Err(err)
            }
        }
    }

    pub fn apply(&self, ty: &PolyType) -> PolyType {
        self.solved.subst.apply(ty)
    }

    pub fn substitution(&self) -> &Substitution {
        &self.solved.subst
    }

    pub fn kinds(&self) -> &KindMap {
        &self.solved.kinds
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }
}
