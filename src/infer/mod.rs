//! Type inference: constraint generation followed by a two-phase solve.
//!
//! This module implements:
//! - Schemes and the lexical type environment (let-polymorphism)
//! - The constraint generator
//! - The kind-resolving solver
//! - `TypeSolution`, the queryable result

mod constraints;
mod env;
mod generate;
mod import;
mod solution;
mod solve;

pub use constraints::{Annotation, Constraints, TypeConstraint};
pub use env::{Environment, Scheme};
pub use generate::Generator;
pub use import::{Importer, NoImports, PackageType};
pub use solution::TypeSolution;
pub use solve::{Solved, solve};

use tracing::debug;

use crate::error::Result;
use crate::semantic::{Package, walk};
use crate::types::Fresher;

/// Infer the types of every node in `pkg`.
pub fn infer(pkg: &Package, importer: &dyn Importer) -> Result<TypeSolution> {
    let fresher = Fresher::after(walk::max_tvar(pkg));
    let constraints = Generator::new(fresher, importer).generate(pkg)?;
    let solution = TypeSolution::new(constraints)?;
    debug!(package = %pkg.name, bindings = solution.substitution().len(), "inferred");
    Ok(solution)
}
