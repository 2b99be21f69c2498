//! Type definitions for inference and compilation.
//!
//! Two layers live here:
//! - [`PolyType`]: types that may still contain type variables, plus the
//!   [`Kind`] constraints attached to those variables (row bounds, nullability).
//! - [`MonoType`]: fully resolved types, the only kind of type the compiler and
//!   runtime ever see.

mod interner;
mod kind;
mod labels;
mod mono;
mod nature;
mod poly;
mod subst;
mod tvar;

pub use interner::{TypeId, TypeInterner};
pub use kind::{Kind, KindMap, ObjectKind};
pub use labels::LabelSet;
pub use mono::{FunctionType, MonoType, ObjectType, Property};
pub use nature::Nature;
pub use poly::{FunctionPoly, PIPE_LABEL, PolyType};
pub use subst::Substitution;
pub use tvar::{Fresher, Tvar, TvarSet};
