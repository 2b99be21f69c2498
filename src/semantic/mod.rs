//! The annotated semantic graph consumed by inference and compilation.

mod builder;
mod nodes;
pub mod walk;

pub use builder::Builder;
pub use nodes::*;
