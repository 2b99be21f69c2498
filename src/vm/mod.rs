//! Runtime: values, the register program and its execution loop.

mod binary;
mod cast;
mod eval;
mod ops;
mod value;

pub use binary::{BinaryFn, BinaryKernel, OperatorTable};
pub use cast::{Cast, FieldCast};
pub use eval::Scope;
pub use ops::{FieldSource, Op, Part, Program, Reg};
pub use value::{Array, Data, NativeFunction, Record, Value};
