use std::sync::Arc;

use super::binary::BinaryKernel;
use super::cast::Cast;
use super::value::Value;
use crate::types::{MonoType, Nature};

/// Index into a program's register file.
pub type Reg = usize;

/// Register program operations.
///
/// Every operation writes at most one register (`dst`) and reads only
/// registers written by earlier operations. Names are resolved during
/// lowering; nothing here looks a field up by label.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ========================================
    // Constants
    // ========================================
    Const { dst: Reg, value: Value },

    // ========================================
    // Operators
    // ========================================
    /// Kernel resolved at compile time from `(operator, nature)`.
    Binary {
        dst: Reg,
        kernel: BinaryKernel,
        left: Reg,
        right: Reg,
    },
    Not { dst: Reg, src: Reg },
    Neg { dst: Reg, src: Reg },
    /// `true` unless the source is null.
    Exists { dst: Reg, src: Reg },

    // ========================================
    // Records, Arrays, Strings
    // ========================================
    /// Record field by position.
    Member { dst: Reg, object: Reg, index: usize },
    /// Array element; `index` holds an int.
    Index { dst: Reg, array: Reg, index: Reg },
    /// Build a record with `labels`, filling each field from `fields`.
    Record {
        dst: Reg,
        labels: Arc<[String]>,
        base: Option<Reg>,
        fields: Vec<FieldSource>,
    },
    Array {
        dst: Reg,
        elem: MonoType,
        elements: Vec<Reg>,
    },
    Interpolate { dst: Reg, parts: Vec<Part> },
    /// Reshape a record (or array of records) to a declared field order.
    StaticCast { dst: Reg, src: Reg, cast: Arc<Cast> },

    // ========================================
    // Control Flow
    // ========================================
    /// Jump to `on_true` or `on_false` by the value of `test`. A null test
    /// takes `on_false` unless `strict` is set, in which case it fails.
    Branch {
        test: Reg,
        on_true: usize,
        on_false: usize,
        strict: bool,
    },
    Jump { target: usize },
    /// Join point of a conditional: copy the register of the branch taken.
    Phi {
        dst: Reg,
        test: Reg,
        consequent: Reg,
        alternate: Reg,
    },

    // ========================================
    // Calls
    // ========================================
    /// Call a program lowered for these exact argument types.
    CallStatic {
        dst: Reg,
        callee: Arc<Program>,
        captures: Vec<Reg>,
        args: Vec<Reg>,
    },
    /// Call a native function value held in `callee` with one record of
    /// arguments.
    CallNative {
        dst: Reg,
        callee: Reg,
        labels: Arc<[String]>,
        args: Vec<Reg>,
    },
}

/// Where a field of a record under construction comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    Local(Reg),
    /// Field at this position in the base record.
    Base(usize),
    Null(Nature),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Reg(Reg),
}

/// A lowered function: immutable and shareable across threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub ops: Vec<Op>,
    /// Size of the register file allocated per call.
    pub registers: usize,
    /// Registers seeded from the arguments, in argument order.
    pub inputs: Vec<Reg>,
    /// Registers seeded from the caller's captured values.
    pub captures: Vec<Reg>,
    pub ret: Reg,
}

impl Op {
    /// The register this operation writes, if any.
    pub fn dst(&self) -> Option<Reg> {
        match self {
            Op::Const { dst, .. }
            | Op::Binary { dst, .. }
            | Op::Not { dst, .. }
            | Op::Neg { dst, .. }
            | Op::Exists { dst, .. }
            | Op::Member { dst, .. }
            | Op::Index { dst, .. }
            | Op::Record { dst, .. }
            | Op::Array { dst, .. }
            | Op::Interpolate { dst, .. }
            | Op::StaticCast { dst, .. }
            | Op::Phi { dst, .. }
            | Op::CallStatic { dst, .. }
            | Op::CallNative { dst, .. } => Some(*dst),
            Op::Branch { .. } | Op::Jump { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dst() {
        assert_eq!(
            Op::Const {
                dst: 3,
                value: Value::new_int(1)
            }
            .dst(),
            Some(3)
        );
        assert_eq!(Op::Jump { target: 0 }.dst(), None);
    }
}
