use tracing::trace;

use super::ops::{FieldSource, Op, Part, Program, Reg};
use super::value::Value;
use crate::error::{Error, Result};
use crate::types::Nature;

/// The register file of one call.
#[derive(Debug, Clone)]
pub struct Scope {
    registers: Vec<Value>,
}

impl Scope {
    pub fn new(size: usize) -> Self {
        Self {
            registers: vec![Value::null(); size],
        }
    }

    pub fn get(&self, reg: Reg) -> Result<&Value> {
        self.registers
            .get(reg)
            .ok_or_else(|| Error::internal(format!("register r{} out of bounds", reg)))
    }

    pub fn set(&mut self, reg: Reg, value: Value) -> Result<()> {
        match self.registers.get_mut(reg) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::internal(format!("register r{} out of bounds", reg))),
        }
    }

    fn take(&mut self, reg: Reg) -> Result<Value> {
        self.registers
            .get_mut(reg)
            .map(|slot| std::mem::replace(slot, Value::null()))
            .ok_or_else(|| Error::internal(format!("register r{} out of bounds", reg)))
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl Program {
    /// Run the program on positional arguments. A fresh register file is
    /// allocated per call.
    pub fn execute(&self, args: &[Value], captures: &[Value]) -> Result<Value> {
        if args.len() != self.inputs.len() || captures.len() != self.captures.len() {
            return Err(Error::internal(format!(
                "program expects {} arguments and {} captures, got {} and {}",
                self.inputs.len(),
                self.captures.len(),
                args.len(),
                captures.len()
            )));
        }

        let mut scope = Scope::new(self.registers);
        for (reg, value) in self.inputs.iter().zip(args) {
            scope.set(*reg, value.clone())?;
        }
        for (reg, value) in self.captures.iter().zip(captures) {
            scope.set(*reg, value.clone())?;
        }

        let mut pc = 0;
        while let Some(op) = self.ops.get(pc) {
            trace!(pc, ?op, "exec");
            pc += 1;
            match op {
                Op::Const { dst, value } => scope.set(*dst, value.clone())?,

                Op::Binary {
                    dst,
                    kernel,
                    left,
                    right,
                } => {
                    let result = kernel.apply(scope.get(*left)?, scope.get(*right)?)?;
                    scope.set(*dst, result)?;
                }
                Op::Not { dst, src } => {
                    let v = scope.get(*src)?;
                    let result = match v.as_bool() {
                        Some(b) => Value::new_bool(!b),
                        None if v.is_null() => Value::typed_null(Nature::Bool),
                        None => return Err(mismatch("not", v)),
                    };
                    scope.set(*dst, result)?;
                }
                Op::Neg { dst, src } => {
                    let result = negate(scope.get(*src)?)?;
                    scope.set(*dst, result)?;
                }
                Op::Exists { dst, src } => {
                    let result = Value::new_bool(!scope.get(*src)?.is_null());
                    scope.set(*dst, result)?;
                }

                Op::Member { dst, object, index } => {
                    let record = scope.get(*object)?;
                    if record.is_null() {
                        return Err(Error::null_access(format!(
                            "field {} of a null record",
                            index
                        )));
                    }
                    let value = record.get(*index).ok_or_else(|| {
                        Error::internal(format!("field {} out of bounds for {:?}", index, record))
                    })?;
                    scope.set(*dst, value)?;
                }
                Op::Index { dst, array, index } => {
                    let array = scope.get(*array)?;
                    let index = scope.get(*index)?;
                    if array.is_null() || index.is_null() {
                        return Err(Error::null_access("index of a null array or with a null index"));
                    }
                    let i = index.as_int().ok_or_else(|| mismatch("index", index))?;
                    let value = array.index(i)?;
                    scope.set(*dst, value)?;
                }
                Op::Record {
                    dst,
                    labels,
                    base,
                    fields,
                } => {
                    let base = match base {
                        Some(reg) => Some(scope.get(*reg)?),
                        None => None,
                    };
                    let mut values = Vec::with_capacity(fields.len());
                    for field in fields {
                        values.push(match field {
                            FieldSource::Local(reg) => scope.get(*reg)?.clone(),
                            FieldSource::Base(i) => base
                                .and_then(|b| b.get(*i))
                                .ok_or_else(|| Error::null_access(format!("field {} of the base record", i)))?,
                            FieldSource::Null(nature) => Value::typed_null(*nature),
                        });
                    }
                    scope.set(*dst, Value::record_from_parts(labels.clone(), values))?;
                }
                Op::Array {
                    dst,
                    elem,
                    elements,
                } => {
                    let values = elements
                        .iter()
                        .map(|reg| scope.get(*reg).cloned())
                        .collect::<Result<Vec<_>>>()?;
                    scope.set(*dst, Value::new_array(elem.clone(), values))?;
                }
                Op::Interpolate { dst, parts } => {
                    let mut out = String::new();
                    for part in parts {
                        match part {
                            Part::Text(text) => out.push_str(text),
                            Part::Reg(reg) => {
                                let v = scope.get(*reg)?;
                                if v.is_null() {
                                    return Err(Error::null_access("interpolated value is null"));
                                }
                                out.push_str(v.as_str().ok_or_else(|| mismatch("interpolation", v))?);
                            }
                        }
                    }
                    scope.set(*dst, Value::new_string(out))?;
                }
                Op::StaticCast { dst, src, cast } => {
                    let result = cast.apply(scope.get(*src)?)?;
                    scope.set(*dst, result)?;
                }

                Op::Branch {
                    test,
                    on_true,
                    on_false,
                    strict,
                } => {
                    let v = scope.get(*test)?;
                    pc = match v.as_bool() {
                        Some(true) => *on_true,
                        Some(false) => *on_false,
                        None if v.is_null() && *strict => {
                            return Err(Error::null_access("conditional test is null"));
                        }
                        None if v.is_null() => *on_false,
                        None => return Err(mismatch("conditional", v)),
                    };
                }
                Op::Jump { target } => pc = *target,
                Op::Phi {
                    dst,
                    test,
                    consequent,
                    alternate,
                } => {
                    let taken = if scope.get(*test)?.as_bool() == Some(true) {
                        *consequent
                    } else {
                        *alternate
                    };
                    let value = scope.get(taken)?.clone();
                    scope.set(*dst, value)?;
                }

                Op::CallStatic {
                    dst,
                    callee,
                    captures,
                    args,
                } => {
                    let args = read_all(&scope, args)?;
                    let captures = read_all(&scope, captures)?;
                    let result = callee.execute(&args, &captures)?;
                    scope.set(*dst, result)?;
                }
                Op::CallNative {
                    dst,
                    callee,
                    labels,
                    args,
                } => {
                    let func = scope.get(*callee)?;
                    let func = func
                        .as_function()
                        .ok_or_else(|| mismatch("call", func))?
                        .clone();
                    let record = Value::record_from_parts(labels.clone(), read_all(&scope, args)?);
                    let result = func.call(&record)?;
                    scope.set(*dst, result)?;
                }
            }
        }

        scope.take(self.ret)
    }
}

fn read_all(scope: &Scope, regs: &[Reg]) -> Result<Vec<Value>> {
    regs.iter().map(|reg| scope.get(*reg).cloned()).collect()
}

fn negate(v: &Value) -> Result<Value> {
    if v.is_null() {
        return Ok(v.clone());
    }
    if let Some(i) = v.as_int() {
        return Ok(Value::new_int(i.wrapping_neg()));
    }
    if let Some(f) = v.as_float() {
        return Ok(Value::new_float(-f));
    }
    if let Some(d) = v.as_duration() {
        return Ok(Value::new_duration(d.wrapping_neg()));
    }
    Err(mismatch("negation", v))
}

fn mismatch(what: &str, v: &Value) -> Error {
    Error::internal(format!("{} applied to {:?}", what, v))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::semantic::Operator;
    use crate::types::MonoType;
    use crate::vm::binary::OperatorTable;

    fn add_int() -> Program {
        Program {
            ops: vec![Op::Binary {
                dst: 2,
                kernel: OperatorTable::builtin()
                    .lookup(Operator::Add, Nature::Int)
                    .unwrap(),
                left: 0,
                right: 1,
            }],
            registers: 3,
            inputs: vec![0, 1],
            captures: vec![],
            ret: 2,
        }
    }

    #[test]
    fn test_execute_binary() {
        let program = add_int();
        let result = program
            .execute(&[Value::new_int(5), Value::new_int(4)], &[])
            .unwrap();
        assert_eq!(result, Value::new_int(9));
    }

    #[test]
    fn test_execute_is_reentrant() {
        let program = add_int();
        let a = program.execute(&[Value::new_int(1), Value::new_int(1)], &[]).unwrap();
        let b = program.execute(&[Value::new_int(2), Value::new_int(2)], &[]).unwrap();
        assert_eq!(a, Value::new_int(2));
        assert_eq!(b, Value::new_int(4));
    }

    #[test]
    fn test_wrong_arity() {
        let err = add_int().execute(&[Value::new_int(1)], &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Internal(_)));
    }

    fn conditional(strict: bool) -> Program {
        // r0 = test, r1 = "yes", r2 = "no", r3 = phi
        Program {
            ops: vec![
                Op::Branch {
                    test: 0,
                    on_true: 1,
                    on_false: 3,
                    strict,
                },
                Op::Const {
                    dst: 1,
                    value: Value::new_string("yes"),
                },
                Op::Jump { target: 5 },
                Op::Const {
                    dst: 2,
                    value: Value::new_string("no"),
                },
                Op::Jump { target: 5 },
                Op::Phi {
                    dst: 3,
                    test: 0,
                    consequent: 1,
                    alternate: 2,
                },
            ],
            registers: 4,
            inputs: vec![0],
            captures: vec![],
            ret: 3,
        }
    }

    #[test]
    fn test_branch_and_phi() {
        let program = conditional(false);
        assert_eq!(
            program.execute(&[Value::new_bool(true)], &[]).unwrap(),
            Value::new_string("yes")
        );
        assert_eq!(
            program.execute(&[Value::new_bool(false)], &[]).unwrap(),
            Value::new_string("no")
        );
        assert_eq!(
            program.execute(&[Value::typed_null(Nature::Bool)], &[]).unwrap(),
            Value::new_string("no")
        );
    }

    #[test]
    fn test_strict_null_test() {
        let err = conditional(true)
            .execute(&[Value::typed_null(Nature::Bool)], &[])
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NullAccess(_)));
    }

    #[test]
    fn test_record_with_base() {
        let labels: Arc<[String]> = ["b".to_string(), "c".to_string()].into_iter().collect();
        let program = Program {
            ops: vec![
                Op::Const {
                    dst: 1,
                    value: Value::new_string("foo"),
                },
                Op::Record {
                    dst: 2,
                    labels,
                    base: Some(0),
                    fields: vec![FieldSource::Local(1), FieldSource::Base(0)],
                },
            ],
            registers: 3,
            inputs: vec![0],
            captures: vec![],
            ret: 2,
        };
        let out = program
            .execute(&[Value::record([("c", Value::new_float(5.0))])], &[])
            .unwrap();
        assert_eq!(
            out,
            Value::record([("b", Value::new_string("foo")), ("c", Value::new_float(5.0))])
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let program = Program {
            ops: vec![
                Op::Const {
                    dst: 1,
                    value: Value::new_int(3),
                },
                Op::Index {
                    dst: 2,
                    array: 0,
                    index: 1,
                },
            ],
            registers: 3,
            inputs: vec![0],
            captures: vec![],
            ret: 2,
        };
        let values = Value::new_array(
            MonoType::INT,
            vec![Value::new_int(1), Value::new_int(2), Value::new_int(3)],
        );
        let err = program.execute(&[values], &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange { index: 3, len: 3 });
    }

    #[test]
    fn test_interpolating_null_fails() {
        let program = Program {
            ops: vec![Op::Interpolate {
                dst: 1,
                parts: vec![Part::Text("x = ".into()), Part::Reg(0)],
            }],
            registers: 2,
            inputs: vec![0],
            captures: vec![],
            ret: 1,
        };
        assert_eq!(
            program.execute(&[Value::new_string("1")], &[]).unwrap(),
            Value::new_string("x = 1")
        );
        let err = program
            .execute(&[Value::typed_null(Nature::String)], &[])
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NullAccess(_)));
    }

    #[test]
    fn test_call_static_with_captures() {
        // callee: r0 (arg) + r1 (capture)
        let callee = Program {
            ops: vec![Op::Binary {
                dst: 2,
                kernel: OperatorTable::builtin()
                    .lookup(Operator::Add, Nature::Int)
                    .unwrap(),
                left: 0,
                right: 1,
            }],
            registers: 3,
            inputs: vec![0],
            captures: vec![1],
            ret: 2,
        };
        let caller = Program {
            ops: vec![Op::CallStatic {
                dst: 2,
                callee: Arc::new(callee),
                captures: vec![1],
                args: vec![0],
            }],
            registers: 3,
            inputs: vec![0, 1],
            captures: vec![],
            ret: 2,
        };
        assert_eq!(
            caller
                .execute(&[Value::new_int(40), Value::new_int(2)], &[])
                .unwrap(),
            Value::new_int(42)
        );
    }
}
