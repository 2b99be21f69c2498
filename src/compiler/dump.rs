//! Human-readable listings of register programs.

use std::collections::VecDeque;
use std::fmt::Write;

use crate::vm::{FieldSource, Op, Part, Program, Reg};

// ============================================================================
// Program Disassembler
// ============================================================================

/// Disassembler for register programs.
///
/// Programs called through `CallStatic` are listed after the program that
/// calls them.
pub struct Disassembler<'a> {
    program: &'a Program,
    output: String,
    pending: VecDeque<&'a Program>,
    listed: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            output: String::new(),
            pending: VecDeque::new(),
            listed: 0,
        }
    }

    pub fn disassemble(&mut self) -> &str {
        self.disassemble_program("main", self.program);
        while let Some(callee) = self.pending.pop_front() {
            self.output.push('\n');
            let name = format!("fn{}", self.listed);
            self.disassemble_program(&name, callee);
        }
        &self.output
    }

    fn disassemble_program(&mut self, name: &str, program: &'a Program) {
        self.listed += 1;
        let _ = writeln!(
            self.output,
            "== {} (inputs: {}, captures: {}, registers: {}) ==",
            name,
            regs(&program.inputs),
            regs(&program.captures),
            program.registers
        );
        for (pc, op) in program.ops.iter().enumerate() {
            self.output.push_str(&format!("{:04}: ", pc));
            self.disassemble_op(op);
            self.output.push('\n');
        }
        let _ = writeln!(self.output, "      ret r{}", program.ret);
    }

    fn disassemble_op(&mut self, op: &'a Op) {
        let out = &mut self.output;
        let _ = match op {
            Op::Const { dst, value } => write!(out, "r{} = const {}", dst, value),
            Op::Binary {
                dst,
                kernel,
                left,
                right,
            } => write!(out, "r{} = r{} {:?} r{}", dst, left, kernel, right),
            Op::Not { dst, src } => write!(out, "r{} = not r{}", dst, src),
            Op::Neg { dst, src } => write!(out, "r{} = -r{}", dst, src),
            Op::Exists { dst, src } => write!(out, "r{} = exists r{}", dst, src),
            Op::Member { dst, object, index } => write!(out, "r{} = r{}.{}", dst, object, index),
            Op::Index { dst, array, index } => write!(out, "r{} = r{}[r{}]", dst, array, index),
            Op::Record {
                dst,
                labels,
                base,
                fields,
            } => {
                let fields = labels
                    .iter()
                    .zip(fields)
                    .map(|(label, field)| match field {
                        FieldSource::Local(reg) => format!("{}: r{}", label, reg),
                        FieldSource::Base(i) => format!("{}: base.{}", label, i),
                        FieldSource::Null(nature) => format!("{}: null({})", label, nature),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                match base {
                    Some(base) => write!(out, "r{} = {{r{} with {}}}", dst, base, fields),
                    None => write!(out, "r{} = {{{}}}", dst, fields),
                }
            }
            Op::Array {
                dst,
                elem,
                elements,
            } => write!(out, "r{} = [{}] of {}", dst, regs(elements), elem),
            Op::Interpolate { dst, parts } => {
                let parts = parts
                    .iter()
                    .map(|part| match part {
                        Part::Text(text) => format!("{:?}", text),
                        Part::Reg(reg) => format!("r{}", reg),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(out, "r{} = interpolate {}", dst, parts)
            }
            Op::StaticCast { dst, src, .. } => write!(out, "r{} = cast r{}", dst, src),
            Op::Branch {
                test,
                on_true,
                on_false,
                strict,
            } => write!(
                out,
                "branch r{} ? {:04} : {:04}{}",
                test,
                on_true,
                on_false,
                if *strict { " strict" } else { "" }
            ),
            Op::Jump { target } => write!(out, "jump {:04}", target),
            Op::Phi {
                dst,
                test,
                consequent,
                alternate,
            } => write!(out, "r{} = phi r{} ? r{} : r{}", dst, test, consequent, alternate),
            Op::CallStatic {
                dst,
                callee,
                captures,
                args,
            } => {
                let index = self.listed + self.pending.len();
                self.pending.push_back(callee);
                write!(
                    out,
                    "r{} = call fn{}({}) captures ({})",
                    dst,
                    index,
                    regs(args),
                    regs(captures)
                )
            }
            Op::CallNative {
                dst,
                callee,
                labels,
                args,
            } => {
                let args = labels
                    .iter()
                    .zip(args)
                    .map(|(label, reg)| format!("{}: r{}", label, reg))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(out, "r{} = call r{}({})", dst, callee, args)
            }
        };
    }
}

fn regs(regs: &[Reg]) -> String {
    regs.iter()
        .map(|r| format!("r{}", r))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a program listing as a string.
pub fn format_program(program: &Program) -> String {
    let mut disassembler = Disassembler::new(program);
    disassembler.disassemble().to_string()
}
