//! Rill - row-polymorphic type inference and a monomorphizing compiler
//!
//! This library infers types for an annotated semantic graph, compiles
//! functions for concrete record inputs and evaluates the resulting register
//! programs.

pub mod compiler;
pub mod config;
pub mod error;
pub mod infer;
pub mod semantic;
pub mod types;
pub mod vm;

// Re-export commonly used types
pub use compiler::{Builtins, Callable, CompilationCache, Compiler, compile};
pub use config::CompilerConfig;
pub use error::{Error, ErrorKind, Result};
pub use infer::{TypeSolution, infer};
pub use vm::Value;
