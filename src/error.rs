//! Error taxonomy shared by inference, compilation and evaluation.
//!
//! Every failure is reported as an [`Error`]: an [`ErrorKind`] plus the source
//! location of the node that caused it, when one is known. Inference and
//! compilation errors are terminal; evaluation errors are returned per call so
//! a caller can skip one record and keep going.

use std::fmt;

use thiserror::Error as ThisError;

use crate::semantic::SourceLocation;
use crate::types::{PolyType, Tvar, TvarSet};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum ErrorKind {
    #[error("type error: {0} != {1}")]
    TypeConflict(PolyType, PolyType),
    #[error("missing required argument {0:?}")]
    MissingRequiredArgument(String),
    #[error("unexpected argument {0:?}")]
    UnexpectedArgument(String),
    #[error("undefined identifier {0:?}")]
    UndefinedIdentifier(String),
    #[error("missing object properties: {}", .0.join(", "))]
    MissingObjectProperty(Vec<String>),
    #[error("type variable {0} occurs in {1}")]
    OccursCheckCycle(Tvar, PolyType),
    #[error("kind constraints form an unresolvable cycle over [{}]", join_vars(.0))]
    UnresolvedCycle(TvarSet),
    #[error("type variable {0} is not monomorphic")]
    NotMonomorphic(Tvar),
    #[error("package {0:?} not found")]
    ImportNotFound(String),
    #[error("unimplemented: {0}")]
    Unimplemented(String),
    #[error("index {index} out of range for array of length {len}")]
    OutOfRange { index: i64, len: usize },
    #[error("null access: {0}")]
    NullAccess(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("internal error: {0}")]
    Internal(String),
}

fn join_vars(vars: &TvarSet) -> String {
    vars.iter()
        .map(|tv| tv.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// An error together with the location of the node that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub loc: Option<SourceLocation>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, loc: None }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Attach a location unless a more specific one is already present.
    pub fn at(mut self, loc: &SourceLocation) -> Self {
        if self.loc.is_none() {
            self.loc = Some(loc.clone());
        }
        self
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(msg.into()))
    }

    pub fn unimplemented(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unimplemented(msg.into()))
    }

    pub fn null_access(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NullAccess(msg.into()))
    }

    pub fn conflict(left: impl Into<PolyType>, right: impl Into<PolyType>) -> Self {
        Self::new(ErrorKind::TypeConflict(left.into(), right.into()))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "{}: {}", loc, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
