use std::fmt;

use serde::{Deserialize, Serialize};

/// The runtime shape of a value, and the head constructor of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nature {
    /// The absent value: `null`
    Null,
    Bool,
    Int,
    UInt,
    Float,
    String,
    Duration,
    Time,
    Regexp,
    Bytes,
    Array,
    Object,
    Function,
}

impl Nature {
    /// Scalar natures whose values fit in the 64-bit scalar slot of a value.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Nature::Bool
                | Nature::Int
                | Nature::UInt
                | Nature::Float
                | Nature::Duration
                | Nature::Time
        )
    }

    pub fn is_basic(self) -> bool {
        !matches!(self, Nature::Array | Nature::Object | Nature::Function)
    }

    pub fn name(self) -> &'static str {
        match self {
            Nature::Null => "null",
            Nature::Bool => "bool",
            Nature::Int => "int",
            Nature::UInt => "uint",
            Nature::Float => "float",
            Nature::String => "string",
            Nature::Duration => "duration",
            Nature::Time => "time",
            Nature::Regexp => "regexp",
            Nature::Bytes => "bytes",
            Nature::Array => "array",
            Nature::Object => "object",
            Nature::Function => "function",
        }
    }
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
