use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::nature::Nature;
use super::poly::PIPE_LABEL;

/// A fully resolved type: no type variables, no kind constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonoType {
    /// Scalar and opaque types: `int`, `string`, `regexp`, ...
    Basic(Nature),
    /// Array type: `[T]`
    Array(Box<MonoType>),
    /// Record type with ordered properties: `{a: T1, b: T2}`
    Object(ObjectType),
    /// Function type: `(a: T1, ^b: T2) => R`
    Function(Box<FunctionType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    pub label: String,
    pub ty: MonoType,
}

/// Record type. Property order is the physical field order of values of
/// this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectType {
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub parameters: Vec<Property>,
    pub required: BTreeSet<String>,
    pub pipe: Option<String>,
    pub ret: MonoType,
}

impl MonoType {
    pub const NULL: MonoType = MonoType::Basic(Nature::Null);
    pub const BOOL: MonoType = MonoType::Basic(Nature::Bool);
    pub const INT: MonoType = MonoType::Basic(Nature::Int);
    pub const UINT: MonoType = MonoType::Basic(Nature::UInt);
    pub const FLOAT: MonoType = MonoType::Basic(Nature::Float);
    pub const STRING: MonoType = MonoType::Basic(Nature::String);
    pub const DURATION: MonoType = MonoType::Basic(Nature::Duration);
    pub const TIME: MonoType = MonoType::Basic(Nature::Time);
    pub const REGEXP: MonoType = MonoType::Basic(Nature::Regexp);
    pub const BYTES: MonoType = MonoType::Basic(Nature::Bytes);

    pub fn array(element: MonoType) -> MonoType {
        MonoType::Array(Box::new(element))
    }

    pub fn object<I, S>(properties: I) -> MonoType
    where
        I: IntoIterator<Item = (S, MonoType)>,
        S: Into<String>,
    {
        MonoType::Object(ObjectType::new(properties))
    }

    pub fn nature(&self) -> Nature {
        match self {
            MonoType::Basic(n) => *n,
            MonoType::Array(_) => Nature::Array,
            MonoType::Object(_) => Nature::Object,
            MonoType::Function(_) => Nature::Function,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            MonoType::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&MonoType> {
        match self {
            MonoType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Structural equality that ignores record field order at every level.
    pub fn same_shape(&self, other: &MonoType) -> bool {
        match (self, other) {
            (MonoType::Basic(a), MonoType::Basic(b)) => a == b,
            (MonoType::Array(a), MonoType::Array(b)) => a.same_shape(b),
            (MonoType::Object(a), MonoType::Object(b)) => {
                a.len() == b.len()
                    && a.properties.iter().all(|p| {
                        b.get(&p.label)
                            .is_some_and(|other| p.ty.same_shape(other))
                    })
            }
            (MonoType::Function(a), MonoType::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl ObjectType {
    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = (S, MonoType)>,
        S: Into<String>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(label, ty)| Property {
                    label: label.into(),
                    ty,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.label == label)
    }

    pub fn get(&self, label: &str) -> Option<&MonoType> {
        self.properties
            .iter()
            .find(|p| p.label == label)
            .map(|p| &p.ty)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.label.as_str())
    }
}

fn write_parameter(
    f: &mut fmt::Formatter<'_>,
    param: &Property,
    required: bool,
    pipe: bool,
) -> fmt::Result {
    if pipe {
        write!(f, "{}", PIPE_LABEL)?;
    } else if required {
        write!(f, "^")?;
    }
    write!(f, "{}: {}", param.label, param.ty)
}

impl fmt::Display for MonoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonoType::Basic(n) => write!(f, "{}", n),
            MonoType::Array(elem) => write!(f, "[{}]", elem),
            MonoType::Object(obj) => write!(f, "{}", obj),
            MonoType::Function(func) => {
                write!(f, "(")?;
                for (i, param) in func.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let pipe = func.pipe.as_deref() == Some(param.label.as_str());
                    write_parameter(f, param, func.required.contains(&param.label), pipe)?;
                }
                write!(f, ") => {}", func.ret)
            }
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, p) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", p.label, p.ty)?;
        }
        write!(f, "}}")
    }
}
