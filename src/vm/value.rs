use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{Error, ErrorKind, Result};
use crate::types::{MonoType, Nature, ObjectType};

/// A runtime value.
///
/// Scalars (bool, int, uint, float, duration, time) live in the 64-bit
/// `scalar` slot; everything else lives behind `data`. A value can be null
/// while still carrying the nature of the type it was declared with.
#[derive(Clone)]
pub struct Value {
    nature: Nature,
    null: bool,
    scalar: u64,
    data: Option<Arc<Data>>,
}

#[derive(Clone)]
pub enum Data {
    Str(String),
    Bytes(Vec<u8>),
    Regexp(Regex),
    Array(Array),
    Record(Record),
    Function(Arc<dyn NativeFunction>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub elem: MonoType,
    pub values: Vec<Value>,
}

/// A record: labels and values addressed by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub labels: Arc<[String]>,
    pub values: Vec<Value>,
}

/// A function implemented outside the register program.
///
/// Arguments arrive as one record keyed by parameter label.
pub trait NativeFunction: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn call(&self, args: &Value) -> Result<Value>;
}

impl Record {
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

impl Value {
    fn scalar(nature: Nature, scalar: u64) -> Self {
        Self {
            nature,
            null: false,
            scalar,
            data: None,
        }
    }

    fn boxed(nature: Nature, data: Data) -> Self {
        Self {
            nature,
            null: false,
            scalar: 0,
            data: Some(Arc::new(data)),
        }
    }

    /// The untyped null.
    pub fn null() -> Self {
        Self::typed_null(Nature::Null)
    }

    /// A null value of a declared nature.
    pub fn typed_null(nature: Nature) -> Self {
        Self {
            nature,
            null: true,
            scalar: 0,
            data: None,
        }
    }

    pub fn new_bool(v: bool) -> Self {
        Self::scalar(Nature::Bool, v as u64)
    }

    pub fn new_int(v: i64) -> Self {
        Self::scalar(Nature::Int, v as u64)
    }

    pub fn new_uint(v: u64) -> Self {
        Self::scalar(Nature::UInt, v)
    }

    pub fn new_float(v: f64) -> Self {
        Self::scalar(Nature::Float, v.to_bits())
    }

    /// Duration in nanoseconds.
    pub fn new_duration(nanos: i64) -> Self {
        Self::scalar(Nature::Duration, nanos as u64)
    }

    /// Time as nanoseconds since the Unix epoch.
    pub fn new_time(nanos: i64) -> Self {
        Self::scalar(Nature::Time, nanos as u64)
    }

    pub fn new_string(v: impl Into<String>) -> Self {
        Self::boxed(Nature::String, Data::Str(v.into()))
    }

    pub fn new_bytes(v: Vec<u8>) -> Self {
        Self::boxed(Nature::Bytes, Data::Bytes(v))
    }

    pub fn new_regexp(re: Regex) -> Self {
        Self::boxed(Nature::Regexp, Data::Regexp(re))
    }

    /// Compile `pattern` into a regexp value.
    pub fn regexp(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::new_regexp)
            .map_err(|e| Error::internal(format!("invalid regexp {:?}: {}", pattern, e)))
    }

    /// A record of the given type with every field set to a typed null.
    pub fn new_record(ty: &ObjectType) -> Self {
        let labels: Arc<[String]> = ty.properties.iter().map(|p| p.label.clone()).collect();
        let values = ty
            .properties
            .iter()
            .map(|p| Value::typed_null(p.ty.nature()))
            .collect();
        Self::record_from_parts(labels, values)
    }

    pub fn record_from_parts(labels: Arc<[String]>, values: Vec<Value>) -> Self {
        Self::boxed(Nature::Object, Data::Record(Record { labels, values }))
    }

    /// Build a record from `(label, value)` pairs in order.
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (labels, values): (Vec<String>, Vec<Value>) =
            fields.into_iter().map(|(l, v)| (l.into(), v)).unzip();
        Self::record_from_parts(labels.into(), values)
    }

    pub fn new_array(elem: MonoType, values: Vec<Value>) -> Self {
        Self::boxed(Nature::Array, Data::Array(Array { elem, values }))
    }

    pub fn new_function(f: Arc<dyn NativeFunction>) -> Self {
        Self::boxed(Nature::Function, Data::Function(f))
    }

    pub fn nature(&self) -> Nature {
        self.nature
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn as_bool(&self) -> Option<bool> {
        (self.nature == Nature::Bool && !self.null).then_some(self.scalar != 0)
    }

    pub fn as_int(&self) -> Option<i64> {
        (self.nature == Nature::Int && !self.null).then_some(self.scalar as i64)
    }

    pub fn as_uint(&self) -> Option<u64> {
        (self.nature == Nature::UInt && !self.null).then_some(self.scalar)
    }

    pub fn as_float(&self) -> Option<f64> {
        (self.nature == Nature::Float && !self.null).then_some(f64::from_bits(self.scalar))
    }

    pub fn as_duration(&self) -> Option<i64> {
        (self.nature == Nature::Duration && !self.null).then_some(self.scalar as i64)
    }

    pub fn as_time(&self) -> Option<i64> {
        (self.nature == Nature::Time && !self.null).then_some(self.scalar as i64)
    }

    /// The raw 64-bit scalar slot.
    pub fn raw_scalar(&self) -> u64 {
        self.scalar
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.data.as_deref() {
            Some(Data::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.data.as_deref() {
            Some(Data::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    pub fn as_regexp(&self) -> Option<&Regex> {
        match self.data.as_deref() {
            Some(Data::Regexp(re)) => Some(re),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self.data.as_deref() {
            Some(Data::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self.data.as_deref() {
            Some(Data::Array(a)) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<dyn NativeFunction>> {
        match self.data.as_deref() {
            Some(Data::Function(f)) => Some(f),
            _ => None,
        }
    }

    /// Record field by position.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.as_record()?.values.get(index).cloned()
    }

    /// Record field by label.
    pub fn field(&self, label: &str) -> Option<Value> {
        let record = self.as_record()?;
        record.index_of(label).and_then(|i| record.values.get(i).cloned())
    }

    /// Overwrite a record field by position.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.as_record().map(|r| r.values.len());
        match self.data.as_mut().map(Arc::make_mut) {
            Some(Data::Record(record)) if index < record.values.len() => {
                record.values[index] = value;
                Ok(())
            }
            Some(Data::Record(_)) => Err(ErrorKind::OutOfRange {
                index: index as i64,
                len: len.unwrap_or(0),
            }
            .into()),
            _ => Err(Error::internal("set on a value that is not a record")),
        }
    }

    /// Array element by index; out-of-range indexes are an error.
    pub fn index(&self, index: i64) -> Result<Value> {
        let array = self
            .as_array()
            .ok_or_else(|| Error::internal("index on a value that is not an array"))?;
        usize::try_from(index)
            .ok()
            .and_then(|i| array.values.get(i))
            .cloned()
            .ok_or_else(|| {
                ErrorKind::OutOfRange {
                    index,
                    len: array.values.len(),
                }
                .into()
            })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.nature != other.nature || self.null != other.null {
            return false;
        }
        if self.null {
            return true;
        }
        match (self.data.as_deref(), other.data.as_deref()) {
            (None, None) if self.nature == Nature::Float => {
                f64::from_bits(self.scalar) == f64::from_bits(other.scalar)
            }
            (None, None) => self.scalar == other.scalar,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Data::Str(a), Data::Str(b)) => a == b,
            (Data::Bytes(a), Data::Bytes(b)) => a == b,
            (Data::Regexp(a), Data::Regexp(b)) => a.as_str() == b.as_str(),
            (Data::Array(a), Data::Array(b)) => a == b,
            (Data::Record(a), Data::Record(b)) => a == b,
            (Data::Function(a), Data::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            return write!(f, "null");
        }
        match self.nature {
            Nature::Null => write!(f, "null"),
            Nature::Bool => write!(f, "{}", self.scalar != 0),
            Nature::Int => write!(f, "{}", self.scalar as i64),
            Nature::UInt => write!(f, "{}u", self.scalar),
            Nature::Float => write!(f, "{:?}", f64::from_bits(self.scalar)),
            Nature::Duration => write!(f, "{}ns", self.scalar as i64),
            Nature::Time => write!(f, "time({})", self.scalar as i64),
            _ => match self.data.as_deref() {
                Some(Data::Str(s)) => write!(f, "{:?}", s),
                Some(Data::Bytes(b)) => write!(f, "bytes({})", b.len()),
                Some(Data::Regexp(re)) => write!(f, "/{}/", re.as_str()),
                Some(Data::Array(a)) => {
                    write!(f, "[")?;
                    for (i, v) in a.values.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", v)?;
                    }
                    write!(f, "]")
                }
                Some(Data::Record(r)) => {
                    write!(f, "{{")?;
                    for (i, (l, v)) in r.labels.iter().zip(&r.values).enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}: {}", l, v)?;
                    }
                    write!(f, "}}")
                }
                Some(Data::Function(func)) => write!(f, "<native {}>", func.name()),
                None => write!(f, "<invalid>"),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            return write!(f, "Null({})", self.nature);
        }
        write!(f, "{}({})", self.nature, self)
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Str(s) => write!(f, "Str({:?})", s),
            Data::Bytes(b) => write!(f, "Bytes({:?})", b),
            Data::Regexp(re) => write!(f, "Regexp({})", re.as_str()),
            Data::Array(a) => write!(f, "{:?}", a),
            Data::Record(r) => write!(f, "{:?}", r),
            Data::Function(func) => write!(f, "Function({})", func.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        assert_eq!(Value::new_int(-5).as_int(), Some(-5));
        assert_eq!(Value::new_uint(7).as_uint(), Some(7));
        assert_eq!(Value::new_float(2.5).as_float(), Some(2.5));
        assert_eq!(Value::new_bool(true).as_bool(), Some(true));
        assert_eq!(Value::new_int(1).as_float(), None);
    }

    #[test]
    fn test_typed_null() {
        let v = Value::typed_null(Nature::Int);
        assert!(v.is_null());
        assert_eq!(v.nature(), Nature::Int);
        assert_eq!(v.as_int(), None);
        assert_ne!(v, Value::new_int(0));
    }

    #[test]
    fn test_record_set_and_get() {
        let ty = ObjectType::new([("a", MonoType::INT), ("b", MonoType::STRING)]);
        let mut rec = Value::new_record(&ty);
        assert!(rec.get(0).is_some_and(|v| v.is_null()));
        rec.set(1, Value::new_string("x")).unwrap();
        assert_eq!(rec.get(1), Some(Value::new_string("x")));
        assert_eq!(rec.field("b"), Some(Value::new_string("x")));
        assert_eq!(rec.get(2), None);
        assert!(rec.set(2, Value::new_int(1)).is_err());
    }

    #[test]
    fn test_set_does_not_alias_clones() {
        let original = Value::record([("a", Value::new_int(1))]);
        let mut copy = original.clone();
        copy.set(0, Value::new_int(2)).unwrap();
        assert_eq!(original.get(0), Some(Value::new_int(1)));
        assert_eq!(copy.get(0), Some(Value::new_int(2)));
    }

    #[test]
    fn test_array_index_out_of_range() {
        let arr = Value::new_array(
            MonoType::INT,
            vec![Value::new_int(1), Value::new_int(2), Value::new_int(3)],
        );
        assert_eq!(arr.index(2).unwrap(), Value::new_int(3));
        let err = arr.index(3).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange { index: 3, len: 3 });
        assert!(arr.index(-1).is_err());
    }

    #[test]
    fn test_display() {
        let rec = Value::record([
            ("a", Value::new_int(1)),
            ("s", Value::new_string("hi")),
            ("f", Value::new_float(9.0)),
        ]);
        assert_eq!(rec.to_string(), "{a: 1, s: \"hi\", f: 9.0}");
    }

    #[test]
    fn test_regexp() {
        let re = Value::regexp("^a+$").unwrap();
        assert!(re.as_regexp().is_some_and(|r| r.is_match("aaa")));
        assert!(Value::regexp("(").is_err());
    }
}
