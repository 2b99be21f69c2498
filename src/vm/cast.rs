//! Static record casts.
//!
//! A cast is computed once, when a record of one concrete shape flows into a
//! position declared with another. At run time it copies fields by their
//! precomputed source positions.

use std::sync::Arc;

use super::value::Value;
use crate::error::{Error, Result};
use crate::types::{MonoType, Nature};

#[derive(Debug, Clone, PartialEq)]
pub enum Cast {
    Record {
        labels: Arc<[String]>,
        fields: Vec<FieldCast>,
    },
    Array { elem: MonoType, cast: Box<Cast> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCast {
    /// Position in the source record; `None` fills a null.
    pub source: Option<usize>,
    pub nature: Nature,
    pub cast: Option<Cast>,
}

impl Cast {
    /// The cast taking values of type `from` to type `to`, or `None` when
    /// they already share one layout.
    pub fn between(from: &MonoType, to: &MonoType) -> Result<Option<Cast>> {
        if from == to {
            return Ok(None);
        }
        match (from, to) {
            (MonoType::Basic(Nature::Null), _) => Ok(None),
            (MonoType::Object(source), MonoType::Object(target)) => {
                let mut fields = Vec::with_capacity(target.len());
                for prop in &target.properties {
                    let source_index = source.index_of(&prop.label);
                    let cast = match source_index.and_then(|i| source.properties.get(i)) {
                        Some(field) => Cast::between(&field.ty, &prop.ty)?,
                        None => None,
                    };
                    fields.push(FieldCast {
                        source: source_index,
                        nature: prop.ty.nature(),
                        cast,
                    });
                }
                Ok(Some(Cast::Record {
                    labels: target.labels().map(str::to_string).collect(),
                    fields,
                }))
            }
            (MonoType::Array(source), MonoType::Array(target)) => {
                Ok(Cast::between(source, target)?.map(|cast| Cast::Array {
                    elem: (**target).clone(),
                    cast: Box::new(cast),
                }))
            }
            _ => Err(Error::conflict(to, from)),
        }
    }

    pub fn apply(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value.clone());
        }
        match self {
            Cast::Record { labels, fields } => {
                let record = value
                    .as_record()
                    .ok_or_else(|| Error::internal(format!("cast of non-record {:?}", value)))?;
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    let v = match field.source {
                        Some(i) => record.values.get(i).cloned().ok_or_else(|| {
                            Error::internal(format!("cast source field {} out of bounds", i))
                        })?,
                        None => Value::typed_null(field.nature),
                    };
                    values.push(match &field.cast {
                        Some(cast) => cast.apply(&v)?,
                        None => v,
                    });
                }
                Ok(Value::record_from_parts(labels.clone(), values))
            }
            Cast::Array { elem, cast } => {
                let array = value
                    .as_array()
                    .ok_or_else(|| Error::internal(format!("cast of non-array {:?}", value)))?;
                let values = array
                    .values
                    .iter()
                    .map(|v| cast.apply(v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::new_array(elem.clone(), values))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ab() -> MonoType {
        MonoType::object([("a", MonoType::INT), ("b", MonoType::STRING)])
    }

    #[test]
    fn test_same_layout_needs_no_cast() {
        assert_eq!(Cast::between(&ab(), &ab()).unwrap(), None);
        assert_eq!(
            Cast::between(&MonoType::array(ab()), &MonoType::array(ab())).unwrap(),
            None
        );
    }

    #[test]
    fn test_reorder_and_project() {
        let from = MonoType::object([
            ("c", MonoType::FLOAT),
            ("b", MonoType::STRING),
            ("a", MonoType::INT),
        ]);
        let cast = Cast::between(&from, &ab()).unwrap().unwrap();
        let v = Value::record([
            ("c", Value::new_float(1.0)),
            ("b", Value::new_string("x")),
            ("a", Value::new_int(7)),
        ]);
        let out = cast.apply(&v).unwrap();
        assert_eq!(
            out,
            Value::record([("a", Value::new_int(7)), ("b", Value::new_string("x"))])
        );
    }

    #[test]
    fn test_identity_cast_is_idempotent() {
        let cast = Cast::Record {
            labels: ["a".to_string(), "b".to_string()].into_iter().collect(),
            fields: vec![
                FieldCast {
                    source: Some(0),
                    nature: Nature::Int,
                    cast: None,
                },
                FieldCast {
                    source: Some(1),
                    nature: Nature::String,
                    cast: None,
                },
            ],
        };
        let v = Value::record([("a", Value::new_int(1)), ("b", Value::new_string("s"))]);
        let once = cast.apply(&v).unwrap();
        assert_eq!(once, v);
        assert_eq!(cast.apply(&once).unwrap(), once);
    }

    #[test]
    fn test_missing_field_becomes_typed_null() {
        let from = MonoType::object([("b", MonoType::STRING)]);
        let cast = Cast::between(&from, &ab()).unwrap().unwrap();
        let out = cast.apply(&Value::record([("b", Value::new_string("x"))])).unwrap();
        assert_eq!(out.field("a"), Some(Value::typed_null(Nature::Int)));
    }

    #[test]
    fn test_array_of_records() {
        let from = MonoType::array(MonoType::object([("b", MonoType::STRING), ("a", MonoType::INT)]));
        let to = MonoType::array(ab());
        let cast = Cast::between(&from, &to).unwrap().unwrap();
        let v = Value::new_array(
            MonoType::object([("b", MonoType::STRING), ("a", MonoType::INT)]),
            vec![Value::record([("b", Value::new_string("x")), ("a", Value::new_int(1))])],
        );
        let out = cast.apply(&v).unwrap();
        assert_eq!(
            out.index(0).unwrap(),
            Value::record([("a", Value::new_int(1)), ("b", Value::new_string("x"))])
        );
    }

    #[test]
    fn test_incompatible_types() {
        let err = Cast::between(&MonoType::INT, &MonoType::STRING).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));
    }
}
