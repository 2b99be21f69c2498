//! Monomorphisation of a polymorphic function against concrete argument types.
//!
//! The process:
//! 1. Match every declared parameter type against the like-named concrete
//!    argument type, binding type variables as they are first seen
//! 2. Later occurrences of a bound variable must agree with the binding
//! 3. Record rows bind to the full concrete record when open, and to the
//!    projection onto their declared labels when closed
//! 4. A row whose properties lead back to itself has no finite record type
//!    and fails with an occurs-check error naming the row variable

use tracing::trace;

use crate::error::{Error, ErrorKind, Result};
use crate::types::{
    Kind, KindMap, MonoType, ObjectKind, ObjectType, PolyType, Substitution, Tvar,
};

/// Bind the variables of `declared` so that it describes `concrete`.
pub fn match_types(
    declared: &PolyType,
    concrete: &MonoType,
    kinds: &KindMap,
    subst: &mut Substitution,
) -> Result<()> {
    Matcher {
        kinds,
        subst,
        rows: Vec::new(),
    }
    .types(declared, concrete)
}

struct Matcher<'k, 's> {
    kinds: &'k KindMap,
    subst: &'s mut Substitution,
    /// Row variables whose kinds are being matched.
    rows: Vec<Tvar>,
}

impl Matcher<'_, '_> {
    fn types(&mut self, declared: &PolyType, concrete: &MonoType) -> Result<()> {
        let kinds = self.kinds;
        match declared {
            PolyType::Var(tv) => {
                let candidate = match kinds.get(*tv) {
                    Some(Kind::Object(obj)) => {
                        if self.rows.contains(tv) {
                            return Err(ErrorKind::OccursCheckCycle(
                                *tv,
                                PolyType::object(obj.clone()),
                            )
                            .into());
                        }
                        self.rows.push(*tv);
                        let candidate = self.object(obj, concrete);
                        self.rows.pop();
                        candidate?
                    }
                    _ => concrete.clone(),
                };
                match self.subst.get(*tv) {
                    Some(bound) => {
                        let bound = bound.resolve_type(kinds)?;
                        if !bound.same_shape(&candidate) {
                            return Err(Error::conflict(&bound, &candidate));
                        }
                    }
                    None => {
                        trace!(%tv, ty = %candidate, "bind");
                        self.subst.bind(*tv, PolyType::from(&candidate));
                    }
                }
                Ok(())
            }
            PolyType::Basic(n) => match concrete {
                MonoType::Basic(c) if c == n => Ok(()),
                _ => Err(Error::conflict(declared.clone(), concrete)),
            },
            PolyType::Array(elem) => match concrete {
                MonoType::Array(c) => self.types(elem, c),
                _ => Err(Error::conflict(declared.clone(), concrete)),
            },
            PolyType::Object(obj) => self.object(obj, concrete).map(|_| ()),
            PolyType::Function(func) => match concrete {
                MonoType::Function(c) => {
                    for (label, ty) in &func.parameters {
                        match c.parameters.iter().find(|p| &p.label == label) {
                            Some(param) => self.types(ty, &param.ty)?,
                            None if func.required.contains(label) => {
                                return Err(
                                    ErrorKind::MissingRequiredArgument(label.clone()).into()
                                );
                            }
                            None => {}
                        }
                    }
                    self.types(&func.ret, &c.ret)
                }
                _ => Err(Error::conflict(declared.clone(), concrete)),
            },
        }
    }

    /// Match a row against a concrete record, returning the record type the
    /// row stands for.
    fn object(&mut self, obj: &ObjectKind, concrete: &MonoType) -> Result<MonoType> {
        let MonoType::Object(record) = concrete else {
            return Err(Error::conflict(PolyType::object(obj.clone()), concrete));
        };

        let mut missing = Vec::new();
        for (label, ty) in &obj.properties {
            match record.get(label) {
                Some(field) => self.types(ty, field)?,
                None if obj.lower.contains(label)
                    && !self.kinds.is_nullable_type(ty, self.subst) =>
                {
                    missing.push(label.clone());
                }
                None => {}
            }
        }
        if !missing.is_empty() {
            return Err(ErrorKind::MissingObjectProperty(missing).into());
        }

        if let Some(base) = &obj.with {
            let rest = ObjectType {
                properties: record
                    .properties
                    .iter()
                    .filter(|p| !obj.properties.contains_key(&p.label))
                    .cloned()
                    .collect(),
            };
            self.types(base, &MonoType::Object(rest))?;
        }

        if obj.upper.is_all() {
            return Ok(concrete.clone());
        }
        let properties = obj
            .properties
            .keys()
            .filter(|label| obj.upper.contains(label))
            .filter_map(|label| {
                record
                    .properties
                    .iter()
                    .find(|p| &p.label == label)
                    .cloned()
            })
            .collect();
        Ok(MonoType::Object(ObjectType { properties }))
    }
}
