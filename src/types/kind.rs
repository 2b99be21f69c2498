use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::labels::LabelSet;
use super::mono::{MonoType, ObjectType, Property};
use super::poly::PolyType;
use super::subst::Substitution;
use super::tvar::{Tvar, TvarSet};
use crate::error::{Error, ErrorKind, Result};

/// A structural constraint on a type variable beyond plain equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Kind {
    /// The variable is a record bounded by these rows.
    Object(ObjectKind),
    /// The variable may stay absent; any other kind overrides it.
    Nullable,
}

/// Row bounds of a record type.
///
/// `lower` holds labels that must be present, `upper` the labels that may be
/// present (`LabelSet::All` for an open row). `with` names the record this one
/// extends; labels not listed locally come from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectKind {
    pub with: Option<PolyType>,
    pub properties: IndexMap<String, PolyType>,
    pub lower: LabelSet,
    pub upper: LabelSet,
}

impl ObjectKind {
    /// A record with exactly these properties.
    pub fn closed<I>(properties: I) -> Self
    where
        I: IntoIterator<Item = (String, PolyType)>,
    {
        let properties: IndexMap<String, PolyType> = properties.into_iter().collect();
        let labels = LabelSet::from_labels(properties.keys().cloned());
        Self {
            with: None,
            properties,
            lower: labels.clone(),
            upper: labels,
        }
    }

    /// A record that has at least `label`.
    pub fn with_property(label: impl Into<String>, ty: PolyType) -> Self {
        let label = label.into();
        Self {
            with: None,
            lower: LabelSet::from_labels([label.clone()]),
            properties: IndexMap::from([(label, ty)]),
            upper: LabelSet::All,
        }
    }

    /// `{base with ...properties}`
    pub fn extending<I>(base: PolyType, properties: I) -> Self
    where
        I: IntoIterator<Item = (String, PolyType)>,
    {
        let properties: IndexMap<String, PolyType> = properties.into_iter().collect();
        Self {
            with: Some(base),
            lower: LabelSet::from_labels(properties.keys().cloned()),
            properties,
            upper: LabelSet::All,
        }
    }

    fn is_present(&self, label: &str) -> bool {
        self.lower.contains(label) || (!self.upper.is_all() && self.upper.contains(label))
    }

    pub fn occurs(&self, tv: Tvar) -> bool {
        self.with.as_ref().is_some_and(|w| w.occurs(tv))
            || self.properties.values().any(|p| p.occurs(tv))
    }

    pub(crate) fn collect_vars(&self, vars: &mut TvarSet) {
        if let Some(with) = &self.with {
            with.collect_vars(vars);
        }
        for ty in self.properties.values() {
            ty.collect_vars(vars);
        }
    }

    pub fn apply(&self, subst: &Substitution) -> (ObjectKind, bool) {
        let mut changed = false;
        let with = self.with.as_ref().map(|w| {
            let (w, c) = w.apply(subst);
            changed |= c;
            w
        });
        let properties = self
            .properties
            .iter()
            .map(|(label, ty)| {
                let (ty, c) = ty.apply(subst);
                changed |= c;
                (label.clone(), ty)
            })
            .collect();
        (
            ObjectKind {
                with,
                properties,
                lower: self.lower.clone(),
                upper: self.upper.clone(),
            },
            changed,
        )
    }

    /// Merge two row descriptions of the same record.
    pub fn unify_kind(
        &self,
        other: &ObjectKind,
        kinds: &mut KindMap,
        subst: &mut Substitution,
    ) -> Result<ObjectKind> {
        let with = match (&self.with, &other.with) {
            (Some(a), Some(b)) => {
                let (a, b) = (subst.apply(a), subst.apply(b));
                if a != b {
                    return Err(Error::conflict(a, b));
                }
                Some(a)
            }
            (Some(w), None) | (None, Some(w)) => Some(w.clone()),
            (None, None) => None,
        };

        let mut properties = self.properties.clone();
        for (label, ty) in &other.properties {
            match properties.get(label) {
                Some(existing) => existing.unify_type(ty, kinds, subst)?,
                None => {
                    properties.insert(label.clone(), ty.clone());
                }
            }
        }

        // Labels the extending side does not define itself belong to the
        // record it extends.
        if let Some(base) = &with {
            let (local, foreign) = match (&self.with, &other.with) {
                (Some(_), None) => (self, other),
                (None, Some(_)) => (other, self),
                _ => (self, self),
            };
            for (label, ty) in &foreign.properties {
                if local.properties.contains_key(label) {
                    continue;
                }
                let mut requirement = ObjectKind::with_property(label.clone(), ty.clone());
                if !foreign.lower.contains(label) {
                    requirement.lower = LabelSet::empty();
                }
                base.unify_type(&PolyType::object(requirement), kinds, subst)?;
            }
        }

        let merged_lower = self.lower.union(&other.lower);
        let upper = self.upper.intersect(&other.upper);
        let mut lower = merged_lower.clone();
        let mut missing = Vec::new();
        for label in merged_lower.difference(&upper).iter() {
            let tolerated = properties
                .get(label)
                .is_some_and(|ty| kinds.is_nullable_type(ty, subst));
            if tolerated {
                lower.remove(label);
            } else {
                missing.push(label.clone());
            }
        }
        if !missing.is_empty() {
            return Err(ErrorKind::MissingObjectProperty(missing).into());
        }

        Ok(ObjectKind {
            with,
            properties,
            lower,
            upper,
        })
    }

    pub(crate) fn resolve_with(&self, kinds: &KindMap, visiting: &mut Vec<Tvar>) -> Result<MonoType> {
        let mut resolved = ObjectType::default();
        for (label, ty) in &self.properties {
            if !self.is_present(label) {
                continue;
            }
            resolved.properties.push(Property {
                label: label.clone(),
                ty: ty.resolve_with(kinds, visiting)?,
            });
        }
        if let Some(with) = &self.with {
            match with.resolve_with(kinds, visiting)? {
                MonoType::Object(base) => {
                    for prop in base.properties {
                        if resolved.index_of(&prop.label).is_none() {
                            resolved.properties.push(prop);
                        }
                    }
                }
                other => return Err(Error::conflict(with.clone(), &other)),
            }
        }
        Ok(MonoType::Object(resolved))
    }

    pub(crate) fn resolve_poly_with(&self, kinds: &KindMap, visiting: &mut Vec<Tvar>) -> ObjectKind {
        ObjectKind {
            with: self
                .with
                .as_ref()
                .map(|w| w.resolve_poly_with(kinds, visiting)),
            properties: self
                .properties
                .iter()
                .map(|(label, ty)| (label.clone(), ty.resolve_poly_with(kinds, visiting)))
                .collect(),
            lower: self.lower.clone(),
            upper: self.upper.clone(),
        }
    }
}

impl Kind {
    pub fn apply(&self, subst: &Substitution) -> (Kind, bool) {
        match self {
            Kind::Object(obj) => {
                let (obj, changed) = obj.apply(subst);
                (Kind::Object(obj), changed)
            }
            Kind::Nullable => (Kind::Nullable, false),
        }
    }

    pub fn occurs(&self, tv: Tvar) -> bool {
        match self {
            Kind::Object(obj) => obj.occurs(tv),
            Kind::Nullable => false,
        }
    }

    pub fn free_vars(&self) -> TvarSet {
        let mut vars = TvarSet::new();
        if let Kind::Object(obj) = self {
            obj.collect_vars(&mut vars);
        }
        vars
    }

    pub fn unify_kind(
        &self,
        other: &Kind,
        kinds: &mut KindMap,
        subst: &mut Substitution,
    ) -> Result<Kind> {
        match (self, other) {
            (Kind::Nullable, k) | (k, Kind::Nullable) => Ok(k.clone()),
            (Kind::Object(a), Kind::Object(b)) => Ok(Kind::Object(a.unify_kind(b, kinds, subst)?)),
        }
    }

    /// Check that a concrete (non-variable) type satisfies this kind.
    pub fn check_type(&self, ty: &PolyType, kinds: &mut KindMap, subst: &mut Substitution) -> Result<()> {
        match (self, ty) {
            (Kind::Nullable, _) => Ok(()),
            (Kind::Object(obj), PolyType::Object(other)) => {
                obj.unify_kind(other, kinds, subst)?;
                Ok(())
            }
            (Kind::Object(obj), PolyType::Var(tv)) => kinds.merge(*tv, Kind::Object(obj.clone()), subst),
            (Kind::Object(obj), _) => Err(Error::conflict(PolyType::object(obj.clone()), ty.clone())),
        }
    }
}

/// The kinds attached to type variables, keyed by representative variable.
///
/// Nullability is recorded separately and survives binding, so a row check
/// can still tell that a label's variable was declared optional after the
/// variable has been unified with a concrete type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindMap {
    kinds: BTreeMap<Tvar, Kind>,
    nullable: TvarSet,
}

impl KindMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tv: Tvar) -> Option<&Kind> {
        self.kinds.get(&tv)
    }

    pub fn insert(&mut self, tv: Tvar, kind: Kind) {
        if kind == Kind::Nullable {
            self.nullable.insert(tv);
        }
        self.kinds.insert(tv, kind);
    }

    pub fn remove(&mut self, tv: Tvar) -> Option<Kind> {
        self.kinds.remove(&tv)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tvar, &Kind)> {
        self.kinds.iter()
    }

    pub fn is_nullable(&self, tv: Tvar) -> bool {
        self.nullable.contains(&tv)
    }

    pub fn mark_nullable(&mut self, tv: Tvar) {
        self.nullable.insert(tv);
    }

    /// Whether a property's declared type is a variable marked nullable,
    /// directly or through its representative.
    pub fn is_nullable_type(&self, ty: &PolyType, subst: &Substitution) -> bool {
        match ty {
            PolyType::Var(tv) => {
                self.is_nullable(*tv) || self.is_nullable(subst.representative(*tv))
            }
            _ => false,
        }
    }

    /// Merge `kind` into whatever the variable currently carries.
    pub fn merge(&mut self, tv: Tvar, kind: Kind, subst: &mut Substitution) -> Result<()> {
        if kind == Kind::Nullable {
            self.nullable.insert(tv);
        }
        match subst.apply(&PolyType::Var(tv)) {
            PolyType::Var(rep) => {
                if rep != tv && self.is_nullable(tv) {
                    self.nullable.insert(rep);
                }
                let mut merged = kind;
                while let Some(existing) = self.kinds.remove(&rep) {
                    merged = existing.unify_kind(&merged, self, subst)?;
                }
                if subst.contains(rep) {
                    return self.merge(rep, merged, subst);
                }
                self.kinds.insert(rep, merged);
                Ok(())
            }
            ty => kind.check_type(&ty, self, subst),
        }
    }

    /// A copy with every kind rewritten under `subst`.
    pub fn apply(&self, subst: &Substitution) -> KindMap {
        KindMap {
            kinds: self
                .kinds
                .iter()
                .map(|(tv, kind)| (*tv, kind.apply(subst).0))
                .collect(),
            nullable: self.nullable.clone(),
        }
    }
}

fn write_object(f: &mut fmt::Formatter<'_>, obj: &ObjectKind) -> fmt::Result {
    write!(f, "{{")?;
    if let Some(with) = &obj.with {
        write!(f, "{} with ", with)?;
    }
    for (i, (label, ty)) in obj.properties.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", label, ty)?;
    }
    let closed = obj.with.is_none()
        && obj.lower == obj.upper
        && obj.lower == LabelSet::from_labels(obj.properties.keys().cloned());
    if !closed {
        write!(f, " | lower: {}, upper: {}", obj.lower, obj.upper)?;
    }
    write!(f, "}}")
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_object(f, self)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Object(obj) => write_object(f, obj),
            Kind::Nullable => write!(f, "nullable"),
        }
    }
}
