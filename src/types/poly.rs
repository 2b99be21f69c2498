use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::kind::{Kind, KindMap, ObjectKind};
use super::labels::LabelSet;
use super::mono::{FunctionType, MonoType, Property};
use super::nature::Nature;
use super::subst::Substitution;
use super::tvar::{Tvar, TvarSet};
use crate::error::{Error, ErrorKind, Result};

/// Parameter label under which a call site passes its piped argument.
pub const PIPE_LABEL: &str = "<-";

/// A type that may contain type variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolyType {
    /// Type variable: `t3`
    Var(Tvar),
    Basic(Nature),
    /// Array type: `[T]`
    Array(Box<PolyType>),
    Function(Box<FunctionPoly>),
    /// A record described by its row bounds. Inside constraints an object
    /// never stands alone: unifying it with a variable attaches it to that
    /// variable as a kind.
    Object(Box<ObjectKind>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPoly {
    pub parameters: BTreeMap<String, PolyType>,
    pub required: LabelSet,
    /// Label of the parameter that receives the piped argument.
    pub pipe: Option<String>,
    pub ret: PolyType,
}

impl PolyType {
    pub fn array(element: PolyType) -> PolyType {
        PolyType::Array(Box::new(element))
    }

    pub fn object(kind: ObjectKind) -> PolyType {
        PolyType::Object(Box::new(kind))
    }

    pub fn function(func: FunctionPoly) -> PolyType {
        PolyType::Function(Box::new(func))
    }

    pub fn occurs(&self, tv: Tvar) -> bool {
        match self {
            PolyType::Var(v) => *v == tv,
            PolyType::Basic(_) => false,
            PolyType::Array(elem) => elem.occurs(tv),
            PolyType::Function(func) => {
                func.parameters.values().any(|p| p.occurs(tv)) || func.ret.occurs(tv)
            }
            PolyType::Object(obj) => obj.occurs(tv),
        }
    }

    pub fn free_vars(&self) -> TvarSet {
        let mut vars = TvarSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    pub(crate) fn collect_vars(&self, vars: &mut TvarSet) {
        match self {
            PolyType::Var(tv) => {
                vars.insert(*tv);
            }
            PolyType::Basic(_) => {}
            PolyType::Array(elem) => elem.collect_vars(vars),
            PolyType::Function(func) => {
                for param in func.parameters.values() {
                    param.collect_vars(vars);
                }
                func.ret.collect_vars(vars);
            }
            PolyType::Object(obj) => obj.collect_vars(vars),
        }
    }

    /// Apply a substitution to a fixed point. The flag reports whether any
    /// variable was replaced.
    pub fn apply(&self, subst: &Substitution) -> (PolyType, bool) {
        if subst.is_empty() {
            return (self.clone(), false);
        }
        match self {
            PolyType::Var(tv) => match subst.get(*tv) {
                Some(ty) => (ty.apply(subst).0, true),
                None => (self.clone(), false),
            },
            PolyType::Basic(_) => (self.clone(), false),
            PolyType::Array(elem) => {
                let (elem, changed) = elem.apply(subst);
                (PolyType::array(elem), changed)
            }
            PolyType::Function(func) => {
                let (func, changed) = func.apply(subst);
                (PolyType::function(func), changed)
            }
            PolyType::Object(obj) => {
                let (obj, changed) = obj.apply(subst);
                (PolyType::object(obj), changed)
            }
        }
    }

    /// Unify two types, extending `subst` and merging kinds in `kinds`.
    pub fn unify_type(
        &self,
        other: &PolyType,
        kinds: &mut KindMap,
        subst: &mut Substitution,
    ) -> Result<()> {
        let left = subst.apply(self);
        let right = subst.apply(other);
        match (&left, &right) {
            (PolyType::Var(a), PolyType::Var(b)) if a == b => Ok(()),
            (PolyType::Var(a), PolyType::Var(b)) => unify_vars(*a, *b, kinds, subst),
            (PolyType::Var(tv), ty) | (ty, PolyType::Var(tv)) => bind_var(*tv, ty, kinds, subst),
            (PolyType::Basic(a), PolyType::Basic(b)) if a == b => Ok(()),
            (PolyType::Array(a), PolyType::Array(b)) => a.unify_type(b, kinds, subst),
            (PolyType::Function(a), PolyType::Function(b)) => a.unify(b, kinds, subst),
            (PolyType::Object(a), PolyType::Object(b)) => {
                a.unify_kind(b, kinds, subst)?;
                Ok(())
            }
            _ => {
                trace!(left = %left, right = %right, "type conflict");
                Err(Error::conflict(left.clone(), right.clone()))
            }
        }
    }

    /// Resolve an already-substituted type to a monotype. Variables resolve
    /// through their kinds; a variable with no kind fails unless it is
    /// nullable, in which case it resolves to `null`.
    pub fn resolve_type(&self, kinds: &KindMap) -> Result<MonoType> {
        self.resolve_with(kinds, &mut Vec::new())
    }

    pub(crate) fn resolve_with(&self, kinds: &KindMap, visiting: &mut Vec<Tvar>) -> Result<MonoType> {
        match self {
            PolyType::Var(tv) => {
                if visiting.contains(tv) {
                    return Err(ErrorKind::OccursCheckCycle(*tv, self.clone()).into());
                }
                match kinds.get(*tv) {
                    Some(Kind::Object(obj)) => {
                        visiting.push(*tv);
                        let resolved = obj.resolve_with(kinds, visiting);
                        visiting.pop();
                        resolved
                    }
                    Some(Kind::Nullable) => Ok(MonoType::NULL),
                    None if kinds.is_nullable(*tv) => Ok(MonoType::NULL),
                    None => Err(ErrorKind::NotMonomorphic(*tv).into()),
                }
            }
            PolyType::Basic(n) => Ok(MonoType::Basic(*n)),
            PolyType::Array(elem) => Ok(MonoType::array(elem.resolve_with(kinds, visiting)?)),
            PolyType::Function(func) => {
                let mut parameters = Vec::with_capacity(func.parameters.len());
                for (label, ty) in &func.parameters {
                    parameters.push(Property {
                        label: label.clone(),
                        ty: ty.resolve_with(kinds, visiting)?,
                    });
                }
                Ok(MonoType::Function(Box::new(FunctionType {
                    parameters,
                    required: func.required.iter().cloned().collect(),
                    pipe: func.pipe.clone(),
                    ret: func.ret.resolve_with(kinds, visiting)?,
                })))
            }
            PolyType::Object(obj) => obj.resolve_with(kinds, visiting),
        }
    }

    /// Like [`resolve_type`](Self::resolve_type) but keeps unconstrained
    /// variables, folding object kinds into the type.
    pub fn resolve_poly_type(&self, kinds: &KindMap) -> PolyType {
        self.resolve_poly_with(kinds, &mut Vec::new())
    }

    pub(crate) fn resolve_poly_with(&self, kinds: &KindMap, visiting: &mut Vec<Tvar>) -> PolyType {
        match self {
            PolyType::Var(tv) => match kinds.get(*tv) {
                Some(Kind::Object(obj)) if !visiting.contains(tv) => {
                    visiting.push(*tv);
                    let resolved = PolyType::object(obj.resolve_poly_with(kinds, visiting));
                    visiting.pop();
                    resolved
                }
                _ => self.clone(),
            },
            PolyType::Basic(_) => self.clone(),
            PolyType::Array(elem) => PolyType::array(elem.resolve_poly_with(kinds, visiting)),
            PolyType::Function(func) => PolyType::function(FunctionPoly {
                parameters: func
                    .parameters
                    .iter()
                    .map(|(label, ty)| (label.clone(), ty.resolve_poly_with(kinds, visiting)))
                    .collect(),
                required: func.required.clone(),
                pipe: func.pipe.clone(),
                ret: func.ret.resolve_poly_with(kinds, visiting),
            }),
            PolyType::Object(obj) => PolyType::object(obj.resolve_poly_with(kinds, visiting)),
        }
    }
}

fn unify_vars(a: Tvar, b: Tvar, kinds: &mut KindMap, subst: &mut Substitution) -> Result<()> {
    subst.bind(a, PolyType::Var(b));
    if kinds.is_nullable(a) {
        kinds.mark_nullable(b);
    }
    match kinds.remove(a) {
        Some(kind) => kinds.merge(b, kind, subst),
        None => Ok(()),
    }
}

fn bind_var(tv: Tvar, ty: &PolyType, kinds: &mut KindMap, subst: &mut Substitution) -> Result<()> {
    if let PolyType::Object(obj) = ty {
        return kinds.merge(tv, Kind::Object((**obj).clone()), subst);
    }
    if ty.occurs(tv) {
        return Err(ErrorKind::OccursCheckCycle(tv, ty.clone()).into());
    }
    subst.bind(tv, ty.clone());
    match kinds.remove(tv) {
        Some(kind) => kind.check_type(ty, kinds, subst),
        None => Ok(()),
    }
}

impl FunctionPoly {
    pub fn lookup_pipe(&self) -> Option<(&str, &PolyType)> {
        let label = self.pipe.as_deref()?;
        self.parameters.get(label).map(|ty| (label, ty))
    }

    pub fn apply(&self, subst: &Substitution) -> (FunctionPoly, bool) {
        let mut changed = false;
        let parameters = self
            .parameters
            .iter()
            .map(|(label, ty)| {
                let (ty, c) = ty.apply(subst);
                changed |= c;
                (label.clone(), ty)
            })
            .collect();
        let (ret, c) = self.ret.apply(subst);
        (
            FunctionPoly {
                parameters,
                required: self.required.clone(),
                pipe: self.pipe.clone(),
                ret,
            },
            changed || c,
        )
    }

    /// Unify a callee's type (`self`) with the type a call site expects
    /// (`other`).
    pub fn unify(
        &self,
        other: &FunctionPoly,
        kinds: &mut KindMap,
        subst: &mut Substitution,
    ) -> Result<()> {
        for label in self.required.iter() {
            if self.pipe.as_ref() != Some(label) && !other.parameters.contains_key(label) {
                return Err(ErrorKind::MissingRequiredArgument(label.clone()).into());
            }
        }
        for label in other.required.iter() {
            if other.pipe.as_ref() != Some(label) && !self.parameters.contains_key(label) {
                return Err(ErrorKind::UnexpectedArgument(label.clone()).into());
            }
        }
        for (label, ty) in &self.parameters {
            if let Some(other_ty) = other.parameters.get(label) {
                ty.unify_type(other_ty, kinds, subst)?;
            }
        }
        match (self.lookup_pipe(), other.lookup_pipe()) {
            (Some((l, lt)), Some((r, rt))) if l != r => lt.unify_type(rt, kinds, subst)?,
            (Some((l, _)), None) if !other.parameters.contains_key(l) => {
                return Err(ErrorKind::MissingRequiredArgument(l.to_string()).into());
            }
            (None, Some((r, _))) if !self.parameters.contains_key(r) => {
                return Err(ErrorKind::UnexpectedArgument(r.to_string()).into());
            }
            _ => {}
        }
        self.ret.unify_type(&other.ret, kinds, subst)
    }
}

impl From<Nature> for PolyType {
    fn from(n: Nature) -> Self {
        PolyType::Basic(n)
    }
}

impl From<&MonoType> for PolyType {
    fn from(ty: &MonoType) -> Self {
        match ty {
            MonoType::Basic(n) => PolyType::Basic(*n),
            MonoType::Array(elem) => PolyType::array(elem.as_ref().into()),
            MonoType::Object(obj) => PolyType::object(ObjectKind::closed(
                obj.properties
                    .iter()
                    .map(|p| (p.label.clone(), PolyType::from(&p.ty))),
            )),
            MonoType::Function(func) => PolyType::function(FunctionPoly {
                parameters: func
                    .parameters
                    .iter()
                    .map(|p| (p.label.clone(), PolyType::from(&p.ty)))
                    .collect(),
                required: LabelSet::from_labels(func.required.iter().cloned()),
                pipe: func.pipe.clone(),
                ret: (&func.ret).into(),
            }),
        }
    }
}

impl From<MonoType> for PolyType {
    fn from(ty: MonoType) -> Self {
        PolyType::from(&ty)
    }
}

impl fmt::Display for PolyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolyType::Var(tv) => write!(f, "{}", tv),
            PolyType::Basic(n) => write!(f, "{}", n),
            PolyType::Array(elem) => write!(f, "[{}]", elem),
            PolyType::Function(func) => write!(f, "{}", func),
            PolyType::Object(obj) => write!(f, "{}", obj),
        }
    }
}

impl fmt::Display for FunctionPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (label, ty)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if self.pipe.as_ref() == Some(label) {
                if label == PIPE_LABEL {
                    write!(f, "{}: {}", PIPE_LABEL, ty)?;
                    continue;
                }
                write!(f, "{}", PIPE_LABEL)?;
            } else if self.required.contains(label) {
                write!(f, "^")?;
            }
            write!(f, "{}: {}", label, ty)?;
        }
        write!(f, ") => {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(n: u64) -> PolyType {
        PolyType::Var(Tvar(n))
    }

    fn int() -> PolyType {
        PolyType::Basic(Nature::Int)
    }

    fn func(params: &[(&str, PolyType)], required: &[&str], ret: PolyType) -> FunctionPoly {
        FunctionPoly {
            parameters: params
                .iter()
                .map(|(l, t)| (l.to_string(), t.clone()))
                .collect(),
            required: LabelSet::from_labels(required.iter().copied()),
            pipe: None,
            ret,
        }
    }

    #[test]
    fn test_unify_binds_variable() {
        let mut kinds = KindMap::default();
        let mut subst = Substitution::new();
        var(0).unify_type(&int(), &mut kinds, &mut subst).unwrap();
        assert_eq!(subst.apply(&var(0)), int());
    }

    #[test]
    fn test_unify_conflict() {
        let mut kinds = KindMap::default();
        let mut subst = Substitution::new();
        let err = int()
            .unify_type(&PolyType::Basic(Nature::String), &mut kinds, &mut subst)
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeConflict(_, _)));
    }

    #[test]
    fn test_occurs_check() {
        let mut kinds = KindMap::default();
        let mut subst = Substitution::new();
        let err = var(1)
            .unify_type(&PolyType::array(var(1)), &mut kinds, &mut subst)
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::OccursCheckCycle(Tvar(1), _)));
    }

    #[test]
    fn test_function_missing_required_argument() {
        let mut kinds = KindMap::default();
        let mut subst = Substitution::new();
        let callee = func(&[("a", int()), ("b", int())], &["a", "b"], int());
        let call = func(&[("a", int())], &["a"], var(3));
        let err = callee.unify(&call, &mut kinds, &mut subst).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingRequiredArgument("b".into()));
    }

    #[test]
    fn test_function_unexpected_argument() {
        let mut kinds = KindMap::default();
        let mut subst = Substitution::new();
        let callee = func(&[("a", int())], &["a"], int());
        let call = func(&[("a", int()), ("z", int())], &["a", "z"], var(3));
        let err = callee.unify(&call, &mut kinds, &mut subst).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedArgument("z".into()));
    }

    #[test]
    fn test_function_pipe_arguments_unify() {
        let mut kinds = KindMap::default();
        let mut subst = Substitution::new();
        let mut callee = func(&[("tables", var(1))], &[], var(1));
        callee.pipe = Some("tables".into());
        let mut call = func(&[(PIPE_LABEL, int())], &[], var(2));
        call.pipe = Some(PIPE_LABEL.into());
        callee.unify(&call, &mut kinds, &mut subst).unwrap();
        assert_eq!(subst.apply(&var(2)), int());
    }

    #[test]
    fn test_resolve_residual_variable_is_not_monomorphic() {
        let kinds = KindMap::default();
        let err = PolyType::array(var(7)).resolve_type(&kinds).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotMonomorphic(Tvar(7)));
    }

    #[test]
    fn test_display() {
        let mut f = func(&[("tables", var(1)), ("n", int())], &["n"], var(2));
        f.pipe = Some("tables".into());
        assert_eq!(
            PolyType::function(f).to_string(),
            "(^n: int, <-tables: t1) => t2"
        );
    }
}
