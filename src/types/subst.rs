use std::collections::BTreeMap;
use std::fmt;

use super::poly::PolyType;
use super::tvar::Tvar;

/// A mapping from type variables to the types they were unified with.
///
/// Bindings may chain (`t1 -> t2 -> int`); [`PolyType::apply`] follows them
/// to a fixed point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    mapping: BTreeMap<Tvar, PolyType>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, tv: Tvar, ty: PolyType) {
        self.mapping.insert(tv, ty);
    }

    pub fn get(&self, tv: Tvar) -> Option<&PolyType> {
        self.mapping.get(&tv)
    }

    pub fn contains(&self, tv: Tvar) -> bool {
        self.mapping.contains_key(&tv)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tvar, &PolyType)> {
        self.mapping.iter()
    }

    /// Follow variable-to-variable bindings to the representative variable.
    pub fn representative(&self, mut tv: Tvar) -> Tvar {
        while let Some(PolyType::Var(next)) = self.mapping.get(&tv) {
            tv = *next;
        }
        tv
    }

    pub fn apply(&self, ty: &PolyType) -> PolyType {
        ty.apply(self).0
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (tv, ty)) in self.mapping.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", tv, ty)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nature;

    #[test]
    fn test_apply_follows_chains() {
        let mut subst = Substitution::new();
        subst.bind(Tvar(1), PolyType::Var(Tvar(2)));
        subst.bind(Tvar(2), PolyType::Basic(Nature::Int));
        let ty = PolyType::array(PolyType::Var(Tvar(1)));
        assert_eq!(subst.apply(&ty), PolyType::array(PolyType::Basic(Nature::Int)));
        assert_eq!(subst.representative(Tvar(1)), Tvar(2));
    }

    #[test]
    fn test_display() {
        let mut subst = Substitution::new();
        subst.bind(Tvar(0), PolyType::Basic(Nature::String));
        assert_eq!(subst.to_string(), "{t0 = string}");
    }
}
