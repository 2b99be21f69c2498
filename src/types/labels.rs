use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A finite set of record labels, or the universal set of all labels.
///
/// `All` is the upper bound of an open row: any label may be present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelSet {
    All,
    Set(BTreeSet<String>),
}

impl Default for LabelSet {
    fn default() -> Self {
        LabelSet::Set(BTreeSet::new())
    }
}

impl LabelSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LabelSet::Set(labels.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, LabelSet::All)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LabelSet::Set(set) if set.is_empty())
    }

    pub fn contains(&self, label: &str) -> bool {
        match self {
            LabelSet::All => true,
            LabelSet::Set(set) => set.contains(label),
        }
    }

    pub fn insert(&mut self, label: impl Into<String>) {
        if let LabelSet::Set(set) = self {
            set.insert(label.into());
        }
    }

    /// Removing from the universal set leaves it universal.
    pub fn remove(&mut self, label: &str) {
        if let LabelSet::Set(set) = self {
            set.remove(label);
        }
    }

    pub fn union(&self, other: &LabelSet) -> LabelSet {
        match (self, other) {
            (LabelSet::All, _) | (_, LabelSet::All) => LabelSet::All,
            (LabelSet::Set(a), LabelSet::Set(b)) => LabelSet::Set(a.union(b).cloned().collect()),
        }
    }

    pub fn intersect(&self, other: &LabelSet) -> LabelSet {
        match (self, other) {
            (LabelSet::All, x) | (x, LabelSet::All) => x.clone(),
            (LabelSet::Set(a), LabelSet::Set(b)) => {
                LabelSet::Set(a.intersection(b).cloned().collect())
            }
        }
    }

    /// Labels of `self` not in `other`. The universal set minus a finite set
    /// is approximated by the universal set.
    pub fn difference(&self, other: &LabelSet) -> LabelSet {
        match (self, other) {
            (_, LabelSet::All) => LabelSet::empty(),
            (LabelSet::All, LabelSet::Set(_)) => LabelSet::All,
            (LabelSet::Set(a), LabelSet::Set(b)) => LabelSet::Set(a.difference(b).cloned().collect()),
        }
    }

    pub fn is_superset(&self, other: &LabelSet) -> bool {
        match (self, other) {
            (LabelSet::All, _) => true,
            (LabelSet::Set(_), LabelSet::All) => false,
            (LabelSet::Set(a), LabelSet::Set(b)) => a.is_superset(b),
        }
    }

    pub fn is_subset(&self, other: &LabelSet) -> bool {
        other.is_superset(self)
    }

    /// Iterates the labels of a finite set; the universal set yields nothing.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        let set = match self {
            LabelSet::All => None,
            LabelSet::Set(set) => Some(set),
        };
        set.into_iter().flatten()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSet::All => write!(f, "*"),
            LabelSet::Set(set) => {
                write!(f, "(")?;
                for (i, label) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", label)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_intersection_with_all() {
        let ab = LabelSet::from_labels(["a", "b"]);
        let bc = LabelSet::from_labels(["b", "c"]);
        assert_eq!(ab.union(&LabelSet::All), LabelSet::All);
        assert_eq!(ab.intersect(&LabelSet::All), ab);
        assert_eq!(ab.intersect(&bc), LabelSet::from_labels(["b"]));
        assert_eq!(ab.union(&bc), LabelSet::from_labels(["a", "b", "c"]));
    }

    #[test]
    fn test_difference() {
        let ab = LabelSet::from_labels(["a", "b"]);
        let b = LabelSet::from_labels(["b"]);
        assert_eq!(ab.difference(&b), LabelSet::from_labels(["a"]));
        assert!(ab.difference(&LabelSet::All).is_empty());
        assert!(LabelSet::All.difference(&ab).is_all());
    }

    #[test]
    fn test_superset() {
        let ab = LabelSet::from_labels(["a", "b"]);
        let a = LabelSet::from_labels(["a"]);
        assert!(ab.is_superset(&a));
        assert!(a.is_subset(&ab));
        assert!(LabelSet::All.is_superset(&ab));
        assert!(!ab.is_superset(&LabelSet::All));
    }

    #[test]
    fn test_display() {
        assert_eq!(LabelSet::from_labels(["b", "a"]).to_string(), "(a, b)");
        assert_eq!(LabelSet::All.to_string(), "*");
    }
}
