use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A type variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tvar(pub u64);

pub type TvarSet = BTreeSet<Tvar>;

impl fmt::Display for Tvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Monotonic source of fresh type variables.
#[derive(Debug, Clone, Default)]
pub struct Fresher {
    next: u64,
}

impl Fresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresher whose first variable is strictly greater than `last`.
    pub fn after(last: Option<Tvar>) -> Self {
        Self {
            next: last.map_or(0, |tv| tv.0 + 1),
        }
    }

    pub fn fresh(&mut self) -> Tvar {
        let tv = Tvar(self.next);
        self.next += 1;
        tv
    }
}
