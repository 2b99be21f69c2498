//! Two-phase constraint solver.
//!
//! Phase one merges the kinds attached to each variable, in an order where a
//! variable is only merged once every other unmerged variable its kinds
//! mention has been merged. Phase two unifies the type constraints in the
//! order they were generated.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::constraints::Constraints;
use crate::error::{ErrorKind, Result};
use crate::types::{Kind, KindMap, Substitution, Tvar};

/// The result of solving a constraint set.
#[derive(Debug, Clone, Default)]
pub struct Solved {
    pub subst: Substitution,
    pub kinds: KindMap,
}

pub fn solve(constraints: &Constraints) -> Result<Solved> {
    let mut kinds = KindMap::new();
    let mut subst = Substitution::new();

    resolve_kinds(constraints, &mut kinds, &mut subst)?;

    for c in constraints.type_constraints() {
        c.left
            .unify_type(&c.right, &mut kinds, &mut subst)
            .map_err(|e| {
                debug!(left = %c.left, right = %c.right, error = %e.kind, "unification failed");
                e.at(&c.loc)
            })?;
    }

    let kinds = kinds.apply(&subst);
    trace!(
        constraints = constraints.type_constraints().len(),
        bindings = subst.len(),
        kinds = kinds.len(),
        "solved"
    );
    Ok(Solved { subst, kinds })
}

fn resolve_kinds(
    constraints: &Constraints,
    kinds: &mut KindMap,
    subst: &mut Substitution,
) -> Result<()> {
    let mut unvisited = BTreeSet::new();
    for (tv, list) in constraints.kind_constraints() {
        if list.contains(&Kind::Nullable) {
            kinds.mark_nullable(*tv);
        }
        match list.as_slice() {
            [kind] => kinds.merge(*tv, kind.clone(), subst)?,
            _ => {
                unvisited.insert(*tv);
            }
        }
    }

    let mut passes = 0;
    while !unvisited.is_empty() {
        passes += 1;
        let mut progress = false;
        for tv in unvisited.clone() {
            let Some(list) = constraints.kind_constraints().get(&tv) else {
                continue;
            };
            if !is_ready(tv, list, &unvisited) {
                continue;
            }
            if let Some((first, rest)) = list.split_first() {
                let mut acc = first.clone();
                for kind in rest {
                    acc = acc.unify_kind(kind, kinds, subst)?;
                }
                kinds.merge(tv, acc, subst)?;
            }
            unvisited.remove(&tv);
            progress = true;
        }
        if !progress {
            debug!(remaining = unvisited.len(), "kind resolution stalled");
            return Err(ErrorKind::UnresolvedCycle(unvisited).into());
        }
    }
    trace!(passes, "kinds resolved");
    Ok(())
}

/// A variable is ready once its kinds mention no other unvisited variable.
fn is_ready(tv: Tvar, list: &[Kind], unvisited: &BTreeSet<Tvar>) -> bool {
    list.iter()
        .flat_map(|kind| kind.free_vars())
        .all(|dep| dep == tv || !unvisited.contains(&dep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::SourceLocation;
    use crate::types::{Nature, ObjectKind, PolyType};

    fn var(n: u64) -> PolyType {
        PolyType::Var(Tvar(n))
    }

    #[test]
    fn test_kinds_merge_before_types() {
        let mut c = Constraints::new();
        c.add_kind(Tvar(0), Kind::Object(ObjectKind::with_property("a", var(1))));
        c.add_kind(Tvar(0), Kind::Object(ObjectKind::with_property("b", var(2))));
        c.add_type(var(1), PolyType::Basic(Nature::Int), &SourceLocation::default());
        let solved = solve(&c).unwrap();
        match solved.kinds.get(Tvar(0)) {
            Some(Kind::Object(obj)) => {
                assert!(obj.lower.contains("a") && obj.lower.contains("b"));
                assert_eq!(obj.properties["a"], PolyType::Basic(Nature::Int));
            }
            other => panic!("expected object kind, got {:?}", other),
        }
    }

    #[test]
    fn test_mutual_kinds_are_an_unresolved_cycle() {
        let mut c = Constraints::new();
        c.add_kind(Tvar(0), Kind::Object(ObjectKind::with_property("a", var(1))));
        c.add_kind(Tvar(0), Kind::Object(ObjectKind::with_property("b", var(5))));
        c.add_kind(Tvar(1), Kind::Object(ObjectKind::with_property("x", var(0))));
        c.add_kind(Tvar(1), Kind::Nullable);
        let err = solve(&c).unwrap_err();
        match err.kind {
            ErrorKind::UnresolvedCycle(vars) => {
                assert_eq!(vars.into_iter().collect::<Vec<_>>(), vec![Tvar(0), Tvar(1)]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_type_errors_carry_location() {
        let mut c = Constraints::new();
        let loc = SourceLocation::new(
            crate::semantic::Position::new(2, 3),
            crate::semantic::Position::new(2, 9),
        );
        c.add_type(var(0), PolyType::Basic(Nature::Int), &SourceLocation::default());
        c.add_type(var(0), PolyType::Basic(Nature::String), &loc);
        let err = solve(&c).unwrap_err();
        assert_eq!(err.loc, Some(loc));
    }
}
