//! Preorders over states, used to prune states covered by a visited one.
//!
//! `is_leq(s1, s2)` means every execution reachable from `s1` is also
//! reachable from `s2`. Callers must only rely on this for monotone
//! transition functions; the orderings here do not check it.

use crate::composition::GlobalState;
use crate::process::LocalState;

pub trait StateOrdering<S> {
    fn is_leq(&self, lhs: &S, rhs: &S) -> bool;
}

/// Same location, registers and counters; `rhs` carries no constraint that
/// `lhs` does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOrdering;

impl StateOrdering<LocalState> for LocalOrdering {
    fn is_leq(&self, lhs: &LocalState, rhs: &LocalState) -> bool {
        lhs.location == rhs.location
            && lhs.accesses == rhs.accesses
            && lhs.steps == rhs.steps
            && lhs.valuation == rhs.valuation
            && rhs.constraints.is_subset(&lhs.constraints)
    }
}

/// Pointwise [`LocalOrdering`] with identical terminated sets and event
/// prefixes (compared without event ids).
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOrdering;

impl StateOrdering<GlobalState> for GlobalOrdering {
    fn is_leq(&self, lhs: &GlobalState, rhs: &GlobalState) -> bool {
        lhs.locals.len() == rhs.locals.len()
            && lhs.terminated == rhs.terminated
            && lhs
                .locals
                .iter()
                .zip(&rhs.locals)
                .all(|(a, b)| LocalOrdering.is_leq(a, b))
            && lhs.event_shapes() == rhs.event_shapes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::EventPrefix;
    use mcm_smtlib::term::Term;
    use std::collections::BTreeSet;

    fn guard(v: i128) -> Term {
        Term::eq(Term::var("rv_t0_0"), Term::int(v))
    }

    #[test]
    fn fewer_constraints_is_larger() {
        let general = LocalState::at(3);
        let mut specific = general.clone();
        specific.constraints.insert(guard(1));
        assert!(LocalOrdering.is_leq(&specific, &general));
        assert!(!LocalOrdering.is_leq(&general, &specific));
        assert!(LocalOrdering.is_leq(&general, &general));
    }

    #[test]
    fn different_location_is_incomparable() {
        assert!(!LocalOrdering.is_leq(&LocalState::at(0), &LocalState::at(1)));
    }

    #[test]
    fn global_ordering_is_pointwise() {
        let mut specific = LocalState::at(1);
        specific.constraints.insert(guard(0));
        let lhs = GlobalState {
            locals: vec![specific, LocalState::at(2)],
            prefix: EventPrefix::new(),
            terminated: BTreeSet::new(),
        };
        let rhs = GlobalState {
            locals: vec![LocalState::at(1), LocalState::at(2)],
            prefix: EventPrefix::new(),
            terminated: BTreeSet::new(),
        };
        assert!(GlobalOrdering.is_leq(&lhs, &rhs));
        assert!(!GlobalOrdering.is_leq(&rhs, &lhs));

        let mut finished = rhs.clone();
        finished.terminated.insert(1);
        assert!(!GlobalOrdering.is_leq(&lhs, &finished));
    }
}
