//! Process automata and the wrapper that steps them.
//!
//! An automaton is an arena: locations and edges are plain indices, edges
//! carry a closed set of labels. Expressions are SMT terms over register
//! names and integer literals. The wrapper evaluates labels against a
//! [`LocalState`] and reports the memory access an edge performs, leaving
//! event allocation to the composition.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use mcm_smtlib::simplify::simplify_term;
use mcm_smtlib::term::Term;

use crate::event::{EventKind, ThreadId, read_value_symbol};

pub type LocationId = usize;
pub type EdgeId = usize;

/// Edge label of a process automaton.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Skip,
    /// Guard over registers; blocks when false.
    Assume(Term),
    Assign(String, Term),
    /// Register takes any of the listed values.
    Nondet(String, Vec<i128>),
    /// `reg := load(var)`
    Load(String, String),
    /// `store(var, expr)`
    Store(String, Term),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Skip => write!(f, "skip"),
            Label::Assume(cond) => write!(f, "assume {cond}"),
            Label::Assign(reg, expr) => write!(f, "{reg} := {expr}"),
            Label::Nondet(reg, values) => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{reg} := nondet {{{}}}", values.join(", "))
            }
            Label::Load(reg, var) => write!(f, "{reg} := load {var}"),
            Label::Store(var, expr) => write!(f, "store {var} {expr}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: LocationId,
    pub target: LocationId,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    UnknownLocation { automaton: String, location: LocationId },
}

impl fmt::Display for AutomatonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomatonError::UnknownLocation {
                automaton,
                location,
            } => write!(f, "automaton '{automaton}' has no location {location}"),
        }
    }
}

impl std::error::Error for AutomatonError {}

/// Control-flow automaton of one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessAutomaton {
    name: String,
    outgoing: Vec<Vec<EdgeId>>,
    edges: Vec<Edge>,
    initial: LocationId,
    finals: BTreeSet<LocationId>,
}

impl ProcessAutomaton {
    /// An automaton with a single location, which is initial.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outgoing: vec![Vec::new()],
            edges: Vec::new(),
            initial: 0,
            finals: BTreeSet::new(),
        }
    }

    /// A chain of edges, one per label, from the initial location to a
    /// single final location.
    pub fn straight_line(name: impl Into<String>, labels: impl IntoIterator<Item = Label>) -> Self {
        let mut automaton = Self::new(name);
        let mut current = automaton.initial;
        for label in labels {
            let next = automaton.add_location();
            automaton.outgoing[current].push(automaton.edges.len());
            automaton.edges.push(Edge {
                source: current,
                target: next,
                label,
            });
            current = next;
        }
        automaton.finals.insert(current);
        automaton
    }

    pub fn add_location(&mut self) -> LocationId {
        self.outgoing.push(Vec::new());
        self.outgoing.len() - 1
    }

    pub fn add_edge(
        &mut self,
        source: LocationId,
        target: LocationId,
        label: Label,
    ) -> Result<EdgeId, AutomatonError> {
        self.check_location(source)?;
        self.check_location(target)?;
        let id = self.edges.len();
        self.edges.push(Edge {
            source,
            target,
            label,
        });
        self.outgoing[source].push(id);
        Ok(id)
    }

    pub fn set_initial(&mut self, location: LocationId) -> Result<(), AutomatonError> {
        self.check_location(location)?;
        self.initial = location;
        Ok(())
    }

    /// Mark `location` as an accepting end of the process. Without any
    /// marked location, every location without outgoing edges is final.
    pub fn mark_final(&mut self, location: LocationId) -> Result<(), AutomatonError> {
        self.check_location(location)?;
        self.finals.insert(location);
        Ok(())
    }

    fn check_location(&self, location: LocationId) -> Result<(), AutomatonError> {
        if location < self.outgoing.len() {
            Ok(())
        } else {
            Err(AutomatonError::UnknownLocation {
                automaton: self.name.clone(),
                location,
            })
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> LocationId {
        self.initial
    }

    pub fn location_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn outgoing(&self, location: LocationId) -> &[EdgeId] {
        self.outgoing.get(location).map_or(&[], Vec::as_slice)
    }

    pub fn is_final(&self, location: LocationId) -> bool {
        if self.finals.is_empty() {
            self.outgoing(location).is_empty()
        } else {
            self.finals.contains(&location)
        }
    }

    /// Registers assigned anywhere in the automaton.
    pub fn registers(&self) -> BTreeSet<String> {
        self.edges
            .iter()
            .filter_map(|e| match &e.label {
                Label::Assign(reg, _) | Label::Nondet(reg, _) | Label::Load(reg, _) => {
                    Some(reg.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Shared variables accessed anywhere in the automaton.
    pub fn variables(&self) -> BTreeSet<String> {
        self.edges
            .iter()
            .filter_map(|e| match &e.label {
                Label::Load(_, var) | Label::Store(var, _) => Some(var.clone()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ProcessAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "process {} (initial L{})", self.name, self.initial)?;
        for (id, edge) in self.edges.iter().enumerate() {
            let mark = if self.is_final(edge.target) { " [final]" } else { "" };
            writeln!(
                f,
                "  e{id}: L{} -> L{}{mark}: {}",
                edge.source, edge.target, edge.label
            )?;
        }
        Ok(())
    }
}

/// How precisely a process is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Precision {
    /// Registers whose nondeterministic choices are enumerated explicitly.
    pub tracked: BTreeSet<String>,
    /// Maximum number of steps per process; further steps are infeasible.
    pub step_bound: Option<usize>,
}

impl Precision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracked(mut self, reg: impl Into<String>) -> Self {
        self.tracked.insert(reg.into());
        self
    }

    pub fn with_step_bound(mut self, bound: usize) -> Self {
        self.step_bound = Some(bound);
        self
    }

    pub fn tracks(&self, reg: &str) -> bool {
        self.tracked.contains(reg)
    }
}

/// Per-process state: location, registers, deferred path constraints and
/// counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalState {
    pub location: LocationId,
    /// Register values. Unassigned registers read as 0.
    pub valuation: BTreeMap<String, Term>,
    /// Guards that could not be decided locally.
    pub constraints: BTreeSet<Term>,
    /// Number of memory accesses emitted so far.
    pub accesses: usize,
    pub steps: usize,
}

impl LocalState {
    pub fn at(location: LocationId) -> Self {
        Self {
            location,
            valuation: BTreeMap::new(),
            constraints: BTreeSet::new(),
            accesses: 0,
            steps: 0,
        }
    }

    /// Evaluate an expression over registers in this state.
    pub fn eval(&self, expr: &Term) -> Term {
        let bound = expr.substitute(&|name| {
            Some(self.valuation.get(name).cloned().unwrap_or(Term::int(0)))
        });
        simplify_term(&bound)
    }

    pub fn register(&self, reg: &str) -> Term {
        self.valuation.get(reg).cloned().unwrap_or(Term::int(0))
    }
}

/// A memory access performed by an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub var: String,
    pub kind: EventKind,
    /// Written value, evaluated in the pre-state.
    pub value: Option<Term>,
}

/// A process automaton bound to its thread id.
#[derive(Debug, Clone)]
pub struct ProcessWrapper {
    thread: ThreadId,
    automaton: Arc<ProcessAutomaton>,
}

impl ProcessWrapper {
    pub fn new(thread: ThreadId, automaton: Arc<ProcessAutomaton>) -> Self {
        Self { thread, automaton }
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn automaton(&self) -> &ProcessAutomaton {
        &self.automaton
    }

    pub fn initial_state(&self) -> LocalState {
        LocalState::at(self.automaton.initial())
    }

    pub fn is_terminated(&self, local: &LocalState) -> bool {
        self.automaton.outgoing(local.location).is_empty()
    }

    /// Outgoing edges of the current location.
    pub fn enabled_actions<'a>(&'a self, local: &LocalState) -> impl Iterator<Item = EdgeId> + 'a {
        self.automaton.outgoing(local.location).iter().copied()
    }

    fn edge_from(&self, local: &LocalState, edge: EdgeId) -> Option<&Edge> {
        self.automaton
            .edge(edge)
            .filter(|e| e.source == local.location)
    }

    /// Successor states after taking `edge`. Empty when the edge is not
    /// enabled, its guard is false, or the step bound is exhausted.
    pub fn step(&self, local: &LocalState, edge: EdgeId, precision: &Precision) -> Vec<LocalState> {
        let Some(taken) = self.edge_from(local, edge) else {
            return Vec::new();
        };
        if let Some(bound) = precision.step_bound
            && local.steps >= bound
        {
            return Vec::new();
        }

        let mut next = local.clone();
        next.location = taken.target;
        next.steps += 1;

        match &taken.label {
            Label::Skip | Label::Store(_, _) => {}
            Label::Assume(cond) => match local.eval(cond) {
                Term::BoolLit(true) => {}
                Term::BoolLit(false) => return Vec::new(),
                guard => {
                    next.constraints.insert(guard);
                }
            },
            Label::Assign(reg, expr) => {
                next.valuation.insert(reg.clone(), local.eval(expr));
            }
            Label::Nondet(reg, values) => {
                let values: BTreeSet<i128> = values.iter().copied().collect();
                if values.is_empty() {
                    return Vec::new();
                }
                if precision.tracks(reg) {
                    return values
                        .into_iter()
                        .map(|v| {
                            let mut s = next.clone();
                            s.valuation.insert(reg.clone(), Term::int(v));
                            s
                        })
                        .collect();
                }
                let symbol = format!("nd_t{}_{}", self.thread, local.steps);
                let domain = Term::or(
                    values
                        .into_iter()
                        .map(|v| Term::eq(Term::var(symbol.clone()), Term::int(v)))
                        .collect(),
                );
                next.constraints.insert(domain);
                next.valuation.insert(reg.clone(), Term::var(symbol));
            }
            Label::Load(reg, _) => {
                let symbol = read_value_symbol(self.thread, local.accesses);
                next.valuation.insert(reg.clone(), Term::var(symbol));
            }
        }

        if self.access(local, edge).is_some() {
            next.accesses += 1;
        }
        vec![next]
    }

    /// The memory access `edge` performs from `local`, if any.
    pub fn access(&self, local: &LocalState, edge: EdgeId) -> Option<Access> {
        match &self.automaton.edge(edge)?.label {
            Label::Load(_, var) => Some(Access {
                var: var.clone(),
                kind: EventKind::Read,
                value: None,
            }),
            Label::Store(var, expr) => Some(Access {
                var: var.clone(),
                kind: EventKind::Write,
                value: Some(local.eval(expr)),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(automaton: ProcessAutomaton) -> ProcessWrapper {
        ProcessWrapper::new(0, Arc::new(automaton))
    }

    fn add(a: Term, b: Term) -> Term {
        Term::IntAdd(Box::new(a), Box::new(b))
    }

    #[test]
    fn straight_line_shape() {
        let a = ProcessAutomaton::straight_line("P0", vec![Label::Skip, Label::Skip]);
        assert_eq!(a.location_count(), 3);
        assert_eq!(a.edges().len(), 2);
        assert!(a.is_final(2));
        assert!(!a.is_final(0));
    }

    #[test]
    fn add_edge_rejects_unknown_location() {
        let mut a = ProcessAutomaton::new("P0");
        let err = a.add_edge(0, 7, Label::Skip).unwrap_err();
        assert_eq!(
            err,
            AutomatonError::UnknownLocation {
                automaton: "P0".to_string(),
                location: 7
            }
        );
    }

    #[test]
    fn assign_evaluates_with_unset_registers_as_zero() {
        let p = wrap(ProcessAutomaton::straight_line(
            "P0",
            vec![Label::Assign("r0".into(), add(Term::var("r1"), Term::int(2)))],
        ));
        let out = p.step(&p.initial_state(), 0, &Precision::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].register("r0"), Term::int(2));
        assert_eq!(out[0].steps, 1);
        assert_eq!(out[0].accesses, 0);
    }

    #[test]
    fn false_guard_blocks() {
        let p = wrap(ProcessAutomaton::straight_line(
            "P0",
            vec![Label::Assume(Term::eq(Term::var("r0"), Term::int(1)))],
        ));
        assert!(p.step(&p.initial_state(), 0, &Precision::new()).is_empty());
    }

    #[test]
    fn symbolic_guard_is_deferred() {
        let p = wrap(ProcessAutomaton::straight_line(
            "P0",
            vec![
                Label::Load("r0".into(), "x".into()),
                Label::Assume(Term::eq(Term::var("r0"), Term::int(1))),
            ],
        ));
        let prec = Precision::new();
        let s1 = p.step(&p.initial_state(), 0, &prec).remove(0);
        assert_eq!(s1.register("r0"), Term::var("rv_t0_0"));
        assert_eq!(s1.accesses, 1);
        let s2 = p.step(&s1, 1, &prec).remove(0);
        assert!(
            s2.constraints
                .contains(&Term::eq(Term::var("rv_t0_0"), Term::int(1)))
        );
    }

    #[test]
    fn tracked_nondet_branches() {
        let p = wrap(ProcessAutomaton::straight_line(
            "P0",
            vec![Label::Nondet("r0".into(), vec![2, 1, 2])],
        ));
        let prec = Precision::new().with_tracked("r0");
        let out = p.step(&p.initial_state(), 0, &prec);
        let values: Vec<Term> = out.iter().map(|s| s.register("r0")).collect();
        assert_eq!(values, vec![Term::int(1), Term::int(2)]);
    }

    #[test]
    fn untracked_nondet_is_symbolic() {
        let p = wrap(ProcessAutomaton::straight_line(
            "P0",
            vec![Label::Nondet("r0".into(), vec![1, 2])],
        ));
        let out = p.step(&p.initial_state(), 0, &Precision::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].register("r0"), Term::var("nd_t0_0"));
        assert_eq!(out[0].constraints.len(), 1);
    }

    #[test]
    fn step_bound_makes_steps_infeasible() {
        let mut a = ProcessAutomaton::new("loop");
        a.add_edge(0, 0, Label::Skip).unwrap();
        let p = wrap(a);
        let prec = Precision::new().with_step_bound(2);
        let s1 = p.step(&p.initial_state(), 0, &prec).remove(0);
        let s2 = p.step(&s1, 0, &prec).remove(0);
        assert!(p.step(&s2, 0, &prec).is_empty());
    }

    #[test]
    fn access_reports_value_in_pre_state() {
        let p = wrap(ProcessAutomaton::straight_line(
            "P0",
            vec![
                Label::Assign("r0".into(), Term::int(4)),
                Label::Store("x".into(), add(Term::var("r0"), Term::int(1))),
            ],
        ));
        let s1 = p.step(&p.initial_state(), 0, &Precision::new()).remove(0);
        assert_eq!(p.access(&s1, 0), None);
        let access = p.access(&s1, 1).unwrap();
        assert_eq!(access.kind, EventKind::Write);
        assert_eq!(access.value, Some(Term::int(5)));
    }

    #[test]
    fn step_on_disabled_edge_is_empty() {
        let p = wrap(ProcessAutomaton::straight_line(
            "P0",
            vec![Label::Skip, Label::Skip],
        ));
        assert!(p.step(&p.initial_state(), 1, &Precision::new()).is_empty());
        assert!(p.step(&p.initial_state(), 9, &Precision::new()).is_empty());
    }
}
