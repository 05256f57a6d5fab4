//! Product of independently stepping processes.
//!
//! A [`GlobalState`] pairs one [`LocalState`] per process with the memory
//! events emitted so far. Events are kept in a persistent list so that
//! successors share their prefix with the parent state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mcm_smtlib::term::Term;

use crate::event::{EventIdAllocator, EventKind, INIT_THREAD, MemoryEvent, ThreadId};
use crate::ordering::{GlobalOrdering, StateOrdering};
use crate::process::{LocalState, Precision, ProcessAutomaton, ProcessWrapper};
use crate::scheduler::Action;

#[derive(Debug)]
struct PrefixNode {
    event: Arc<MemoryEvent>,
    next: Option<Arc<PrefixNode>>,
}

/// Immutable, structurally shared list of emitted events (newest first).
#[derive(Debug, Clone, Default)]
pub struct EventPrefix {
    head: Option<Arc<PrefixNode>>,
    len: usize,
}

impl EventPrefix {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new prefix with `event` appended; `self` is unchanged.
    pub fn push(&self, event: MemoryEvent) -> Self {
        Self {
            head: Some(Arc::new(PrefixNode {
                event: Arc::new(event),
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Events from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryEvent> {
        let mut cursor = self.head.as_deref();
        std::iter::from_fn(move || {
            let node = cursor?;
            cursor = node.next.as_deref();
            Some(node.event.as_ref())
        })
    }

    /// Events in emission order.
    pub fn to_vec(&self) -> Vec<MemoryEvent> {
        let mut events: Vec<MemoryEvent> = self.iter().cloned().collect();
        events.reverse();
        events
    }
}

/// Id-free projection of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventShape {
    pub thread: ThreadId,
    pub index: usize,
    pub var: String,
    pub kind: EventKind,
    pub value: Option<Term>,
}

impl From<&MemoryEvent> for EventShape {
    fn from(e: &MemoryEvent) -> Self {
        Self {
            thread: e.thread(),
            index: e.index(),
            var: e.var().to_string(),
            kind: e.kind(),
            value: e.value().cloned(),
        }
    }
}

/// Canonical key of a global state. Event ids and interleaving order are
/// not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub locals: Vec<LocalState>,
    pub events: Vec<EventShape>,
    pub terminated: Vec<ThreadId>,
}

#[derive(Debug, Clone)]
pub struct GlobalState {
    pub locals: Vec<LocalState>,
    pub prefix: EventPrefix,
    pub terminated: BTreeSet<ThreadId>,
}

impl GlobalState {
    pub fn is_terminal(&self) -> bool {
        self.terminated.len() == self.locals.len()
    }

    pub fn event_shapes(&self) -> Vec<EventShape> {
        let mut shapes: Vec<EventShape> = self.prefix.iter().map(EventShape::from).collect();
        shapes.sort();
        shapes
    }

    pub fn key(&self) -> StateKey {
        StateKey {
            locals: self.locals.clone(),
            events: self.event_shapes(),
            terminated: self.terminated.iter().copied().collect(),
        }
    }

    /// Key with the deferred constraints removed; states that may subsume
    /// each other share it.
    pub fn shape_key(&self) -> StateKey {
        let mut key = self.key();
        for local in &mut key.locals {
            local.constraints.clear();
        }
        key
    }

    /// Deferred constraints of all processes.
    pub fn constraints(&self) -> BTreeSet<Term> {
        self.locals
            .iter()
            .flat_map(|l| l.constraints.iter().cloned())
            .collect()
    }
}

/// Per-check mutable state shared by exploration workers.
#[derive(Debug, Default)]
pub struct ExplorationContext {
    pub ids: EventIdAllocator,
    visited: DashMap<StateKey, ()>,
    covering: DashMap<StateKey, Vec<GlobalState>>,
}

impl ExplorationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`; returns `false` if it was already visited.
    pub fn first_visit(&self, key: StateKey) -> bool {
        match self.visited.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }

    /// Returns `true` if a recorded state covers `state`; otherwise records
    /// `state` as a potential cover.
    pub fn is_subsumed(&self, state: &GlobalState) -> bool {
        let ordering = GlobalOrdering;
        let mut bucket = self.covering.entry(state.shape_key()).or_default();
        if bucket.iter().any(|seen| ordering.is_leq(state, seen)) {
            return true;
        }
        bucket.push(state.clone());
        false
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// The multiprocess transition system.
#[derive(Debug, Clone)]
pub struct Composition {
    processes: Vec<ProcessWrapper>,
    initial_writes: BTreeMap<String, i128>,
}

impl Composition {
    /// Variables that no initial write mentions start at 0. A variable
    /// listed twice keeps its last value.
    pub fn new(automata: Vec<Arc<ProcessAutomaton>>, initial_writes: &[(String, i128)]) -> Self {
        let processes: Vec<ProcessWrapper> = automata
            .into_iter()
            .enumerate()
            .map(|(thread, a)| ProcessWrapper::new(thread, a))
            .collect();
        let mut init: BTreeMap<String, i128> = processes
            .iter()
            .flat_map(|p| p.automaton().variables())
            .map(|var| (var, 0))
            .collect();
        init.extend(initial_writes.iter().cloned());
        Self {
            processes,
            initial_writes: init,
        }
    }

    pub fn processes(&self) -> &[ProcessWrapper] {
        &self.processes
    }

    pub fn initial_writes(&self) -> &BTreeMap<String, i128> {
        &self.initial_writes
    }

    pub fn init(&self, precision: &Precision, ctx: &ExplorationContext) -> GlobalState {
        tracing::debug!(
            processes = self.processes.len(),
            step_bound = ?precision.step_bound,
            "building initial state"
        );
        let mut prefix = EventPrefix::new();
        for (index, (var, value)) in self.initial_writes.iter().enumerate() {
            prefix = prefix.push(MemoryEvent::create(
                &ctx.ids,
                INIT_THREAD,
                var.clone(),
                EventKind::Write,
                index,
                Some(Term::int(*value)),
            ));
        }
        let locals: Vec<LocalState> = self.processes.iter().map(|p| p.initial_state()).collect();
        let terminated = self
            .processes
            .iter()
            .zip(&locals)
            .filter(|(p, l)| p.is_terminated(l))
            .map(|(p, _)| p.thread())
            .collect();
        GlobalState {
            locals,
            prefix,
            terminated,
        }
    }

    /// Successors of `state` when the process named by `action` takes its
    /// edge. Empty when the step is infeasible.
    pub fn trans(
        &self,
        state: &GlobalState,
        action: &Action,
        precision: &Precision,
        ctx: &ExplorationContext,
    ) -> Vec<GlobalState> {
        let Some(process) = self.processes.get(action.process) else {
            return Vec::new();
        };
        if state.terminated.contains(&action.process) {
            return Vec::new();
        }
        let local = &state.locals[action.process];
        let successors = process.step(local, action.edge, precision);
        if successors.is_empty() {
            return Vec::new();
        }

        let prefix = match process.access(local, action.edge) {
            Some(access) => state.prefix.push(MemoryEvent::create(
                &ctx.ids,
                process.thread(),
                access.var,
                access.kind,
                local.accesses,
                access.value,
            )),
            None => state.prefix.clone(),
        };

        successors
            .into_iter()
            .map(|next| {
                let mut terminated = state.terminated.clone();
                if process.is_terminated(&next) {
                    terminated.insert(action.process);
                }
                let mut locals = state.locals.clone();
                locals[action.process] = next;
                GlobalState {
                    locals,
                    prefix: prefix.clone(),
                    terminated,
                }
            })
            .collect()
    }
}
