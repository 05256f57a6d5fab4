//! Memory events emitted while exploring a program.
//!
//! Events are immutable once allocated. A read carries no value: the value it
//! observes is a solver symbol derived from its `(thread, index)` anchor and
//! is only known once a query is satisfied.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use mcm_smtlib::term::Term;

/// Process identifier. Processes are numbered in the order they were given.
pub type ThreadId = usize;

/// Owner of the initial writes.
pub const INIT_THREAD: ThreadId = ThreadId::MAX;

/// Globally unique event identifier within one exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Read,
    Write,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Read => write!(f, "R"),
            EventKind::Write => write!(f, "W"),
        }
    }
}

/// Name of the solver symbol holding the value observed by the read at
/// position `index` of `thread`.
pub fn read_value_symbol(thread: ThreadId, index: usize) -> String {
    format!("rv_t{thread}_{index}")
}

/// Hands out event ids. Owned by an exploration context, never global.
#[derive(Debug, Default)]
pub struct EventIdAllocator {
    next: AtomicU64,
}

impl EventIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> EventId {
        EventId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// A single read or write of a shared variable.
#[derive(Debug, Clone)]
pub struct MemoryEvent {
    id: EventId,
    thread: ThreadId,
    var: String,
    kind: EventKind,
    index: usize,
    value: Option<Term>,
}

impl MemoryEvent {
    /// Allocate a fresh event. `index` is the event's position in its
    /// thread's program order; `value` is the written value for writes and
    /// ignored for reads.
    pub fn create(
        ids: &EventIdAllocator,
        thread: ThreadId,
        var: impl Into<String>,
        kind: EventKind,
        index: usize,
        value: Option<Term>,
    ) -> Self {
        let value = match kind {
            EventKind::Write => value,
            EventKind::Read => None,
        };
        Self {
            id: ids.next_id(),
            thread,
            var: var.into(),
            kind,
            index,
            value,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Written value; `None` for reads.
    pub fn value(&self) -> Option<&Term> {
        self.value.as_ref()
    }

    pub fn is_read(&self) -> bool {
        self.kind == EventKind::Read
    }

    pub fn is_write(&self) -> bool {
        self.kind == EventKind::Write
    }

    pub fn is_init(&self) -> bool {
        self.thread == INIT_THREAD
    }

    /// The value a write contributes, or the observed-value symbol of a read.
    pub fn value_term(&self) -> Term {
        match (&self.value, self.kind) {
            (Some(v), _) => v.clone(),
            (None, EventKind::Read) => Term::var(read_value_symbol(self.thread, self.index)),
            (None, EventKind::Write) => Term::int(0),
        }
    }

    /// Solver symbol of the value a read observes.
    pub fn value_symbol(&self) -> Option<String> {
        self.is_read()
            .then(|| read_value_symbol(self.thread, self.index))
    }
}

impl PartialEq for MemoryEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MemoryEvent {}

impl Hash for MemoryEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MemoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.var)?;
        if let Some(v) = &self.value {
            write!(f, "={v}")?;
        }
        if self.is_init() {
            write!(f, "@init")
        } else {
            write!(f, "@T{}.{}", self.thread, self.index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_sequential() {
        let ids = EventIdAllocator::new();
        let a = MemoryEvent::create(&ids, 0, "x", EventKind::Write, 0, Some(Term::int(1)));
        let b = MemoryEvent::create(&ids, 0, "x", EventKind::Read, 1, None);
        assert_ne!(a.id(), b.id());
        assert_eq!(ids.allocated(), 2);
    }

    #[test]
    fn equality_is_by_id() {
        let ids = EventIdAllocator::new();
        let a = MemoryEvent::create(&ids, 0, "x", EventKind::Read, 0, None);
        let b = MemoryEvent::create(&ids, 0, "x", EventKind::Read, 0, None);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn reads_never_carry_a_value() {
        let ids = EventIdAllocator::new();
        let r = MemoryEvent::create(&ids, 1, "y", EventKind::Read, 2, Some(Term::int(5)));
        assert_eq!(r.value(), None);
        assert_eq!(r.value_symbol().as_deref(), Some("rv_t1_2"));
        assert_eq!(r.value_term(), Term::var("rv_t1_2"));
    }

    #[test]
    fn display_labels() {
        let ids = EventIdAllocator::new();
        let w = MemoryEvent::create(&ids, 0, "x", EventKind::Write, 0, Some(Term::int(1)));
        let r = MemoryEvent::create(&ids, 1, "y", EventKind::Read, 3, None);
        let init = MemoryEvent::create(&ids, INIT_THREAD, "x", EventKind::Write, 0, Some(Term::int(0)));
        assert_eq!(w.to_string(), "W(x)=1@T0.0");
        assert_eq!(r.to_string(), "R(y)@T1.3");
        assert_eq!(init.to_string(), "W(x)=0@init");
        assert!(init.is_init());
    }
}
