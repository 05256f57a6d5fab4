//! # mcm-checker
//!
//! Bounded axiomatic memory-model checking of small concurrent programs.
//!
//! A program is one [`ProcessAutomaton`] per thread. The checker explores
//! every interleaving up to the bound given by [`Precision`], collects the
//! memory events of each terminal state into an [`EventGraph`], and asks a
//! solver whether some choice of reads-from and coherence edges satisfies
//! both the data flow and the axioms of an [`Mcm`] while exhibiting the
//! queried [`Outcome`].
//!
//! ```
//! use mcm_checker::{CheckerConfig, Label, McmChecker, Outcome, Precision, ProcessAutomaton, models};
//! use mcm_smtlib::Term;
//!
//! // Store buffering.
//! let p0 = ProcessAutomaton::straight_line(
//!     "P0",
//!     [Label::Store("x".into(), Term::int(1)), Label::Load("r0".into(), "y".into())],
//! );
//! let p1 = ProcessAutomaton::straight_line(
//!     "P1",
//!     [Label::Store("y".into(), Term::int(1)), Label::Load("r0".into(), "x".into())],
//! );
//! let outcome: Outcome = "0:r0=0 /\\ 1:r0=0".parse().unwrap();
//!
//! let sc = McmChecker::new(vec![p0.clone(), p1.clone()], &[], models::sc(), CheckerConfig::default());
//! assert!(!sc.check(&Precision::new(), &outcome).unwrap().is_allowed());
//!
//! let tso = McmChecker::new(vec![p0, p1], &[], models::tso(), CheckerConfig::default());
//! assert!(tso.check(&Precision::new(), &outcome).unwrap().is_allowed());
//! ```

pub mod checker;
pub mod composition;
pub mod config;
pub mod encode;
pub mod error;
pub mod event;
pub mod graph;
pub mod mcm;
pub mod models;
pub mod ordering;
pub mod outcome;
pub mod process;
pub mod result;
pub mod scheduler;

pub use checker::{Exploration, McmChecker, TerminalGraph};
pub use config::{CheckerConfig, ErrorPolicy, SearchMode};
pub use error::CheckError;
pub use event::{EventId, EventKind, MemoryEvent};
pub use graph::{EventGraph, GraphShape, ResolvedGraph};
pub use mcm::{Axiom, AxiomKind, BaseRelation, EventSet, Mcm, McmError, RelExpr};
pub use outcome::{Outcome, OutcomeAtom};
pub use process::{Label, Precision, ProcessAutomaton};
pub use result::{CheckStats, McmResult, QueryOutcome, Solution, UnknownQuery, Verdict};
