//! # mcm-solver
//!
//! Satisfiability backends for the memory-model checker.
//!
//! The checker only sees the [`SolverBackend`] trait. Backends:
//!
//! - [`BuiltinSolver`]: in-process, finite-domain Bool/Int fragment encoded
//!   to CNF and decided by `varisat`; no external binary needed.
//! - [`CliSolver`]: Z3, CVC5 or Yices as a subprocess speaking SMT-LIB2.
//! - `Z3NativeSolver` (feature `z3-native`): Z3 through its C API.
//!
//! ```
//! use mcm_smtlib::{Script, Sort, Term};
//! use mcm_solver::{BackendKind, SolverBackend, create_backend};
//!
//! let mut script = Script::new();
//! script.declare_const("x", Sort::Int);
//! script.assert(Term::or(vec![
//!     Term::eq(Term::var("x"), Term::int(0)),
//!     Term::eq(Term::var("x"), Term::int(1)),
//! ]));
//! script.assert(Term::eq(Term::var("x"), Term::int(1)));
//!
//! let backend = create_backend(BackendKind::Builtin, 0).unwrap();
//! let result = backend.check_sat(&script).unwrap();
//! assert_eq!(result.model().and_then(|m| m.get_int("x")), Some(1));
//! ```

pub mod backend;
pub mod builtin;
pub mod config;
pub mod error;
pub mod model;
mod parser;
pub mod result;
pub mod solver;
#[cfg(feature = "z3-native")]
pub mod z3_native;

pub use backend::{BackendKind, SolverBackend, create_backend};
pub use builtin::BuiltinSolver;
pub use config::{SolverConfig, SolverKind};
pub use error::SolverError;
pub use model::Model;
pub use result::SolverResult;
pub use solver::CliSolver;
#[cfg(feature = "z3-native")]
pub use z3_native::Z3NativeSolver;
