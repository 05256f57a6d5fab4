//! SMT-LIB2 abstract syntax for the memory-model checker.
//!
//! The encoder builds [`Script`]s out of [`Term`]s; backends either print
//! them (see [`formatter`]) or interpret them directly.

pub mod command;
pub mod eval;
pub mod formatter;
pub mod script;
pub mod simplify;
pub mod sort;
pub mod term;

pub use command::Command;
pub use eval::{Value, eval_ground, eval_term};
pub use script::Script;
pub use simplify::simplify_term;
pub use sort::Sort;
pub use term::Term;
