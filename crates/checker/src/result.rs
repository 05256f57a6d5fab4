use std::fmt;
use std::time::Duration;

use mcm_solver::model::Model;

use crate::error::CheckError;
use crate::graph::ResolvedGraph;

/// Overall answer of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Some consistent execution exhibits the outcome.
    Allowed,
    /// Every terminal state was decided and none exhibits the outcome.
    Forbidden,
    /// No solution, but some query was unknown or failed.
    Inconclusive,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allowed => write!(f, "allowed"),
            Verdict::Forbidden => write!(f, "forbidden"),
            Verdict::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// A consistent execution exhibiting the queried outcome.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Index of the terminal state the execution ends in.
    pub terminal: usize,
    pub graph: ResolvedGraph,
    /// Raw solver model.
    pub model: Model,
}

/// Answer of one terminal-state query.
#[derive(Debug)]
pub enum QueryOutcome {
    Sat(Box<Solution>),
    Unsat,
    /// Kept apart from `Unsat`: the solver could not decide.
    Unknown(String),
    /// Not queried because the search was cancelled.
    Skipped,
    Failed(CheckError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownQuery {
    pub terminal: usize,
    pub description: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStats {
    /// Global states taken from the frontier.
    pub states_explored: usize,
    /// Terminal states whose processes all ended in final locations.
    pub terminal_states: usize,
    pub terminals_queried: usize,
    /// States dropped because a visited state covered them.
    pub subsumed_states: usize,
    /// States dropped because an identical state was already visited.
    pub duplicate_states: usize,
    /// States without successors that are not proper terminal states.
    pub blocked_states: usize,
    /// Breadth-first levels expanded.
    pub levels: usize,
    pub elapsed: Duration,
}

/// Aggregated result of a check.
#[derive(Debug, Default)]
pub struct McmResult {
    pub solutions: Vec<Solution>,
    pub unknowns: Vec<UnknownQuery>,
    pub failures: Vec<CheckError>,
    pub stats: CheckStats,
}

impl McmResult {
    pub fn verdict(&self) -> Verdict {
        if !self.solutions.is_empty() {
            Verdict::Allowed
        } else if self.unknowns.is_empty() && self.failures.is_empty() {
            Verdict::Forbidden
        } else {
            Verdict::Inconclusive
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.verdict() == Verdict::Allowed
    }
}
