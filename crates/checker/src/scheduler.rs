//! Interleaving scheduler: which process may step next.

use crate::composition::GlobalState;
use crate::process::{EdgeId, ProcessWrapper};

/// One process taking one of its edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    pub process: usize,
    pub edge: EdgeId,
}

/// The multiprocess labelled transition system seen by the explorer.
///
/// Every enabled action of every non-terminated process is exposed; no
/// partial-order reduction is applied.
#[derive(Debug, Clone, Copy)]
pub struct MultiprocLts<'a> {
    processes: &'a [ProcessWrapper],
}

impl<'a> MultiprocLts<'a> {
    pub fn new(processes: &'a [ProcessWrapper]) -> Self {
        Self { processes }
    }

    pub fn enabled_actions(&self, state: &GlobalState) -> Vec<Action> {
        self.processes
            .iter()
            .zip(&state.locals)
            .enumerate()
            .filter(|(process, _)| !state.terminated.contains(process))
            .flat_map(|(process, (wrapper, local))| {
                wrapper
                    .enabled_actions(local)
                    .map(move |edge| Action { process, edge })
            })
            .collect()
    }
}
