//! The checking loop.
//!
//! Exploration is breadth-first over the composed transition system. Each
//! level is expanded in parallel on a rayon pool; successors are
//! deduplicated through the shared [`ExplorationContext`] and the next
//! frontier is sorted by canonical key, so the set of terminal states does
//! not depend on worker scheduling. Terminal states found on a level are
//! encoded and handed to solver backends, one backend per rayon worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use mcm_solver::backend::{SolverBackend, create_backend};
use mcm_solver::result::SolverResult;

use crate::composition::{Composition, ExplorationContext, GlobalState};
use crate::config::{CheckerConfig, ErrorPolicy, SearchMode};
use crate::encode::encode_query;
use crate::error::CheckError;
use crate::graph::{EventGraph, ResolvedGraph};
use crate::mcm::Mcm;
use crate::outcome::Outcome;
use crate::process::{Precision, ProcessAutomaton};
use crate::result::{CheckStats, McmResult, QueryOutcome, Solution, UnknownQuery};
use crate::scheduler::MultiprocLts;

/// A terminal state ready to be queried.
#[derive(Debug, Clone)]
pub struct TerminalGraph {
    /// Position in discovery order.
    pub index: usize,
    pub graph: EventGraph,
}

/// Terminal graphs of a full exploration, without solver queries.
#[derive(Debug, Clone)]
pub struct Exploration {
    pub terminals: Vec<TerminalGraph>,
    pub stats: CheckStats,
}

#[derive(Debug, Default)]
struct Expansion {
    fresh: Vec<GlobalState>,
    generated: usize,
    duplicates: usize,
    subsumed: usize,
}

/// Checks whether a concurrent program can reach an outcome under a
/// memory model.
#[derive(Debug, Clone)]
pub struct McmChecker {
    composition: Composition,
    mcm: Mcm,
    config: CheckerConfig,
}

impl McmChecker {
    pub fn new(
        automata: Vec<ProcessAutomaton>,
        initial_writes: &[(String, i128)],
        mcm: Mcm,
        config: CheckerConfig,
    ) -> Self {
        let automata = automata.into_iter().map(Arc::new).collect();
        Self {
            composition: Composition::new(automata, initial_writes),
            mcm,
            config,
        }
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn mcm(&self) -> &Mcm {
        &self.mcm
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Decide whether some consistent execution ends in `outcome`.
    ///
    /// Model and outcome are validated before anything is explored. Under
    /// [`ErrorPolicy::Batch`] solver failures are collected in the result;
    /// under [`ErrorPolicy::Eager`] the first one is returned.
    pub fn check(&self, precision: &Precision, outcome: &Outcome) -> Result<McmResult, CheckError> {
        let start = Instant::now();
        self.mcm.validate()?;
        outcome.validate(&self.composition)?;
        // Surface a missing solver binary before exploring.
        create_backend(self.config.backend, self.config.timeout_ms).map_err(CheckError::Backend)?;
        let pool = self.pool()?;

        tracing::info!(
            model = self.mcm.name(),
            processes = self.composition.processes().len(),
            outcome = %outcome,
            backend = %self.config.backend,
            jobs = self.config.jobs,
            "starting check"
        );

        let cancel = AtomicBool::new(false);
        let mut result = McmResult::default();
        let mut queried = 0;
        let stats = self.explore(&pool, precision, &cancel, |terminals| {
            let answers = self.query_level(&pool, &terminals, outcome, &cancel);
            for (terminal, answer) in terminals.into_iter().zip(answers) {
                match answer {
                    QueryOutcome::Sat(solution) => {
                        queried += 1;
                        tracing::debug!(terminal = terminal.index, "outcome reachable");
                        result.solutions.push(*solution);
                    }
                    QueryOutcome::Unsat => {
                        queried += 1;
                        tracing::trace!(terminal = terminal.index, "outcome unreachable");
                    }
                    QueryOutcome::Unknown(reason) => {
                        queried += 1;
                        tracing::warn!(terminal = terminal.index, %reason, "solver returned unknown");
                        result.unknowns.push(UnknownQuery {
                            terminal: terminal.index,
                            description: terminal.graph.to_string(),
                            reason,
                        });
                    }
                    QueryOutcome::Skipped => {}
                    QueryOutcome::Failed(err) => {
                        queried += 1;
                        if self.config.errors == ErrorPolicy::Eager {
                            return Err(err);
                        }
                        tracing::warn!(terminal = terminal.index, error = %err, "query failed");
                        result.failures.push(err);
                    }
                }
            }
            Ok(())
        })?;

        result.stats = stats;
        result.stats.terminals_queried = queried;
        result.stats.elapsed = start.elapsed();
        tracing::info!(
            verdict = %result.verdict(),
            states = result.stats.states_explored,
            terminals = result.stats.terminal_states,
            queried = result.stats.terminals_queried,
            elapsed = ?result.stats.elapsed,
            "check finished"
        );
        Ok(result)
    }

    /// Explore without querying and return every terminal graph.
    pub fn explore_terminals(&self, precision: &Precision) -> Result<Exploration, CheckError> {
        let start = Instant::now();
        let pool = self.pool()?;
        let cancel = AtomicBool::new(false);
        let mut terminals = Vec::new();
        let mut stats = self.explore(&pool, precision, &cancel, |level| {
            terminals.extend(level);
            Ok(())
        })?;
        stats.elapsed = start.elapsed();
        Ok(Exploration { terminals, stats })
    }

    fn pool(&self) -> Result<rayon::ThreadPool, CheckError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs.max(1))
            .build()
            .map_err(|e| CheckError::ThreadPool(e.to_string()))
    }

    /// Level-synchronous exploration. `on_terminals` receives the terminal
    /// graphs of each level in discovery order.
    fn explore<F>(
        &self,
        pool: &rayon::ThreadPool,
        precision: &Precision,
        cancel: &AtomicBool,
        mut on_terminals: F,
    ) -> Result<CheckStats, CheckError>
    where
        F: FnMut(Vec<TerminalGraph>) -> Result<(), CheckError>,
    {
        let ctx = ExplorationContext::new();
        let processes = self.composition.processes();
        let lts = MultiprocLts::new(processes);
        let init = self.composition.init(precision, &ctx);
        ctx.first_visit(init.key());

        let mut stats = CheckStats::default();
        let mut frontier = vec![init];
        while !frontier.is_empty() && !cancel.load(Ordering::Acquire) {
            stats.levels += 1;
            stats.states_explored += frontier.len();

            let (terminal, live): (Vec<_>, Vec<_>) =
                frontier.into_iter().partition(GlobalState::is_terminal);
            let mut graphs = Vec::new();
            for state in terminal {
                if self.ends_in_final(&state) {
                    graphs.push(TerminalGraph {
                        index: stats.terminal_states,
                        graph: EventGraph::from_state(&state, processes),
                    });
                    stats.terminal_states += 1;
                } else {
                    stats.blocked_states += 1;
                }
            }
            if !graphs.is_empty() {
                tracing::debug!(level = stats.levels, terminals = graphs.len(), "terminal states");
                on_terminals(graphs)?;
            }
            if cancel.load(Ordering::Acquire) {
                break;
            }

            let expansions: Vec<Expansion> = pool.install(|| {
                live.par_iter()
                    .map(|state| self.expand(state, &lts, precision, &ctx))
                    .collect()
            });
            let mut next = Vec::new();
            for expansion in expansions {
                stats.duplicate_states += expansion.duplicates;
                stats.subsumed_states += expansion.subsumed;
                if expansion.generated == 0 {
                    stats.blocked_states += 1;
                }
                next.extend(expansion.fresh);
            }
            next.sort_by_cached_key(GlobalState::key);
            tracing::trace!(level = stats.levels, frontier = next.len(), "level expanded");
            frontier = next;
        }
        tracing::debug!(
            visited = ctx.visited_count(),
            events = ctx.ids.allocated(),
            levels = stats.levels,
            "exploration done"
        );
        Ok(stats)
    }

    fn expand(
        &self,
        state: &GlobalState,
        lts: &MultiprocLts<'_>,
        precision: &Precision,
        ctx: &ExplorationContext,
    ) -> Expansion {
        let mut out = Expansion::default();
        for action in lts.enabled_actions(state) {
            for succ in self.composition.trans(state, &action, precision, ctx) {
                out.generated += 1;
                if !ctx.first_visit(succ.key()) {
                    out.duplicates += 1;
                    continue;
                }
                if self.config.subsumption && ctx.is_subsumed(&succ) {
                    out.subsumed += 1;
                    continue;
                }
                out.fresh.push(succ);
            }
        }
        out
    }

    /// A terminated process may be stuck in a non-final location; such
    /// states are not proper executions.
    fn ends_in_final(&self, state: &GlobalState) -> bool {
        self.composition
            .processes()
            .iter()
            .zip(&state.locals)
            .all(|(p, l)| p.automaton().is_final(l.location))
    }

    fn query_level(
        &self,
        pool: &rayon::ThreadPool,
        terminals: &[TerminalGraph],
        outcome: &Outcome,
        cancel: &AtomicBool,
    ) -> Vec<QueryOutcome> {
        let first_only = self.config.search == SearchMode::FirstSolution;
        let eager = self.config.errors == ErrorPolicy::Eager;
        pool.install(|| {
            terminals
                .par_iter()
                .map_init(
                    || create_backend(self.config.backend, self.config.timeout_ms),
                    |backend, terminal| {
                        if cancel.load(Ordering::Acquire) {
                            return QueryOutcome::Skipped;
                        }
                        let answer = match backend {
                            Ok(backend) => self.query(&**backend, terminal, outcome),
                            Err(err) => QueryOutcome::Failed(CheckError::Solver {
                                terminal: terminal.index,
                                description: terminal.graph.to_string(),
                                source: mcm_solver::error::SolverError::ProcessError(format!(
                                    "backend unavailable: {err}"
                                )),
                            }),
                        };
                        let stop = match &answer {
                            QueryOutcome::Sat(_) => first_only,
                            QueryOutcome::Failed(_) => eager,
                            _ => false,
                        };
                        if stop {
                            cancel.store(true, Ordering::Release);
                        }
                        answer
                    },
                )
                .collect()
        })
    }

    fn query(
        &self,
        backend: &dyn SolverBackend,
        terminal: &TerminalGraph,
        outcome: &Outcome,
    ) -> QueryOutcome {
        let script = match encode_query(&terminal.graph, &self.mcm, outcome) {
            Ok(script) => script,
            Err(err) => return QueryOutcome::Failed(CheckError::InvalidModel(err)),
        };
        tracing::trace!(terminal = terminal.index, script = %script, "querying solver");
        match backend.check_sat(&script) {
            Ok(SolverResult::Sat(model)) => {
                let model = model.unwrap_or_default();
                let graph = ResolvedGraph::resolve(terminal.graph.clone(), &model);
                if !outcome.holds_in(&graph) {
                    let reason = "witness does not exhibit the outcome";
                    tracing::warn!(terminal = terminal.index, "{reason}");
                    return QueryOutcome::Unknown(reason.to_string());
                }
                QueryOutcome::Sat(Box::new(Solution {
                    terminal: terminal.index,
                    graph,
                    model,
                }))
            }
            Ok(SolverResult::Unsat) => QueryOutcome::Unsat,
            Ok(SolverResult::Unknown(reason)) => QueryOutcome::Unknown(reason),
            Err(source) => QueryOutcome::Failed(CheckError::Solver {
                terminal: terminal.index,
                description: terminal.graph.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models;
    use crate::process::Label;
    use mcm_smtlib::term::Term;

    fn store(var: &str, v: i128) -> Label {
        Label::Store(var.into(), Term::int(v))
    }

    fn load(reg: &str, var: &str) -> Label {
        Label::Load(reg.into(), var.into())
    }

    fn single_thread() -> McmChecker {
        let p = ProcessAutomaton::straight_line("P0", [store("x", 1), load("r0", "x")]);
        McmChecker::new(vec![p], &[], models::sc(), CheckerConfig::default().with_jobs(1))
    }

    #[test]
    fn single_thread_reads_own_write() {
        let checker = single_thread();
        let result = checker
            .check(&Precision::new(), &Outcome::any().with_register(0, "r0", 1))
            .unwrap();
        assert!(result.is_allowed());
        assert_eq!(result.stats.terminal_states, 1);

        let stale = checker
            .check(&Precision::new(), &Outcome::any().with_register(0, "r0", 0))
            .unwrap();
        assert!(!stale.is_allowed());
        assert!(stale.unknowns.is_empty());
    }

    #[test]
    fn exploration_counts_levels() {
        let exploration = single_thread().explore_terminals(&Precision::new()).unwrap();
        assert_eq!(exploration.terminals.len(), 1);
        assert_eq!(exploration.stats.levels, 3);
        assert_eq!(exploration.stats.states_explored, 3);
    }

    #[test]
    fn blocked_assume_is_not_terminal() {
        let p = ProcessAutomaton::straight_line(
            "P0",
            [load("r0", "x"), Label::Assume(Term::eq(Term::var("r0"), Term::int(5)))],
        );
        let checker = McmChecker::new(vec![p], &[], models::sc(), CheckerConfig::default());
        let result = checker.check(&Precision::new(), &Outcome::any()).unwrap();
        // The guard is symbolic, so the state is kept and the solver rules it out.
        assert_eq!(result.stats.terminal_states, 1);
        assert!(!result.is_allowed());
    }

    /// Claims every script satisfiable without naming any value.
    struct EmptyModelBackend;

    impl SolverBackend for EmptyModelBackend {
        fn check_sat(
            &self,
            _script: &mcm_smtlib::script::Script,
        ) -> Result<SolverResult, mcm_solver::error::SolverError> {
            Ok(SolverResult::Sat(None))
        }
    }

    #[test]
    fn witness_must_exhibit_outcome() {
        let checker = single_thread();
        let exploration = checker.explore_terminals(&Precision::new()).unwrap();
        let terminal = &exploration.terminals[0];

        let wanted = Outcome::any().with_register(0, "r0", 1);
        let answer = checker.query(&EmptyModelBackend, terminal, &wanted);
        assert!(matches!(answer, QueryOutcome::Unknown(ref reason) if reason.contains("witness")));

        // Nothing to exhibit, so any model is a witness.
        let answer = checker.query(&EmptyModelBackend, terminal, &Outcome::any());
        assert!(matches!(answer, QueryOutcome::Sat(_)));
    }

    #[test]
    fn invalid_outcome_is_rejected() {
        let err = single_thread()
            .check(&Precision::new(), &Outcome::any().with_register(3, "r0", 1))
            .unwrap_err();
        assert!(matches!(err, CheckError::InvalidOutcome(_)));
    }
}
