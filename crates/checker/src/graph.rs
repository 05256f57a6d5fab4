//! Event graphs of terminal states.
//!
//! An [`EventGraph`] holds the events of one root-to-terminal path. Program
//! order is fixed by `(thread, index)`; reads-from and coherence edges are
//! only candidates until a solver model picks them, which yields a
//! [`ResolvedGraph`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use mcm_smtlib::eval::{Value, eval_term};
use mcm_smtlib::term::Term;
use mcm_solver::model::Model;

use crate::composition::{EventShape, GlobalState};
use crate::event::{INIT_THREAD, MemoryEvent};
use crate::process::ProcessWrapper;

/// Solver symbol for "read `read` takes its value from write `write`".
pub fn rf_var(read: usize, write: usize) -> String {
    format!("rf_{read}_{write}")
}

/// Solver symbol for "write `a` precedes write `b` in coherence order".
pub fn co_var(a: usize, b: usize) -> String {
    format!("co_{a}_{b}")
}

/// Events of one terminal state plus the final process data.
///
/// Nodes are indexed: initial writes first, then events ordered by
/// `(thread, index)`.
#[derive(Debug, Clone)]
pub struct EventGraph {
    events: Vec<MemoryEvent>,
    process_names: Vec<String>,
    registers: Vec<BTreeMap<String, Term>>,
    constraints: Vec<Term>,
}

/// Id-free form of a graph, equal for graphs that differ only by event ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphShape {
    pub events: Vec<EventShape>,
    pub registers: Vec<BTreeMap<String, Term>>,
    pub constraints: Vec<Term>,
}

impl EventGraph {
    pub fn from_state(state: &GlobalState, processes: &[ProcessWrapper]) -> Self {
        let mut events = state.prefix.to_vec();
        events.sort_by_key(|e| (!e.is_init(), e.thread(), e.index()));
        Self {
            events,
            process_names: processes
                .iter()
                .map(|p| p.automaton().name().to_string())
                .collect(),
            registers: state.locals.iter().map(|l| l.valuation.clone()).collect(),
            constraints: state.constraints().into_iter().collect(),
        }
    }

    pub fn events(&self) -> &[MemoryEvent] {
        &self.events
    }

    pub fn event(&self, node: usize) -> Option<&MemoryEvent> {
        self.events.get(node)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn process_names(&self) -> &[String] {
        &self.process_names
    }

    pub fn reads(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.events.len()).filter(|&i| self.events[i].is_read())
    }

    pub fn writes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.events.len()).filter(|&i| self.events[i].is_write())
    }

    pub fn writes_to<'a>(&'a self, var: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.writes().filter(move |&i| self.events[i].var() == var)
    }

    pub fn variables(&self) -> BTreeSet<&str> {
        self.events.iter().map(|e| e.var()).collect()
    }

    pub fn same_var(&self, a: usize, b: usize) -> bool {
        self.events[a].var() == self.events[b].var()
    }

    pub fn same_thread(&self, a: usize, b: usize) -> bool {
        self.events[a].thread() == self.events[b].thread()
    }

    /// `a` precedes `b` in program order. Initial writes are not ordered
    /// by program order.
    pub fn program_order(&self, a: usize, b: usize) -> bool {
        let (ea, eb) = (&self.events[a], &self.events[b]);
        !ea.is_init() && ea.thread() == eb.thread() && ea.index() < eb.index()
    }

    /// Immediate program-order edges.
    pub fn po_edges(&self) -> Vec<(usize, usize)> {
        self.events
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| {
                !pair[0].is_init()
                    && pair[0].thread() == pair[1].thread()
                    && pair[0].index() < pair[1].index()
            })
            .map(|(i, _)| (i, i + 1))
            .collect()
    }

    /// `(read, write)` pairs on the same variable.
    pub fn rf_candidates(&self) -> Vec<(usize, usize)> {
        self.reads()
            .flat_map(|r| {
                self.writes_to(self.events[r].var())
                    .map(move |w| (r, w))
            })
            .collect()
    }

    /// Ordered pairs of distinct writes to the same variable.
    pub fn co_candidates(&self) -> Vec<(usize, usize)> {
        self.writes()
            .flat_map(|a| {
                self.writes_to(self.events[a].var())
                    .filter(move |&b| b != a)
                    .map(move |b| (a, b))
            })
            .collect()
    }

    /// Final term of `reg` in `process`; unassigned registers are 0.
    pub fn register_term(&self, process: usize, reg: &str) -> Option<Term> {
        let valuation = self.registers.get(process)?;
        Some(valuation.get(reg).cloned().unwrap_or(Term::int(0)))
    }

    pub fn registers(&self) -> &[BTreeMap<String, Term>] {
        &self.registers
    }

    /// Deferred path constraints of all processes.
    pub fn constraints(&self) -> &[Term] {
        &self.constraints
    }

    pub fn shape(&self) -> GraphShape {
        GraphShape {
            events: self.events.iter().map(EventShape::from).collect(),
            registers: self.registers.clone(),
            constraints: self.constraints.clone(),
        }
    }
}

impl fmt::Display for EventGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut by_thread: BTreeMap<usize, Vec<&MemoryEvent>> = BTreeMap::new();
        for e in &self.events {
            by_thread.entry(e.thread()).or_default().push(e);
        }
        let mut first = true;
        for (thread, events) in by_thread {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            let labels: Vec<String> = events.iter().map(|e| e.to_string()).collect();
            if thread == INIT_THREAD {
                write!(f, "init: {}", labels.join(" "))?;
            } else {
                let name = self.process_names.get(thread).map_or("?", String::as_str);
                write!(f, "{name}: {}", labels.join(" "))?;
            }
        }
        Ok(())
    }
}

/// An event graph with the solver's choice of edges and values.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    pub graph: EventGraph,
    /// `(write, read)` edges.
    pub rf: Vec<(usize, usize)>,
    /// Per variable, writes in coherence order.
    pub coherence: BTreeMap<String, Vec<usize>>,
    /// Value observed by each read node.
    pub read_values: BTreeMap<usize, i128>,
    /// Value stored by each write node.
    pub write_values: BTreeMap<usize, i128>,
    /// Final register values per process.
    pub final_registers: Vec<BTreeMap<String, i128>>,
    /// Value of the coherence-last write of each variable.
    pub final_memory: BTreeMap<String, i128>,
}

impl ResolvedGraph {
    pub fn resolve(graph: EventGraph, model: &Model) -> Self {
        let rf: Vec<(usize, usize)> = graph
            .rf_candidates()
            .into_iter()
            .filter(|&(r, w)| model.get_bool(&rf_var(r, w)) == Some(true))
            .map(|(r, w)| (w, r))
            .collect();

        let mut coherence = BTreeMap::new();
        for var in graph.variables() {
            let mut writes: Vec<usize> = graph.writes_to(var).collect();
            let predecessors = |w: usize| {
                graph
                    .writes_to(var)
                    .filter(|&b| b != w && model.get_bool(&co_var(b, w)) == Some(true))
                    .count()
            };
            writes.sort_by_key(|&w| (predecessors(w), w));
            if !writes.is_empty() {
                coherence.insert(var.to_string(), writes);
            }
        }

        let model_env = |name: &str| model.get_int(name).map(Value::Int);
        let mut read_values = BTreeMap::new();
        let mut symbols = BTreeMap::new();
        for r in graph.reads() {
            let Some(symbol) = graph.events[r].value_symbol() else {
                continue;
            };
            let from_model = model.get_int(&symbol);
            let from_source = || {
                let (w, _) = rf.iter().find(|(_, read)| *read == r)?;
                let term = graph.events[*w].value()?;
                eval_term(term, &model_env)?.as_int()
            };
            if let Some(v) = from_model.or_else(from_source) {
                read_values.insert(r, v);
                symbols.insert(symbol, v);
            }
        }

        let env = |name: &str| {
            model
                .get_int(name)
                .or_else(|| symbols.get(name).copied())
                .map(Value::Int)
        };
        let final_registers = graph
            .registers
            .iter()
            .map(|valuation| {
                valuation
                    .iter()
                    .filter_map(|(reg, term)| {
                        let v = eval_term(term, &env)?.as_int()?;
                        Some((reg.clone(), v))
                    })
                    .collect()
            })
            .collect();
        let write_values: BTreeMap<usize, i128> = graph
            .writes()
            .filter_map(|w| {
                let v = eval_term(graph.events[w].value()?, &env)?.as_int()?;
                Some((w, v))
            })
            .collect();
        let final_memory = coherence
            .iter()
            .filter_map(|(var, order)| {
                let v = write_values.get(order.last()?)?;
                Some((var.clone(), *v))
            })
            .collect();

        Self {
            graph,
            rf,
            coherence,
            read_values,
            write_values,
            final_registers,
            final_memory,
        }
    }

    /// Immediate coherence edges.
    pub fn co_edges(&self) -> Vec<(usize, usize)> {
        self.coherence
            .values()
            .flat_map(|order| order.windows(2).map(|w| (w[0], w[1])))
            .collect()
    }

    pub fn po_edges(&self) -> Vec<(usize, usize)> {
        self.graph.po_edges()
    }

    /// Value read or written by `node`.
    pub fn value_of(&self, node: usize) -> Option<i128> {
        self.read_values
            .get(&node)
            .or_else(|| self.write_values.get(&node))
            .copied()
    }
}

impl fmt::Display for ResolvedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |node: usize| {
            self.graph
                .event(node)
                .map_or_else(|| format!("#{node}"), |e| e.to_string())
        };
        writeln!(f, "{}", self.graph)?;
        for &(w, r) in &self.rf {
            let value = self
                .read_values
                .get(&r)
                .map_or_else(String::new, |v| format!(" = {v}"));
            writeln!(f, "  rf: {} -> {}{value}", label(w), label(r))?;
        }
        for (var, order) in &self.coherence {
            let chain: Vec<String> = order.iter().map(|&w| label(w)).collect();
            writeln!(f, "  co({var}): {}", chain.join(" -> "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composition, ExplorationContext};
    use crate::process::{Label, Precision, ProcessAutomaton};
    use crate::scheduler::Action;
    use std::sync::Arc;

    /// Run every process to completion in thread order.
    fn terminal(automata: Vec<ProcessAutomaton>) -> (EventGraph, Composition) {
        let comp = Composition::new(automata.into_iter().map(Arc::new).collect(), &[]);
        let ctx = ExplorationContext::new();
        let prec = Precision::new();
        let mut state = comp.init(&prec, &ctx);
        for p in 0..comp.processes().len() {
            while !state.terminated.contains(&p) {
                state = comp
                    .trans(&state, &Action { process: p, edge: state.locals[p].location }, &prec, &ctx)
                    .remove(0);
            }
        }
        (EventGraph::from_state(&state, comp.processes()), comp)
    }

    fn mp() -> EventGraph {
        terminal(vec![
            ProcessAutomaton::straight_line(
                "P0",
                vec![
                    Label::Store("x".into(), Term::int(1)),
                    Label::Store("y".into(), Term::int(1)),
                ],
            ),
            ProcessAutomaton::straight_line(
                "P1",
                vec![
                    Label::Load("r0".into(), "y".into()),
                    Label::Load("r1".into(), "x".into()),
                ],
            ),
        ])
        .0
    }

    #[test]
    fn nodes_are_init_first_then_program_order() {
        let g = mp();
        let labels: Vec<String> = g.events().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "W(x)=0@init",
                "W(y)=0@init",
                "W(x)=1@T0.0",
                "W(y)=1@T0.1",
                "R(y)@T1.0",
                "R(x)@T1.1",
            ]
        );
        assert_eq!(g.po_edges(), vec![(2, 3), (4, 5)]);
        assert!(g.program_order(2, 3));
        assert!(!g.program_order(0, 1));
        assert!(!g.program_order(3, 4));
    }

    #[test]
    fn candidates_stay_on_one_variable() {
        let g = mp();
        assert_eq!(g.rf_candidates(), vec![(4, 1), (4, 3), (5, 0), (5, 2)]);
        assert_eq!(g.co_candidates(), vec![(0, 2), (1, 3), (2, 0), (3, 1)]);
    }

    #[test]
    fn resolve_reads_model_choices() {
        let g = mp();
        let model = Model::with_assignments(vec![
            (rf_var(4, 3), "true".into()),
            (rf_var(4, 1), "false".into()),
            (rf_var(5, 0), "true".into()),
            (rf_var(5, 2), "false".into()),
            (co_var(0, 2), "true".into()),
            (co_var(2, 0), "false".into()),
            (co_var(1, 3), "true".into()),
            (co_var(3, 1), "false".into()),
            ("rv_t1_0".into(), "1".into()),
        ]);
        let resolved = ResolvedGraph::resolve(g, &model);
        assert_eq!(resolved.rf, vec![(3, 4), (0, 5)]);
        assert_eq!(resolved.coherence.get("x"), Some(&vec![0, 2]));
        assert_eq!(resolved.co_edges(), vec![(0, 2), (1, 3)]);
        assert_eq!(resolved.read_values.get(&4), Some(&1));
        // Not in the model: recovered from the rf source.
        assert_eq!(resolved.read_values.get(&5), Some(&0));
        assert_eq!(resolved.final_registers[1].get("r0"), Some(&1));
        assert_eq!(resolved.final_registers[1].get("r1"), Some(&0));
        assert_eq!(resolved.final_memory.get("y"), Some(&1));
        assert!(resolved.to_string().contains("rf: W(y)=1@T0.1 -> R(y)@T1.0 = 1"));
    }

    #[test]
    fn shape_ignores_event_ids() {
        assert_eq!(mp().shape(), mp().shape());
    }
}
