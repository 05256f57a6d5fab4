/// Structured JSON output of a litmus check.
///
/// Selected with `--output-format json`. Each witness carries its resolved
/// event graph so external tools can draw it.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mcm_checker::event::INIT_THREAD;
use mcm_checker::{McmResult, ResolvedGraph, Solution};

/// Complete check report in JSON format.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub test: String,
    pub model: String,
    pub outcome: String,
    /// "allowed", "forbidden" or "inconclusive"
    pub verdict: String,
    pub stats: JsonStats,
    pub solutions: Vec<JsonSolution>,
    pub unknowns: Vec<JsonUnknown>,
    pub failures: Vec<String>,
    pub walltime_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonStats {
    pub states_explored: usize,
    pub terminal_states: usize,
    pub terminals_queried: usize,
    pub blocked_states: usize,
    pub duplicate_states: usize,
    pub subsumed_states: usize,
    pub levels: usize,
}

/// One witnessing execution.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSolution {
    pub terminal: usize,
    pub nodes: Vec<JsonNode>,
    pub po: Vec<[usize; 2]>,
    /// `[write, read]` pairs.
    pub rf: Vec<[usize; 2]>,
    pub co: Vec<[usize; 2]>,
    pub final_registers: Vec<BTreeMap<String, i128>>,
    pub final_memory: BTreeMap<String, i128>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonNode {
    pub id: usize,
    /// Absent for initial writes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    pub index: usize,
    /// "R" or "W"
    pub kind: String,
    pub var: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i128>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonUnknown {
    pub terminal: usize,
    pub description: String,
    pub reason: String,
}

fn pairs(edges: Vec<(usize, usize)>) -> Vec<[usize; 2]> {
    edges.into_iter().map(|(a, b)| [a, b]).collect()
}

fn nodes(graph: &ResolvedGraph) -> Vec<JsonNode> {
    let names = graph.graph.process_names();
    graph
        .graph
        .events()
        .iter()
        .enumerate()
        .map(|(id, event)| {
            let thread = (event.thread() != INIT_THREAD).then_some(event.thread());
            JsonNode {
                id,
                thread,
                process: thread.and_then(|t| names.get(t).cloned()),
                index: event.index(),
                kind: event.kind().to_string(),
                var: event.var().to_string(),
                value: graph.value_of(id),
            }
        })
        .collect()
}

impl From<&Solution> for JsonSolution {
    fn from(solution: &Solution) -> Self {
        let graph = &solution.graph;
        JsonSolution {
            terminal: solution.terminal,
            nodes: nodes(graph),
            po: pairs(graph.po_edges()),
            rf: pairs(graph.rf.clone()),
            co: pairs(graph.co_edges()),
            final_registers: graph.final_registers.clone(),
            final_memory: graph.final_memory.clone(),
        }
    }
}

impl JsonReport {
    pub fn new(test: &str, model: &str, outcome: &str, result: &McmResult, walltime_ms: u64) -> Self {
        let stats = &result.stats;
        JsonReport {
            test: test.to_string(),
            model: model.to_string(),
            outcome: outcome.to_string(),
            verdict: result.verdict().to_string(),
            stats: JsonStats {
                states_explored: stats.states_explored,
                terminal_states: stats.terminal_states,
                terminals_queried: stats.terminals_queried,
                blocked_states: stats.blocked_states,
                duplicate_states: stats.duplicate_states,
                subsumed_states: stats.subsumed_states,
                levels: stats.levels,
            },
            solutions: result.solutions.iter().map(JsonSolution::from).collect(),
            unknowns: result
                .unknowns
                .iter()
                .map(|u| JsonUnknown {
                    terminal: u.terminal,
                    description: u.description.clone(),
                    reason: u.reason.clone(),
                })
                .collect(),
            failures: result.failures.iter().map(ToString::to_string).collect(),
            walltime_ms,
        }
    }
}

/// Print a JSON report to stdout.
///
/// JSON goes to stdout only; progress and warnings stay on stderr.
pub fn print_json_report(report: &JsonReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("[mcm-check] Error serializing JSON report: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcm_checker::{CheckerConfig, Label, McmChecker, Outcome, Precision, ProcessAutomaton, models};
    use mcm_smtlib::Term;

    fn mp_result() -> McmResult {
        let p0 = ProcessAutomaton::straight_line(
            "P0",
            [
                Label::Store("x".into(), Term::int(1)),
                Label::Store("y".into(), Term::int(1)),
            ],
        );
        let p1 = ProcessAutomaton::straight_line(
            "P1",
            [Label::Load("r0".into(), "y".into()), Label::Load("r1".into(), "x".into())],
        );
        let outcome = Outcome::any().with_register(1, "r0", 1).with_register(1, "r1", 0);
        McmChecker::new(vec![p0, p1], &[], models::coherence(), CheckerConfig::default())
            .check(&Precision::new(), &outcome)
            .unwrap()
    }

    #[test]
    fn report_carries_witness_graph() {
        let result = mp_result();
        let report = JsonReport::new("MP", "coherence", "1:r0=1 /\\ 1:r1=0", &result, 4);
        let json = serde_json::to_string(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["verdict"], "allowed");
        assert_eq!(parsed["model"], "coherence");
        let solution = &parsed["solutions"][0];
        // Two initial writes plus four accesses.
        assert_eq!(solution["nodes"].as_array().unwrap().len(), 6);
        assert_eq!(solution["rf"].as_array().unwrap().len(), 2);
        assert_eq!(solution["po"].as_array().unwrap().len(), 2);
        assert_eq!(solution["final_registers"][1]["r0"], 1);
        assert_eq!(solution["final_registers"][1]["r1"], 0);
        assert!(solution["nodes"][0].get("thread").is_none());
    }

    #[test]
    fn empty_result_reports_forbidden() {
        let report = JsonReport::new("t", "sc", "true", &McmResult::default(), 0);
        let parsed = serde_json::to_value(&report).unwrap();
        assert_eq!(parsed["verdict"], "forbidden");
        assert_eq!(parsed["stats"]["states_explored"], 0);
        assert!(parsed["solutions"].as_array().unwrap().is_empty());
    }
}
