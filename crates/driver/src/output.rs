/// Colored text report of a litmus check.
///
/// ```text
///   SB under tso: exists 0:r0=0 /\ 1:r0=0
///   [ALLOWED]  1 witness(es)
///   witness #0 (terminal 0)
///     ...
///   states: 9, terminals: 1 (1 queried), blocked: 0, duplicates: 2, subsumed: 0
///   walltime: 3 ms
/// ```
use colored::Colorize;

use mcm_checker::{McmResult, ProcessAutomaton, Solution, Verdict};

/// Print a header for the check run.
pub fn print_header(test: &str, model: &str, outcome: &str) {
    eprintln!(
        "{}",
        format!("{test} under {model}: exists {outcome}").bold()
    );
}

pub fn print_automata(automata: &[ProcessAutomaton]) {
    for automaton in automata {
        eprintln!("{automaton}");
    }
}

fn verdict_tag(verdict: Verdict) -> String {
    match verdict {
        Verdict::Allowed => "[ALLOWED]".green().bold().to_string(),
        Verdict::Forbidden => "[FORBIDDEN]".red().bold().to_string(),
        Verdict::Inconclusive => "[INCONCLUSIVE]".yellow().bold().to_string(),
    }
}

fn print_solution(index: usize, solution: &Solution, verbose: bool) {
    eprintln!(
        "  {} (terminal {})",
        format!("witness #{index}").cyan(),
        solution.terminal
    );
    for line in solution.graph.to_string().lines() {
        eprintln!("    {line}");
    }
    for (process, registers) in solution.graph.final_registers.iter().enumerate() {
        if registers.is_empty() {
            continue;
        }
        let values: Vec<String> = registers.iter().map(|(r, v)| format!("{r}={v}")).collect();
        eprintln!("    {process}: {}", values.join(" "));
    }
    if !solution.graph.final_memory.is_empty() {
        let values: Vec<String> = solution
            .graph
            .final_memory
            .iter()
            .map(|(var, v)| format!("{var}={v}"))
            .collect();
        eprintln!("    memory: {}", values.join(" "));
    }
    if verbose {
        for (name, value) in &solution.model.assignments {
            eprintln!("    {}", format!("{name} = {value}").dimmed());
        }
    }
}

/// Print verdict, witnesses, unknown queries, failures and statistics.
///
/// Only the first witness is shown unless `verbose` is set.
pub fn print_result(result: &McmResult, verbose: bool) {
    let verdict = result.verdict();
    let detail = match verdict {
        Verdict::Allowed => format!("{} witness(es)", result.solutions.len()),
        Verdict::Forbidden => "no consistent execution".to_string(),
        Verdict::Inconclusive => format!(
            "{} unknown, {} failed",
            result.unknowns.len(),
            result.failures.len()
        ),
    };
    eprintln!("  {}  {detail}", verdict_tag(verdict));

    let shown = if verbose { result.solutions.len() } else { 1 };
    for (i, solution) in result.solutions.iter().take(shown).enumerate() {
        print_solution(i, solution, verbose);
    }

    for unknown in &result.unknowns {
        eprintln!(
            "  {}  terminal {} ({}): {}",
            "[UNKNOWN]".yellow().bold(),
            unknown.terminal,
            unknown.description,
            unknown.reason
        );
    }
    for failure in &result.failures {
        eprintln!("  {}  {failure}", "[ERROR]".red().bold());
    }

    let stats = &result.stats;
    eprintln!();
    eprintln!(
        "states: {}, terminals: {} ({} queried), blocked: {}, duplicates: {}, subsumed: {}",
        stats.states_explored,
        stats.terminal_states,
        stats.terminals_queried,
        stats.blocked_states,
        stats.duplicate_states,
        stats.subsumed_states,
    );
}

pub fn print_walltime(millis: u64) {
    eprintln!("{}", format!("walltime: {millis} ms").dimmed());
}

pub fn print_error(err: &dyn std::error::Error) {
    eprintln!("{} {err}", "error:".red().bold());
}
