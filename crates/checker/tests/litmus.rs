//! Litmus tests run end to end through `McmChecker` on the built-in backend.
//!
//! | Test | Outcome                    | SC | TSO | RA | coherence |
//! |------|----------------------------|----|-----|----|-----------|
//! | SB   | both reads see 0           | no | yes | yes| yes       |
//! | MP   | flag seen, data stale      | no | no  | no | yes       |
//! | CoWR | own write not observed     | no | no  | no | no        |

use mcm_checker::mcm::McmError;
use mcm_checker::{
    Axiom, CheckError, CheckerConfig, GraphShape, Label, McmChecker, Outcome, Precision,
    ProcessAutomaton, RelExpr, SearchMode, Verdict, models,
};
use mcm_smtlib::Term;
use mcm_solver::{BackendKind, SolverKind, create_backend};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn store(var: &str, v: i128) -> Label {
    Label::Store(var.into(), Term::int(v))
}

fn load(reg: &str, var: &str) -> Label {
    Label::Load(reg.into(), var.into())
}

fn store_buffering() -> Vec<ProcessAutomaton> {
    vec![
        ProcessAutomaton::straight_line("P0", [store("x", 1), load("r0", "y")]),
        ProcessAutomaton::straight_line("P1", [store("y", 1), load("r0", "x")]),
    ]
}

fn message_passing() -> Vec<ProcessAutomaton> {
    vec![
        ProcessAutomaton::straight_line("P0", [store("x", 1), store("y", 1)]),
        ProcessAutomaton::straight_line("P1", [load("r0", "y"), load("r1", "x")]),
    ]
}

fn sb_outcome() -> Outcome {
    "0:r0=0 /\\ 1:r0=0".parse().unwrap()
}

fn mp_outcome() -> Outcome {
    "1:r0=1 /\\ 1:r1=0".parse().unwrap()
}

fn checker(program: Vec<ProcessAutomaton>, model: &str) -> McmChecker {
    McmChecker::new(
        program,
        &[],
        models::by_name(model).unwrap(),
        CheckerConfig::default().with_jobs(2),
    )
}

fn verdict(program: Vec<ProcessAutomaton>, model: &str, outcome: &Outcome) -> Verdict {
    checker(program, model)
        .check(&Precision::new(), outcome)
        .unwrap()
        .verdict()
}

fn terminal_shapes(checker: &McmChecker, precision: &Precision) -> Vec<GraphShape> {
    let mut shapes: Vec<GraphShape> = checker
        .explore_terminals(precision)
        .unwrap()
        .terminals
        .iter()
        .map(|t| t.graph.shape())
        .collect();
    shapes.sort();
    shapes
}

// ---------------------------------------------------------------------------
// Classic shapes
// ---------------------------------------------------------------------------

#[test]
fn sb_forbidden_under_sc() {
    let result = checker(store_buffering(), "sc")
        .check(&Precision::new(), &sb_outcome())
        .unwrap();
    assert_eq!(result.verdict(), Verdict::Forbidden);
    assert!(result.solutions.is_empty());
    assert!(result.unknowns.is_empty());
    assert!(result.stats.terminals_queried >= 1);
}

#[test]
fn sb_allowed_under_tso_with_witness() {
    let outcome = sb_outcome();
    let result = checker(store_buffering(), "tso")
        .check(&Precision::new(), &outcome)
        .unwrap();
    assert_eq!(result.verdict(), Verdict::Allowed);

    let solution = &result.solutions[0];
    let graph = &solution.graph;
    assert!(outcome.holds_in(graph));
    assert_eq!(graph.final_registers[0].get("r0"), Some(&0));
    assert_eq!(graph.final_registers[1].get("r0"), Some(&0));
    // Both reads are fed by initial writes.
    assert_eq!(graph.rf.len(), 2);
    for &(write, _) in &graph.rf {
        assert!(graph.graph.event(write).unwrap().is_init());
    }
    assert!(graph.read_values.values().all(|&v| v == 0));
}

#[test]
fn sb_allowed_under_ra() {
    assert_eq!(verdict(store_buffering(), "ra", &sb_outcome()), Verdict::Allowed);
}

#[test]
fn mp_allowed_under_coherence_only() {
    assert_eq!(verdict(message_passing(), "coherence", &mp_outcome()), Verdict::Allowed);
}

#[test]
fn mp_forbidden_under_ra_and_tso() {
    assert_eq!(verdict(message_passing(), "ra", &mp_outcome()), Verdict::Forbidden);
    assert_eq!(verdict(message_passing(), "tso", &mp_outcome()), Verdict::Forbidden);
    assert_eq!(verdict(message_passing(), "sc", &mp_outcome()), Verdict::Forbidden);
}

#[test]
fn mp_expected_outcome_allowed_everywhere() {
    let outcome: Outcome = "1:r0=1 /\\ 1:r1=1".parse().unwrap();
    for model in models::BUILTIN_MODELS {
        assert_eq!(verdict(message_passing(), model, &outcome), Verdict::Allowed, "{model}");
    }
}

#[test]
fn cowr_forbidden_everywhere() {
    let program = vec![ProcessAutomaton::straight_line("P0", [store("x", 1), load("r0", "x")])];
    let outcome = Outcome::any().with_register(0, "r0", 0);
    for model in models::BUILTIN_MODELS {
        assert_eq!(verdict(program.clone(), model, &outcome), Verdict::Forbidden, "{model}");
    }
}

#[test]
fn final_memory_outcome() {
    let program = vec![
        ProcessAutomaton::straight_line("P0", [store("x", 1)]),
        ProcessAutomaton::straight_line("P1", [store("x", 2)]),
    ];
    for value in [1, 2] {
        let outcome = Outcome::any().with_memory("x", value);
        assert_eq!(verdict(program.clone(), "sc", &outcome), Verdict::Allowed);
    }
    let initial = Outcome::any().with_memory("x", 0);
    assert_eq!(verdict(program, "sc", &initial), Verdict::Forbidden);
}

#[test]
fn initial_writes_are_observable() {
    let program = vec![ProcessAutomaton::straight_line("P0", [load("r0", "x")])];
    let checker = McmChecker::new(
        program,
        &[("x".to_string(), 7)],
        models::sc(),
        CheckerConfig::default(),
    );
    let seven = checker
        .check(&Precision::new(), &Outcome::any().with_register(0, "r0", 7))
        .unwrap();
    assert!(seven.is_allowed());
    let zero = checker
        .check(&Precision::new(), &Outcome::any().with_register(0, "r0", 0))
        .unwrap();
    assert_eq!(zero.verdict(), Verdict::Forbidden);
}

// ---------------------------------------------------------------------------
// Exploration properties
// ---------------------------------------------------------------------------

#[test]
fn program_order_matches_each_path() {
    let exploration = checker(message_passing(), "sc")
        .explore_terminals(&Precision::new())
        .unwrap();
    for terminal in &exploration.terminals {
        let graph = &terminal.graph;
        for (a, b) in graph.po_edges() {
            let (ea, eb) = (graph.event(a).unwrap(), graph.event(b).unwrap());
            assert_eq!(ea.thread(), eb.thread());
            assert_eq!(ea.index() + 1, eb.index());
        }
        // Two events per thread, chained once each.
        assert_eq!(graph.po_edges().len(), 2);
    }
}

#[test]
fn exploration_is_deterministic() {
    let precision = Precision::new().with_tracked("r2");
    let program = || {
        let mut p = store_buffering();
        p.push(ProcessAutomaton::straight_line(
            "P2",
            [Label::Nondet("r2".into(), vec![1, 2]), Label::Store("z".into(), Term::var("r2"))],
        ));
        p
    };
    let serial = McmChecker::new(program(), &[], models::sc(), CheckerConfig::default().with_jobs(1));
    let parallel = McmChecker::new(program(), &[], models::sc(), CheckerConfig::default().with_jobs(4));

    let first = terminal_shapes(&serial, &precision);
    assert_eq!(first.len(), 2);
    assert_eq!(first, terminal_shapes(&serial, &precision));
    assert_eq!(first, terminal_shapes(&parallel, &precision));
}

/// `r0 = x`, then either skip or `assume r0 == 1`, rejoining before `y = 1`.
/// The assume arm reaches the same location as the skip arm with one more
/// deferred constraint.
fn converging_branch() -> Vec<ProcessAutomaton> {
    let mut p0 = ProcessAutomaton::new("P0");
    let start = p0.initial();
    let loaded = p0.add_location();
    let joined = p0.add_location();
    let done = p0.add_location();
    p0.add_edge(start, loaded, load("r0", "x")).unwrap();
    p0.add_edge(loaded, joined, Label::Skip).unwrap();
    p0.add_edge(
        loaded,
        joined,
        Label::Assume(Term::eq(Term::var("r0"), Term::int(1))),
    )
    .unwrap();
    p0.add_edge(joined, done, store("y", 1)).unwrap();
    p0.mark_final(done).unwrap();
    vec![p0, ProcessAutomaton::straight_line("P1", [store("x", 1)])]
}

#[test]
fn subsumption_never_adds_solutions() {
    let outcome = Outcome::any().with_register(0, "r0", 1);
    let run = |subsumption| {
        let config = CheckerConfig::default().with_jobs(1).with_subsumption(subsumption);
        let result = McmChecker::new(converging_branch(), &[], models::sc(), config)
            .check(&Precision::new(), &outcome)
            .unwrap();
        let mut shapes: Vec<GraphShape> =
            result.solutions.iter().map(|s| s.graph.graph.shape()).collect();
        shapes.sort();
        let verdict = result.verdict();
        (result.stats, verdict, shapes)
    };

    let (plain, plain_verdict, without) = run(false);
    let (pruned, pruned_verdict, with) = run(true);
    assert_eq!(plain.subsumed_states, 0);
    assert!(pruned.subsumed_states > 0);
    assert!(pruned.states_explored < plain.states_explored);

    // Both arms terminate without pruning; only the unconstrained one with it.
    assert_eq!(plain.terminal_states, 2);
    assert_eq!(pruned.terminal_states, 1);
    assert_eq!(without.len(), 2);
    assert_eq!(with.len(), 1);
    assert!(with.iter().all(|s| without.contains(s)));
    assert!(with[0].constraints.is_empty());
    assert_eq!(plain_verdict, Verdict::Allowed);
    assert_eq!(pruned_verdict, plain_verdict);
}

#[test]
fn first_solution_stops_early() {
    let program = || {
        vec![ProcessAutomaton::straight_line(
            "P0",
            [Label::Nondet("r0".into(), vec![0, 1, 2]), Label::Store("x".into(), Term::var("r0"))],
        )]
    };
    let precision = Precision::new().with_tracked("r0");
    let config = CheckerConfig::default().with_jobs(1);

    let exhaustive = McmChecker::new(program(), &[], models::sc(), config.clone())
        .check(&precision, &Outcome::any())
        .unwrap();
    assert_eq!(exhaustive.stats.terminal_states, 3);
    assert_eq!(exhaustive.stats.terminals_queried, 3);
    assert_eq!(exhaustive.solutions.len(), 3);

    let first = McmChecker::new(
        program(),
        &[],
        models::sc(),
        config.with_search(SearchMode::FirstSolution),
    )
    .check(&precision, &Outcome::any())
    .unwrap();
    assert_eq!(first.verdict(), Verdict::Allowed);
    assert!(first.stats.terminals_queried < exhaustive.stats.terminals_queried);
}

#[test]
fn first_solution_stops_expanding() {
    // Exit at once, or after three stores.
    let mut p = ProcessAutomaton::new("P0");
    let start = p.initial();
    let short = p.add_location();
    let (a, b, long) = (p.add_location(), p.add_location(), p.add_location());
    p.add_edge(start, short, Label::Skip).unwrap();
    p.add_edge(start, a, store("x", 1)).unwrap();
    p.add_edge(a, b, store("x", 2)).unwrap();
    p.add_edge(b, long, store("x", 3)).unwrap();
    p.mark_final(short).unwrap();
    p.mark_final(long).unwrap();

    let config = CheckerConfig::default().with_jobs(1);
    let exhaustive = McmChecker::new(vec![p.clone()], &[], models::sc(), config.clone())
        .check(&Precision::new(), &Outcome::any())
        .unwrap();
    assert_eq!(exhaustive.stats.terminal_states, 2);
    assert_eq!(exhaustive.stats.levels, 4);
    assert_eq!(exhaustive.stats.states_explored, 5);

    let first = McmChecker::new(
        vec![p],
        &[],
        models::sc(),
        config.with_search(SearchMode::FirstSolution),
    )
    .check(&Precision::new(), &Outcome::any())
    .unwrap();
    assert_eq!(first.verdict(), Verdict::Allowed);
    assert_eq!(first.solutions.len(), 1);
    // The witness at depth 1 stops the search before the long arm is
    // expanded.
    assert_eq!(first.stats.levels, 2);
    assert_eq!(first.stats.states_explored, 3);
    assert_eq!(first.stats.terminals_queried, 1);
}

#[test]
fn step_bound_cuts_loops() {
    let mut p = ProcessAutomaton::new("P0");
    let head = p.initial();
    let exit = p.add_location();
    p.add_edge(head, head, store("x", 1)).unwrap();
    p.add_edge(head, exit, Label::Skip).unwrap();
    p.mark_final(exit).unwrap();

    let checker = McmChecker::new(vec![p], &[], models::sc(), CheckerConfig::default());
    let exploration = checker
        .explore_terminals(&Precision::new().with_step_bound(4))
        .unwrap();
    // Exit after 0, 1, 2 or 3 stores.
    assert_eq!(exploration.terminals.len(), 4);
}

// ---------------------------------------------------------------------------
// Error paths
// ---------------------------------------------------------------------------

#[test]
fn unknown_relation_fails_before_exploration() {
    let bad = models::sc().with_axiom(Axiom::acyclic("ghb-order", RelExpr::named("ghb")));
    let checker = McmChecker::new(store_buffering(), &[], bad, CheckerConfig::default());
    let err = checker.check(&Precision::new(), &Outcome::any()).unwrap_err();
    assert_eq!(
        err,
        CheckError::InvalidModel(McmError::UnknownRelation {
            name: "ghb".to_string(),
            referenced_from: "ghb-order".to_string(),
        })
    );
    assert!(err.to_string().contains("ghb"));
}

#[test]
fn unknown_is_not_unsat() {
    // The written values grow without bound, so the built-in solver cannot
    // finitise the read and gives up.
    let program = vec![ProcessAutomaton::straight_line(
        "P0",
        [
            load("r0", "x"),
            Label::Store(
                "x".into(),
                Term::IntAdd(Box::new(Term::var("r0")), Box::new(Term::int(1))),
            ),
        ],
    )];
    let result = checker(program, "sc")
        .check(&Precision::new(), &Outcome::any())
        .unwrap();
    assert!(result.solutions.is_empty());
    assert_eq!(result.unknowns.len(), 1);
    assert_eq!(result.verdict(), Verdict::Inconclusive);
}

#[test]
fn sb_with_z3_subprocess() {
    let backend = BackendKind::Cli(SolverKind::Z3);
    if let Err(e) = create_backend(backend, 0) {
        eprintln!("Skipping -- Z3 not available: {e}");
        return;
    }
    let config = CheckerConfig::default().with_backend(backend);
    let sc = McmChecker::new(store_buffering(), &[], models::sc(), config.clone());
    assert_eq!(
        sc.check(&Precision::new(), &sb_outcome()).unwrap().verdict(),
        Verdict::Forbidden
    );
    let tso = McmChecker::new(store_buffering(), &[], models::tso(), config);
    assert_eq!(
        tso.check(&Precision::new(), &sb_outcome()).unwrap().verdict(),
        Verdict::Allowed
    );
}
