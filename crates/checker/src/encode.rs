//! Encoding of one terminal event graph as a satisfiability query.
//!
//! Candidate edges become Boolean choice variables: `rf_<r>_<w>` (read `r`
//! takes its value from write `w`) and `co_<a>_<b>` (write `a` precedes
//! write `b`). Relations are sparse matrices of terms over these variables;
//! derived relations are computed by matrix algebra and transitive closures
//! by iterated squaring, with intermediate entries bound to fresh Boolean
//! definitions to keep the formula linear in the number of squarings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mcm_smtlib::eval::{Value, eval_term};
use mcm_smtlib::script::Script;
use mcm_smtlib::sort::Sort;
use mcm_smtlib::term::Term;

use crate::graph::{EventGraph, co_var, rf_var};
use crate::mcm::{AxiomKind, BaseRelation, EventSet, Mcm, McmError, RelExpr};
use crate::outcome::{Outcome, OutcomeAtom};

/// Rounds of the value-domain fixpoint before giving up.
const MAX_DOMAIN_ROUNDS: usize = 16;
/// Largest value set tracked for a single variable.
const MAX_DOMAIN_SIZE: usize = 64;
/// Largest number of symbol assignments evaluated for one written value.
const MAX_COMBINATIONS: usize = 4096;

/// Sparse relation: absent entries are `false`.
type Matrix = BTreeMap<(usize, usize), Term>;

/// Build the query for `graph` under `mcm` restricted to `outcome`.
pub fn encode_query(graph: &EventGraph, mcm: &Mcm, outcome: &Outcome) -> Result<Script, McmError> {
    let mut encoder = AxiomEncoder::new(graph, mcm);
    encoder.script.comment(format!("model {}: {graph}", mcm.name()));
    encoder.declare(outcome);
    encoder.encode_domains();
    encoder.encode_rf();
    encoder.encode_co();
    encoder.encode_data_flow();
    for axiom in mcm.axioms() {
        encoder.encode_axiom(axiom.kind, &axiom.rel, &axiom.name)?;
    }
    encoder.script.comment("path constraints");
    for constraint in graph.constraints() {
        encoder.script.assert(constraint.clone());
    }
    encoder.encode_outcome(outcome);
    Ok(encoder.script)
}

struct AxiomEncoder<'a> {
    graph: &'a EventGraph,
    mcm: &'a Mcm,
    script: Script,
    named: HashMap<String, Matrix>,
    fresh: usize,
}

impl<'a> AxiomEncoder<'a> {
    fn new(graph: &'a EventGraph, mcm: &'a Mcm) -> Self {
        Self {
            graph,
            mcm,
            script: Script::new(),
            named: HashMap::new(),
            fresh: 0,
        }
    }

    fn event_count(&self) -> usize {
        self.graph.len()
    }

    // ===== Declarations =====

    fn declare(&mut self, outcome: &Outcome) {
        for (r, w) in self.graph.rf_candidates() {
            self.script.declare_const(rf_var(r, w), Sort::Bool);
        }
        for (a, b) in self.graph.co_candidates() {
            if !self.is_init(a) && !self.is_init(b) {
                self.script.declare_const(co_var(a, b), Sort::Bool);
            }
        }

        let mut ints = BTreeSet::new();
        for e in self.graph.events() {
            if let Some(symbol) = e.value_symbol() {
                ints.insert(symbol);
            }
            if let Some(value) = e.value() {
                value.collect_consts(&mut ints);
            }
        }
        for constraint in self.graph.constraints() {
            constraint.collect_consts(&mut ints);
        }
        for atom in outcome.atoms() {
            if let OutcomeAtom::Register {
                process, register, ..
            } = atom
                && let Some(term) = self.graph.register_term(*process, register)
            {
                term.collect_consts(&mut ints);
            }
        }
        for name in ints {
            self.script.declare_const(name, Sort::Int);
        }
    }

    fn fresh_definition(&mut self, term: Term) -> Term {
        let name = format!("def_{}", self.fresh);
        self.fresh += 1;
        self.script.declare_const(name.clone(), Sort::Bool);
        self.script.assert(Term::iff(Term::var(name.clone()), term));
        Term::var(name)
    }

    /// Replace compound entries by fresh definitions.
    fn materialise(&mut self, m: Matrix) -> Matrix {
        m.into_iter()
            .map(|(k, t)| match t {
                Term::BoolLit(_) | Term::Const(_) => (k, t),
                compound => (k, self.fresh_definition(compound)),
            })
            .collect()
    }

    // ===== Execution well-formedness =====

    fn is_init(&self, node: usize) -> bool {
        self.graph.event(node).is_some_and(|e| e.is_init())
    }

    /// Coherence between two writes: initial writes come first.
    fn co_term(&self, a: usize, b: usize) -> Term {
        match (self.is_init(a), self.is_init(b)) {
            (true, _) => Term::BoolLit(true),
            (false, true) => Term::BoolLit(false),
            (false, false) => Term::var(co_var(a, b)),
        }
    }

    fn encode_domains(&mut self) {
        let Some(domains) = value_domains(self.graph) else {
            tracing::debug!("value domain did not converge; reads left unbounded");
            return;
        };
        self.script.comment("value domains");
        for r in self.graph.reads().collect::<Vec<_>>() {
            let Some(symbol) = self.graph.events()[r].value_symbol() else {
                continue;
            };
            let values = domains.get(&symbol).cloned().unwrap_or_default();
            self.script.assert(Term::or(
                values
                    .into_iter()
                    .map(|v| Term::eq(Term::var(symbol.clone()), Term::int(v)))
                    .collect(),
            ));
        }
    }

    /// Every read takes its value from exactly one write.
    fn encode_rf(&mut self) {
        self.script.comment("rf functional");
        for r in self.graph.reads().collect::<Vec<_>>() {
            let var = self.graph.events()[r].var();
            let sources: Vec<usize> = self.graph.writes_to(var).collect();
            let at_least_one = sources
                .iter()
                .map(|&w| Term::var(rf_var(r, w)))
                .collect();
            self.script.assert(Term::or(at_least_one));
            for (i, &wi) in sources.iter().enumerate() {
                for &wj in &sources[i + 1..] {
                    self.script.assert(Term::not(Term::and(vec![
                        Term::var(rf_var(r, wi)),
                        Term::var(rf_var(r, wj)),
                    ])));
                }
            }
        }
    }

    /// Coherence is a strict total order per variable.
    fn encode_co(&mut self) {
        self.script.comment("co total order");
        let vars: Vec<String> = self
            .graph
            .variables()
            .into_iter()
            .map(str::to_string)
            .collect();
        for var in vars {
            let writes: Vec<usize> = self
                .graph
                .writes_to(&var)
                .filter(|&w| !self.is_init(w))
                .collect();
            for (i, &a) in writes.iter().enumerate() {
                for &b in &writes[i + 1..] {
                    let (ab, ba) = (self.co_term(a, b), self.co_term(b, a));
                    self.script.assert(Term::or(vec![ab.clone(), ba.clone()]));
                    self.script.assert(Term::not(Term::and(vec![ab, ba])));
                }
            }
            for &a in &writes {
                for &b in &writes {
                    for &c in &writes {
                        if a != b && b != c && a != c {
                            self.script.assert(Term::implies(
                                Term::and(vec![self.co_term(a, b), self.co_term(b, c)]),
                                self.co_term(a, c),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// A read observes the value of the write it reads from.
    fn encode_data_flow(&mut self) {
        self.script.comment("data flow");
        for (r, w) in self.graph.rf_candidates() {
            let read = self.graph.events()[r].value_term();
            let written = self.graph.events()[w].value_term();
            self.script
                .assert(Term::implies(Term::var(rf_var(r, w)), Term::eq(read, written)));
        }
    }

    // ===== Relations =====

    fn base(&self, rel: BaseRelation) -> Matrix {
        let g = self.graph;
        let n = self.event_count();
        let mut m = Matrix::new();
        match rel {
            BaseRelation::Po => {
                for a in 0..n {
                    for b in 0..n {
                        if g.program_order(a, b) {
                            m.insert((a, b), Term::BoolLit(true));
                        }
                    }
                }
            }
            BaseRelation::Rf => {
                for (r, w) in g.rf_candidates() {
                    m.insert((w, r), Term::var(rf_var(r, w)));
                }
            }
            BaseRelation::Co => {
                for (a, b) in g.co_candidates() {
                    let t = self.co_term(a, b);
                    if t != Term::BoolLit(false) {
                        m.insert((a, b), t);
                    }
                }
            }
            BaseRelation::Fr => {
                for r in g.reads() {
                    let var = g.events()[r].var();
                    for w2 in g.writes_to(var) {
                        let via: Vec<Term> = g
                            .writes_to(var)
                            .filter(|&w1| w1 != w2)
                            .map(|w1| Term::and(vec![Term::var(rf_var(r, w1)), self.co_term(w1, w2)]))
                            .collect();
                        let t = Term::or(via);
                        if t != Term::BoolLit(false) {
                            m.insert((r, w2), t);
                        }
                    }
                }
            }
            BaseRelation::Loc | BaseRelation::Int | BaseRelation::Ext | BaseRelation::Id => {
                for a in 0..n {
                    for b in 0..n {
                        let hit = match rel {
                            BaseRelation::Loc => g.same_var(a, b),
                            BaseRelation::Int => g.same_thread(a, b),
                            BaseRelation::Ext => !g.same_thread(a, b),
                            _ => a == b,
                        };
                        if hit {
                            m.insert((a, b), Term::BoolLit(true));
                        }
                    }
                }
            }
        }
        m
    }

    fn in_set(&self, node: usize, set: EventSet) -> bool {
        let Some(e) = self.graph.event(node) else {
            return false;
        };
        match set {
            EventSet::Reads => e.is_read(),
            EventSet::Writes => e.is_write(),
            EventSet::Memory => true,
            EventSet::InitWrites => e.is_init(),
        }
    }

    fn identity(&self, set: EventSet) -> Matrix {
        (0..self.event_count())
            .filter(|&a| self.in_set(a, set))
            .map(|a| ((a, a), Term::BoolLit(true)))
            .collect()
    }

    fn relation(&mut self, expr: &RelExpr) -> Result<Matrix, McmError> {
        Ok(match expr {
            RelExpr::Base(b) => self.base(*b),
            RelExpr::Identity(set) => self.identity(*set),
            RelExpr::Product(lhs, rhs) => {
                let n = self.event_count();
                let mut m = Matrix::new();
                for a in (0..n).filter(|&a| self.in_set(a, *lhs)) {
                    for b in (0..n).filter(|&b| self.in_set(b, *rhs)) {
                        m.insert((a, b), Term::BoolLit(true));
                    }
                }
                m
            }
            RelExpr::Union(a, b) => {
                let (a, b) = (self.relation(a)?, self.relation(b)?);
                union(a, b)
            }
            RelExpr::Inter(a, b) => {
                let (a, b) = (self.relation(a)?, self.relation(b)?);
                inter(&a, &b)
            }
            RelExpr::Diff(a, b) => {
                let (a, b) = (self.relation(a)?, self.relation(b)?);
                diff(a, &b)
            }
            RelExpr::Seq(a, b) => {
                let (a, b) = (self.relation(a)?, self.relation(b)?);
                seq(&a, &b)
            }
            RelExpr::Inverse(a) => self
                .relation(a)?
                .into_iter()
                .map(|((x, y), t)| ((y, x), t))
                .collect(),
            RelExpr::Plus(a) => {
                let m = self.relation(a)?;
                self.closure(m)
            }
            RelExpr::Star(a) => {
                let m = self.relation(a)?;
                let plus = self.closure(m);
                union(plus, self.identity(EventSet::Memory))
            }
            RelExpr::Optional(a) => union(self.relation(a)?, self.identity(EventSet::Memory)),
            RelExpr::Named(name) => self.named(name)?,
        })
    }

    fn named(&mut self, name: &str) -> Result<Matrix, McmError> {
        if let Some(m) = self.named.get(name) {
            return Ok(m.clone());
        }
        let Some(def) = self.mcm.relation(name) else {
            return Err(McmError::UnknownRelation {
                name: name.to_string(),
                referenced_from: self.mcm.name().to_string(),
            });
        };
        let m = self.relation(def)?;
        let m = self.materialise(m);
        self.named.insert(name.to_string(), m.clone());
        Ok(m)
    }

    /// Transitive closure by iterated squaring: after `k` rounds the matrix
    /// covers paths of length up to `2^k`.
    fn closure(&mut self, m: Matrix) -> Matrix {
        let n = self.event_count();
        let mut current = self.materialise(m);
        let mut reach = 1usize;
        while reach < n {
            let squared = seq(&current, &current);
            current = self.materialise(union(current, squared));
            reach = reach.saturating_mul(2);
        }
        current
    }

    fn encode_axiom(&mut self, kind: AxiomKind, rel: &RelExpr, name: &str) -> Result<(), McmError> {
        self.script.comment(format!("axiom {name}"));
        let m = self.relation(rel)?;
        let forbidden: Vec<Term> = match kind {
            AxiomKind::Acyclic => {
                let plus = self.closure(m);
                diagonal(plus)
            }
            AxiomKind::Irreflexive => diagonal(m),
            AxiomKind::Empty => m.into_values().collect(),
        };
        for t in forbidden {
            self.script.assert(Term::not(t));
        }
        Ok(())
    }

    // ===== Outcome =====

    fn encode_outcome(&mut self, outcome: &Outcome) {
        if outcome.is_empty() {
            return;
        }
        self.script.comment(format!("outcome {outcome}"));
        for atom in outcome.atoms() {
            let t = match atom {
                OutcomeAtom::Register {
                    process,
                    register,
                    value,
                } => match self.graph.register_term(*process, register) {
                    Some(term) => Term::eq(term, Term::int(*value)),
                    None => Term::BoolLit(false),
                },
                OutcomeAtom::Memory { var, value } => {
                    let writes: Vec<usize> = self.graph.writes_to(var).collect();
                    Term::or(
                        writes
                            .iter()
                            .map(|&w| {
                                let mut last: Vec<Term> = writes
                                    .iter()
                                    .filter(|&&b| b != w)
                                    .map(|&b| Term::not(self.co_term(w, b)))
                                    .collect();
                                last.push(Term::eq(
                                    self.graph.events()[w].value_term(),
                                    Term::int(*value),
                                ));
                                Term::and(last)
                            })
                            .collect(),
                    )
                }
            };
            self.script.assert(t);
        }
    }
}

fn diagonal(m: Matrix) -> Vec<Term> {
    m.into_iter()
        .filter(|((a, b), _)| a == b)
        .map(|(_, t)| t)
        .collect()
}

fn union(mut a: Matrix, b: Matrix) -> Matrix {
    for (k, t) in b {
        let merged = match a.remove(&k) {
            Some(old) => Term::or(vec![old, t]),
            None => t,
        };
        a.insert(k, merged);
    }
    a
}

fn inter(a: &Matrix, b: &Matrix) -> Matrix {
    a.iter()
        .filter_map(|(k, ta)| {
            let t = Term::and(vec![ta.clone(), b.get(k)?.clone()]);
            (t != Term::BoolLit(false)).then_some((*k, t))
        })
        .collect()
}

fn diff(a: Matrix, b: &Matrix) -> Matrix {
    a.into_iter()
        .filter_map(|(k, ta)| {
            let t = match b.get(&k) {
                Some(tb) => Term::and(vec![ta, Term::not(tb.clone())]),
                None => ta,
            };
            (t != Term::BoolLit(false)).then_some((k, t))
        })
        .collect()
}

fn seq(a: &Matrix, b: &Matrix) -> Matrix {
    let mut rows: BTreeMap<usize, Vec<(usize, &Term)>> = BTreeMap::new();
    for ((x, y), t) in b {
        rows.entry(*x).or_default().push((*y, t));
    }
    let mut paths: BTreeMap<(usize, usize), Vec<Term>> = BTreeMap::new();
    for ((x, y), ta) in a {
        for (z, tb) in rows.get(y).into_iter().flatten() {
            paths
                .entry((*x, *z))
                .or_default()
                .push(Term::and(vec![ta.clone(), (*tb).clone()]));
        }
    }
    paths
        .into_iter()
        .filter_map(|(k, ts)| {
            let t = Term::or(ts);
            (t != Term::BoolLit(false)).then_some((k, t))
        })
        .collect()
}

// ===== Value domains =====

/// Recognise `(= x v)` or a disjunction of such atoms over one constant.
fn finite_domain(term: &Term) -> Option<(String, BTreeSet<i128>)> {
    fn atom(t: &Term) -> Option<(&str, i128)> {
        match t {
            Term::Eq(a, b) => match (a.as_ref(), b.as_ref()) {
                (Term::Const(x), Term::IntLit(v)) | (Term::IntLit(v), Term::Const(x)) => {
                    Some((x.as_str(), *v))
                }
                _ => None,
            },
            _ => None,
        }
    }
    let parts = match term {
        Term::Or(parts) => parts.as_slice(),
        other => std::slice::from_ref(other),
    };
    let mut name = None;
    let mut values = BTreeSet::new();
    for p in parts {
        let (x, v) = atom(p)?;
        if name.is_some_and(|n| n != x) {
            return None;
        }
        name = Some(x);
        values.insert(v);
    }
    name.map(|n| (n.to_string(), values))
}

/// Finite sets of values each read can observe, computed as a fixpoint over
/// the written values. `None` when the fixpoint does not converge within
/// the bounds or a written value cannot be evaluated.
fn value_domains(graph: &EventGraph) -> Option<BTreeMap<String, BTreeSet<i128>>> {
    let mut symbols: BTreeMap<String, BTreeSet<i128>> =
        graph.constraints().iter().filter_map(finite_domain).collect();
    let mut vars: BTreeMap<&str, BTreeSet<i128>> = BTreeMap::new();

    for _ in 0..MAX_DOMAIN_ROUNDS {
        for r in graph.reads() {
            let e = &graph.events()[r];
            if let Some(symbol) = e.value_symbol() {
                symbols.insert(symbol, vars.get(e.var()).cloned().unwrap_or_default());
            }
        }
        let mut changed = false;
        for w in graph.writes() {
            let e = &graph.events()[w];
            let values = possible_values(&e.value_term(), &symbols)?;
            let domain = vars.entry(e.var()).or_default();
            let before = domain.len();
            domain.extend(values);
            if domain.len() > MAX_DOMAIN_SIZE {
                return None;
            }
            changed |= domain.len() != before;
        }
        if !changed {
            return Some(symbols);
        }
    }
    None
}

fn possible_values(term: &Term, symbols: &BTreeMap<String, BTreeSet<i128>>) -> Option<BTreeSet<i128>> {
    let mut names = BTreeSet::new();
    term.collect_consts(&mut names);
    let names: Vec<String> = names.into_iter().collect();
    let mut domains: Vec<Vec<i128>> = Vec::with_capacity(names.len());
    let mut combinations = 1usize;
    for name in &names {
        let domain = symbols.get(name)?;
        if domain.is_empty() {
            return Some(BTreeSet::new());
        }
        combinations = combinations.checked_mul(domain.len())?;
        if combinations > MAX_COMBINATIONS {
            return None;
        }
        domains.push(domain.iter().copied().collect());
    }

    let mut out = BTreeSet::new();
    let mut choice = vec![0usize; names.len()];
    loop {
        let env = |name: &str| {
            let i = names.iter().position(|n| n == name)?;
            Some(Value::Int(domains[i][choice[i]]))
        };
        if let Some(v) = eval_term(term, &env).and_then(Value::as_int) {
            out.insert(v);
        }
        let mut k = 0;
        loop {
            if k == choice.len() {
                return Some(out);
            }
            choice[k] += 1;
            if choice[k] < domains[k].len() {
                break;
            }
            choice[k] = 0;
            k += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composition, ExplorationContext};
    use crate::models;
    use crate::process::{Label, Precision, ProcessAutomaton};
    use crate::scheduler::Action;
    use mcm_solver::backend::SolverBackend;
    use mcm_solver::builtin::BuiltinSolver;
    use mcm_solver::result::SolverResult;
    use std::sync::Arc;

    fn run_to_end(automata: Vec<ProcessAutomaton>) -> EventGraph {
        let comp = Composition::new(automata.into_iter().map(Arc::new).collect(), &[]);
        let ctx = ExplorationContext::new();
        let prec = Precision::new();
        let mut state = comp.init(&prec, &ctx);
        for p in 0..comp.processes().len() {
            while !state.terminated.contains(&p) {
                let edge = comp.processes()[p]
                    .enabled_actions(&state.locals[p])
                    .next()
                    .unwrap();
                state = comp
                    .trans(&state, &Action { process: p, edge }, &prec, &ctx)
                    .remove(0);
            }
        }
        EventGraph::from_state(&state, comp.processes())
    }

    fn store(var: &str, v: i128) -> Label {
        Label::Store(var.into(), Term::int(v))
    }

    fn load(reg: &str, var: &str) -> Label {
        Label::Load(reg.into(), var.into())
    }

    fn store_buffering() -> EventGraph {
        run_to_end(vec![
            ProcessAutomaton::straight_line("P0", vec![store("x", 1), load("r0", "y")]),
            ProcessAutomaton::straight_line("P1", vec![store("y", 1), load("r0", "x")]),
        ])
    }

    fn solve(graph: &EventGraph, mcm: &Mcm, outcome: &Outcome) -> SolverResult {
        let script = encode_query(graph, mcm, outcome).unwrap();
        BuiltinSolver::new().check_sat(&script).unwrap()
    }

    #[test]
    fn sb_weak_outcome_depends_on_model() {
        let g = store_buffering();
        let weak = Outcome::any().with_register(0, "r0", 0).with_register(1, "r0", 0);
        assert!(solve(&g, &models::sc(), &weak).is_unsat());
        assert!(solve(&g, &models::tso(), &weak).is_sat());
        assert!(solve(&g, &models::sc(), &Outcome::any()).is_sat());
    }

    #[test]
    fn rf_and_co_choices_are_declared() {
        let g = store_buffering();
        let script = encode_query(&g, &models::sc(), &Outcome::any()).unwrap();
        let declared: Vec<String> = script.declared_consts().map(|(n, _)| n.to_string()).collect();
        assert!(declared.contains(&"rv_t0_1".to_string()));
        assert!(declared.iter().any(|n| n.starts_with("rf_")));
        assert!(script.to_string().contains("rf functional"));
    }

    #[test]
    fn empty_axiom_forbids_every_edge() {
        let g = store_buffering();
        let no_rf = Mcm::new("no-rf").with_axiom(crate::mcm::Axiom::empty(
            "no-rf",
            RelExpr::base(BaseRelation::Rf),
        ));
        assert!(solve(&g, &no_rf, &Outcome::any()).is_unsat());
    }

    #[test]
    fn memory_outcome_uses_last_write() {
        let g = run_to_end(vec![
            ProcessAutomaton::straight_line("P0", vec![store("x", 1)]),
            ProcessAutomaton::straight_line("P1", vec![store("x", 2)]),
        ]);
        let sc = models::sc();
        assert!(solve(&g, &sc, &Outcome::any().with_memory("x", 1)).is_sat());
        assert!(solve(&g, &sc, &Outcome::any().with_memory("x", 2)).is_sat());
        assert!(solve(&g, &sc, &Outcome::any().with_memory("x", 0)).is_unsat());
    }

    #[test]
    fn domains_follow_data_flow() {
        let g = run_to_end(vec![ProcessAutomaton::straight_line(
            "P0",
            vec![
                load("r0", "x"),
                Label::Store(
                    "y".into(),
                    Term::IntAdd(Box::new(Term::var("r0")), Box::new(Term::int(1))),
                ),
                load("r1", "y"),
            ],
        )]);
        let domains = value_domains(&g).unwrap();
        assert_eq!(domains["rv_t0_0"], BTreeSet::from([0]));
        assert_eq!(domains["rv_t0_2"], BTreeSet::from([0, 1]));
    }

    #[test]
    fn self_feeding_increment_has_no_domain() {
        let g = run_to_end(vec![ProcessAutomaton::straight_line(
            "P0",
            vec![
                load("r0", "x"),
                Label::Store(
                    "x".into(),
                    Term::IntAdd(Box::new(Term::var("r0")), Box::new(Term::int(1))),
                ),
            ],
        )]);
        assert!(value_domains(&g).is_none());
        let script = encode_query(&g, &models::sc(), &Outcome::any()).unwrap();
        assert!(BuiltinSolver::new().check_sat(&script).unwrap().is_unknown());
    }

    #[test]
    fn finite_domain_shapes() {
        let x = || Term::var("nd_t0_0");
        assert_eq!(
            finite_domain(&Term::eq(x(), Term::int(3))),
            Some(("nd_t0_0".to_string(), BTreeSet::from([3])))
        );
        assert_eq!(
            finite_domain(&Term::or(vec![
                Term::eq(x(), Term::int(1)),
                Term::eq(Term::int(2), x()),
            ])),
            Some(("nd_t0_0".to_string(), BTreeSet::from([1, 2])))
        );
        assert_eq!(
            finite_domain(&Term::or(vec![
                Term::eq(x(), Term::int(1)),
                Term::eq(Term::var("other"), Term::int(2)),
            ])),
            None
        );
    }

    #[test]
    fn closure_of_chain_reaches_end() {
        let g = store_buffering();
        let mcm = models::sc();
        let mut enc = AxiomEncoder::new(&g, &mcm);
        let po = enc.base(BaseRelation::Po);
        let plus = enc.closure(po.clone());
        assert_eq!(plus.keys().collect::<Vec<_>>(), po.keys().collect::<Vec<_>>());
        assert!(plus.values().all(|t| *t == Term::BoolLit(true)));
    }
}
