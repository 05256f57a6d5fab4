//! In-process solver for the finite-domain Bool/Int fragment.
//!
//! Every integer constant referenced by an assertion must be pinned to a
//! finite set of literals by a top-level assertion of the shape
//! `(or (= x v1) (= x v2) ...)` (or a single `(= x v)`). Integers are
//! one-hot encoded, integer terms are expanded into guarded value cases,
//! Boolean structure is Tseitin-encoded, and the resulting CNF is handed to
//! `varisat`. Scripts outside this fragment answer `Unknown` instead of
//! failing.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use mcm_smtlib::command::Command;
use mcm_smtlib::eval::{Value, eval_term};
use mcm_smtlib::script::Script;
use mcm_smtlib::sort::Sort;
use mcm_smtlib::term::Term;
use varisat::ExtendFormula;

use crate::backend::SolverBackend;
use crate::error::SolverError;
use crate::model::Model;
use crate::result::SolverResult;

/// Upper bound on the number of value cases of one integer subterm.
const MAX_CASES: usize = 1 << 12;

/// The built-in finite-domain backend.
#[derive(Debug, Clone, Default)]
pub struct BuiltinSolver {
    timeout_ms: u64,
}

impl BuiltinSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up with `Unknown("timeout")` once `timeout_ms` (0 = never) has
    /// passed while encoding. The SAT search itself is not interrupted.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn solve(&self, script: &Script) -> Result<SolverResult, SolverError> {
        let start = Instant::now();
        let deadline =
            (self.timeout_ms > 0).then(|| start + Duration::from_millis(self.timeout_ms));

        let mut encoder = Encoder::new();
        for cmd in script.commands() {
            match cmd {
                Command::DeclareConst(name, sort) => encoder.declare(name, sort)?,
                Command::DeclareFun(name, params, sort) if params.is_empty() => {
                    encoder.declare(name, sort)?
                }
                Command::DeclareFun(name, _, _) | Command::DefineFun(name, _, _, _) => {
                    return Ok(SolverResult::Unknown(format!(
                        "function symbol {name} is outside the finite-domain fragment"
                    )));
                }
                Command::Push(_) | Command::Pop(_) => {
                    return Err(SolverError::Unsupported(
                        "incremental scripts (push/pop)".to_string(),
                    ));
                }
                _ => {}
            }
        }

        let assertions: Vec<&Term> = script.assertions().collect();
        if let Err(reason) = encoder.bind_domains(&assertions) {
            return reason.into_result();
        }
        for term in &assertions {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(SolverResult::Unknown("timeout".to_string()));
            }
            if let Err(reason) = encoder.assert_top(term) {
                return reason.into_result();
            }
        }

        let outcome = decide(encoder.num_vars, &encoder.clauses)?;
        tracing::debug!(
            vars = encoder.num_vars,
            clauses = encoder.clauses.len(),
            elapsed = ?start.elapsed(),
            "built-in solver finished"
        );
        match outcome {
            None => Ok(SolverResult::Unsat),
            Some(assignment) => {
                let model = encoder.model(&assignment);
                if let Some(bad) = first_violated(&assertions, &model) {
                    tracing::warn!(assertion = %bad, "built-in model failed re-evaluation");
                    return Ok(SolverResult::Unknown(
                        "model failed re-evaluation".to_string(),
                    ));
                }
                Ok(SolverResult::Sat(Some(model)))
            }
        }
    }
}

impl SolverBackend for BuiltinSolver {
    fn check_sat(&self, script: &Script) -> Result<SolverResult, SolverError> {
        self.solve(script)
    }
}

fn first_violated<'a>(assertions: &[&'a Term], model: &Model) -> Option<&'a Term> {
    let env = |name: &str| {
        model
            .get_bool(name)
            .map(Value::Bool)
            .or_else(|| model.get_int(name).map(Value::Int))
    };
    assertions
        .iter()
        .find(|t| eval_term(t, &env) != Some(Value::Bool(true)))
        .copied()
}

// ---------------------------------------------------------------------------
// Encoding to CNF
// ---------------------------------------------------------------------------

/// DIMACS-style literal: `v` or `-v` for variable `v >= 1`.
type Lit = i32;

const TRUE: Lit = 1;
const FALSE: Lit = -1;

enum EncodeFailure {
    /// The script itself is broken (undeclared symbol, ill-sorted term).
    Malformed(String),
    /// The script is fine but the built-in backend can't decide it.
    OutOfFragment(String),
}

impl EncodeFailure {
    fn into_result(self) -> Result<SolverResult, SolverError> {
        match self {
            EncodeFailure::Malformed(msg) => Err(SolverError::ParseError(msg)),
            EncodeFailure::OutOfFragment(msg) => Ok(SolverResult::Unknown(msg)),
        }
    }
}

type Encoded<T> = Result<T, EncodeFailure>;

#[derive(Debug, Clone)]
enum Symbol {
    Bool(Lit),
    /// One-hot encoding: `(indicator, value)` pairs.
    Int(Vec<(Lit, i128)>),
    /// Declared integer without a domain yet.
    UnboundInt,
}

struct Encoder {
    num_vars: u32,
    clauses: Vec<Vec<Lit>>,
    symbols: BTreeMap<String, Symbol>,
    declared: Vec<String>,
    bool_cache: HashMap<Term, Lit>,
}

impl Encoder {
    fn new() -> Self {
        let mut enc = Self {
            num_vars: 0,
            clauses: Vec::new(),
            symbols: BTreeMap::new(),
            declared: Vec::new(),
            bool_cache: HashMap::new(),
        };
        let t = enc.fresh();
        debug_assert_eq!(t, TRUE);
        enc.clauses.push(vec![TRUE]);
        enc
    }

    fn fresh(&mut self) -> Lit {
        self.num_vars += 1;
        self.num_vars as Lit
    }

    fn declare(&mut self, name: &str, sort: &Sort) -> Result<(), SolverError> {
        let symbol = match sort {
            Sort::Bool => Symbol::Bool(self.fresh()),
            Sort::Int => Symbol::UnboundInt,
            Sort::Uninterpreted(s) => {
                return Err(SolverError::Unsupported(format!("uninterpreted sort {s}")));
            }
        };
        if self.symbols.insert(name.to_string(), symbol).is_none() {
            self.declared.push(name.to_string());
        }
        Ok(())
    }

    /// Find domain assertions for every integer constant and one-hot encode
    /// them.
    fn bind_domains(&mut self, assertions: &[&Term]) -> Encoded<()> {
        let mut domains: BTreeMap<String, Vec<i128>> = BTreeMap::new();
        for term in assertions {
            if let Some((name, mut values)) = domain_of(term)
                && matches!(self.symbols.get(&name), Some(Symbol::UnboundInt))
                && !domains.contains_key(&name)
            {
                values.sort_unstable();
                values.dedup();
                domains.insert(name, values);
            }
        }

        let mut referenced = std::collections::BTreeSet::new();
        for term in assertions {
            term.collect_consts(&mut referenced);
        }
        for name in &referenced {
            match self.symbols.get(name) {
                None => {
                    return Err(EncodeFailure::Malformed(format!("Undefined symbol: {name}")));
                }
                Some(Symbol::UnboundInt) if !domains.contains_key(name) => {
                    return Err(EncodeFailure::OutOfFragment(format!(
                        "unbounded integer domain for {name}"
                    )));
                }
                _ => {}
            }
        }

        for (name, values) in domains {
            let indicators: Vec<(Lit, i128)> = values.iter().map(|v| (self.fresh(), *v)).collect();
            let lits: Vec<Lit> = indicators.iter().map(|(l, _)| *l).collect();
            self.clauses.push(lits.clone());
            for (i, a) in lits.iter().enumerate() {
                for b in &lits[i + 1..] {
                    self.clauses.push(vec![-a, -b]);
                }
            }
            self.symbols.insert(name, Symbol::Int(indicators));
        }
        Ok(())
    }

    fn assert_top(&mut self, term: &Term) -> Encoded<()> {
        match term {
            Term::And(parts) => {
                for p in parts {
                    self.assert_top(p)?;
                }
            }
            Term::Or(parts) => {
                let mut clause = Vec::with_capacity(parts.len());
                for p in parts {
                    clause.push(self.bool_lit(p)?);
                }
                self.add_clause(clause);
            }
            Term::Implies(a, b) => {
                let (a, b) = (self.bool_lit(a)?, self.bool_lit(b)?);
                self.add_clause(vec![-a, b]);
            }
            other => {
                let l = self.bool_lit(other)?;
                self.add_clause(vec![l]);
            }
        }
        Ok(())
    }

    fn add_clause(&mut self, mut clause: Vec<Lit>) {
        if clause.contains(&TRUE) {
            return;
        }
        clause.retain(|l| *l != FALSE);
        clause.sort_unstable();
        clause.dedup();
        if has_complementary(&clause) {
            return;
        }
        self.clauses.push(clause);
    }

    fn mk_and(&mut self, lits: Vec<Lit>) -> Lit {
        let mut kept: Vec<Lit> = Vec::with_capacity(lits.len());
        for l in lits {
            if l == FALSE {
                return FALSE;
            }
            if l != TRUE {
                kept.push(l);
            }
        }
        kept.sort_unstable();
        kept.dedup();
        if has_complementary(&kept) {
            return FALSE;
        }
        match kept.as_slice() {
            [] => TRUE,
            [single] => *single,
            _ => {
                let v = self.fresh();
                let mut back = vec![v];
                for l in &kept {
                    self.clauses.push(vec![-v, *l]);
                    back.push(-l);
                }
                self.clauses.push(back);
                v
            }
        }
    }

    fn mk_or(&mut self, lits: Vec<Lit>) -> Lit {
        -self.mk_and(lits.into_iter().map(|l| -l).collect())
    }

    fn mk_iff(&mut self, a: Lit, b: Lit) -> Lit {
        match (a, b) {
            _ if a == b => TRUE,
            _ if a == -b => FALSE,
            (TRUE, x) | (x, TRUE) => x,
            (FALSE, x) | (x, FALSE) => -x,
            _ => {
                let v = self.fresh();
                self.clauses.push(vec![-v, -a, b]);
                self.clauses.push(vec![-v, a, -b]);
                self.clauses.push(vec![v, a, b]);
                self.clauses.push(vec![v, -a, -b]);
                v
            }
        }
    }

    fn is_bool_term(&self, term: &Term) -> bool {
        match term {
            Term::BoolLit(_)
            | Term::Not(_)
            | Term::And(_)
            | Term::Or(_)
            | Term::Implies(_, _)
            | Term::Iff(_, _)
            | Term::Eq(_, _)
            | Term::Distinct(_)
            | Term::IntLt(_, _)
            | Term::IntLe(_, _)
            | Term::IntGt(_, _)
            | Term::IntGe(_, _) => true,
            Term::Const(name) => matches!(self.symbols.get(name), Some(Symbol::Bool(_))),
            Term::Ite(_, t, _) => self.is_bool_term(t),
            _ => false,
        }
    }

    fn bool_lit(&mut self, term: &Term) -> Encoded<Lit> {
        if let Some(l) = self.bool_cache.get(term) {
            return Ok(*l);
        }
        let lit = match term {
            Term::BoolLit(true) => TRUE,
            Term::BoolLit(false) => FALSE,
            Term::Const(name) => match self.symbols.get(name) {
                Some(Symbol::Bool(l)) => *l,
                Some(_) => {
                    return Err(EncodeFailure::Malformed(format!(
                        "{name} used as Bool but declared Int"
                    )));
                }
                None => return Err(EncodeFailure::Malformed(format!("Undefined symbol: {name}"))),
            },
            Term::Not(a) => -self.bool_lit(a)?,
            Term::And(parts) => {
                let lits = parts
                    .iter()
                    .map(|p| self.bool_lit(p))
                    .collect::<Encoded<Vec<_>>>()?;
                self.mk_and(lits)
            }
            Term::Or(parts) => {
                let lits = parts
                    .iter()
                    .map(|p| self.bool_lit(p))
                    .collect::<Encoded<Vec<_>>>()?;
                self.mk_or(lits)
            }
            Term::Implies(a, b) => {
                let (a, b) = (self.bool_lit(a)?, self.bool_lit(b)?);
                self.mk_or(vec![-a, b])
            }
            Term::Iff(a, b) => {
                let (a, b) = (self.bool_lit(a)?, self.bool_lit(b)?);
                self.mk_iff(a, b)
            }
            Term::Eq(a, b) if self.is_bool_term(a) || self.is_bool_term(b) => {
                let (a, b) = (self.bool_lit(a)?, self.bool_lit(b)?);
                self.mk_iff(a, b)
            }
            Term::Eq(a, b) => self.int_relation(a, b, |x, y| x == y)?,
            Term::Distinct(parts) => {
                let mut pairwise = Vec::new();
                for (i, a) in parts.iter().enumerate() {
                    for b in &parts[i + 1..] {
                        let eq = self.bool_lit(&Term::eq(a.clone(), b.clone()))?;
                        pairwise.push(-eq);
                    }
                }
                self.mk_and(pairwise)
            }
            Term::Ite(c, t, e) => {
                let c = self.bool_lit(c)?;
                let (t, e) = (self.bool_lit(t)?, self.bool_lit(e)?);
                let then_part = self.mk_and(vec![c, t]);
                let else_part = self.mk_and(vec![-c, e]);
                self.mk_or(vec![then_part, else_part])
            }
            Term::IntLt(a, b) => self.int_relation(a, b, |x, y| x < y)?,
            Term::IntLe(a, b) => self.int_relation(a, b, |x, y| x <= y)?,
            Term::IntGt(a, b) => self.int_relation(a, b, |x, y| x > y)?,
            Term::IntGe(a, b) => self.int_relation(a, b, |x, y| x >= y)?,
            Term::App(name, _) => {
                return Err(EncodeFailure::OutOfFragment(format!(
                    "uninterpreted function {name}"
                )));
            }
            Term::IntLit(_)
            | Term::IntAdd(_, _)
            | Term::IntSub(_, _)
            | Term::IntMul(_, _)
            | Term::IntDiv(_, _)
            | Term::IntMod(_, _)
            | Term::IntNeg(_) => {
                return Err(EncodeFailure::Malformed(format!(
                    "integer term {term} used as a formula"
                )));
            }
        };
        self.bool_cache.insert(term.clone(), lit);
        Ok(lit)
    }

    fn int_relation(&mut self, a: &Term, b: &Term, rel: fn(i128, i128) -> bool) -> Encoded<Lit> {
        let (ca, cb) = (self.int_cases(a)?, self.int_cases(b)?);
        let mut hits = Vec::new();
        for (ga, va) in &ca {
            for (gb, vb) in &cb {
                if rel(*va, *vb) {
                    hits.push(self.mk_and(vec![*ga, *gb]));
                }
            }
        }
        Ok(self.mk_or(hits))
    }

    /// Expand an integer term into mutually exclusive guarded values.
    fn int_cases(&mut self, term: &Term) -> Encoded<Vec<(Lit, i128)>> {
        match term {
            Term::IntLit(n) => Ok(vec![(TRUE, *n)]),
            Term::Const(name) => match self.symbols.get(name) {
                Some(Symbol::Int(cases)) => Ok(cases.clone()),
                Some(Symbol::UnboundInt) => Err(EncodeFailure::OutOfFragment(format!(
                    "unbounded integer domain for {name}"
                ))),
                Some(Symbol::Bool(_)) => Err(EncodeFailure::Malformed(format!(
                    "{name} used as Int but declared Bool"
                ))),
                None => Err(EncodeFailure::Malformed(format!("Undefined symbol: {name}"))),
            },
            Term::IntNeg(a) => {
                let cases = self.int_cases(a)?;
                cases
                    .into_iter()
                    .map(|(g, v)| {
                        v.checked_neg()
                            .map(|n| (g, n))
                            .ok_or_else(|| overflow(term))
                    })
                    .collect()
            }
            Term::IntAdd(a, b) => self.combine(term, a, b, i128::checked_add),
            Term::IntSub(a, b) => self.combine(term, a, b, i128::checked_sub),
            Term::IntMul(a, b) => self.combine(term, a, b, i128::checked_mul),
            Term::IntDiv(a, b) => self.combine(term, a, b, i128::checked_div_euclid),
            Term::IntMod(a, b) => self.combine(term, a, b, i128::checked_rem_euclid),
            Term::Ite(c, t, e) => {
                let c = self.bool_lit(c)?;
                let mut merged: BTreeMap<i128, Vec<Lit>> = BTreeMap::new();
                for (g, v) in self.int_cases(t)? {
                    let guard = self.mk_and(vec![c, g]);
                    merged.entry(v).or_default().push(guard);
                }
                for (g, v) in self.int_cases(e)? {
                    let guard = self.mk_and(vec![-c, g]);
                    merged.entry(v).or_default().push(guard);
                }
                Ok(self.merge(merged))
            }
            Term::App(name, _) => Err(EncodeFailure::OutOfFragment(format!(
                "uninterpreted function {name}"
            ))),
            _ => Err(EncodeFailure::Malformed(format!(
                "formula {term} used as an integer"
            ))),
        }
    }

    fn combine(
        &mut self,
        whole: &Term,
        a: &Term,
        b: &Term,
        op: fn(i128, i128) -> Option<i128>,
    ) -> Encoded<Vec<(Lit, i128)>> {
        let (ca, cb) = (self.int_cases(a)?, self.int_cases(b)?);
        if ca.len().saturating_mul(cb.len()) > MAX_CASES {
            return Err(EncodeFailure::OutOfFragment(format!(
                "too many value combinations in {whole}"
            )));
        }
        let mut merged: BTreeMap<i128, Vec<Lit>> = BTreeMap::new();
        for (ga, va) in &ca {
            for (gb, vb) in &cb {
                let value = op(*va, *vb).ok_or_else(|| overflow(whole))?;
                let guard = self.mk_and(vec![*ga, *gb]);
                merged.entry(value).or_default().push(guard);
            }
        }
        Ok(self.merge(merged))
    }

    fn merge(&mut self, merged: BTreeMap<i128, Vec<Lit>>) -> Vec<(Lit, i128)> {
        let mut cases = Vec::with_capacity(merged.len());
        for (value, guards) in merged {
            let g = self.mk_or(guards);
            if g != FALSE {
                cases.push((g, value));
            }
        }
        cases
    }

    fn model(&self, assignment: &[bool]) -> Model {
        let holds = |l: Lit| {
            let v = assignment[l.unsigned_abs() as usize];
            if l > 0 { v } else { !v }
        };
        let assignments = self
            .declared
            .iter()
            .filter_map(|name| {
                let value = match self.symbols.get(name)? {
                    Symbol::Bool(l) => holds(*l).to_string(),
                    Symbol::Int(cases) => {
                        let v = cases.iter().find(|(l, _)| holds(*l)).map_or(0, |(_, v)| *v);
                        Term::IntLit(v).to_string()
                    }
                    Symbol::UnboundInt => Term::IntLit(0).to_string(),
                };
                Some((name.clone(), value))
            })
            .collect();
        Model::with_assignments(assignments)
    }
}

fn overflow(term: &Term) -> EncodeFailure {
    EncodeFailure::OutOfFragment(format!("arithmetic overflow or division by zero in {term}"))
}

/// `lits` must be sorted and deduplicated.
fn has_complementary(lits: &[Lit]) -> bool {
    lits.iter().any(|l| *l < 0 && lits.binary_search(&-l).is_ok())
}

/// Recognise `(= x v)` or `(or (= x v1) (= x v2) ...)` over one constant.
fn domain_of(term: &Term) -> Option<(String, Vec<i128>)> {
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
    match term {
        Term::Or(parts) if !parts.is_empty() => {
            let mut name = None;
            let mut values = Vec::with_capacity(parts.len());
            for p in parts {
                let (x, v) = atom(p)?;
                match name {
                    None => name = Some(x),
                    Some(n) if n != x => return None,
                    Some(_) => {}
                }
                values.push(v);
            }
            name.map(|n| (n.to_string(), values))
        }
        other => atom(other).map(|(x, v)| (x.to_string(), vec![v])),
    }
}

/// Run the CNF through `varisat`. `Some(assignment)` is indexed by variable
/// (slot 0 unused); `None` means unsatisfiable.
fn decide(num_vars: u32, clauses: &[Vec<Lit>]) -> Result<Option<Vec<bool>>, SolverError> {
    if clauses.iter().any(Vec::is_empty) {
        return Ok(None);
    }
    let mut sat = varisat::Solver::new();
    let mut buf: Vec<varisat::Lit> = Vec::new();
    for clause in clauses {
        buf.clear();
        buf.extend(clause.iter().map(|l| varisat::Lit::from_dimacs(*l as isize)));
        sat.add_clause(&buf);
    }
    let satisfiable = sat
        .solve()
        .map_err(|err| SolverError::ProcessError(format!("varisat: {err:?}")))?;
    if !satisfiable {
        return Ok(None);
    }

    let mut assignment = vec![false; num_vars as usize + 1];
    for lit in sat.model().unwrap_or_default() {
        let dimacs = lit.to_dimacs();
        if let Some(slot) = assignment.get_mut(dimacs.unsigned_abs()) {
            *slot = dimacs > 0;
        }
    }
    Ok(Some(assignment))
}
