//! JSON litmus tests.
//!
//! ```json
//! {
//!   "name": "SB",
//!   "init": { "x": 0, "y": 0 },
//!   "threads": [
//!     { "code": [ { "store": { "var": "x", "value": 1 } },
//!                 { "load":  { "reg": "r0", "var": "y" } } ] },
//!     { "code": [ { "store": { "var": "y", "value": 1 } },
//!                 { "load":  { "reg": "r0", "var": "x" } } ] }
//!   ],
//!   "exists": "0:r0=0 /\\ 1:r0=0"
//! }
//! ```
//!
//! Expressions are integers, booleans, register names, or
//! `{ "op": "+", "args": [...] }` applications. Structured instructions
//! (`if`, `while`) are lowered to guarded edges of the thread's automaton.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use mcm_checker::process::LocationId;
use mcm_checker::{Label, Outcome, Precision, ProcessAutomaton};
use mcm_smtlib::Term;

use crate::error::DriverError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LitmusTest {
    pub name: String,
    /// Initial values of shared variables; unlisted ones start at 0.
    #[serde(default)]
    pub init: BTreeMap<String, i64>,
    pub threads: Vec<ThreadSpec>,
    /// Queried outcome, e.g. `0:r0=0 /\ x=1`. Absent means any execution.
    #[serde(default)]
    pub exists: Option<String>,
    /// Registers whose nondeterministic choices are enumerated explicitly.
    #[serde(default)]
    pub tracked: Vec<String>,
    /// Per-thread step bound for tests with loops.
    #[serde(default)]
    pub step_bound: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub code: Vec<Instr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instr {
    Skip,
    Store {
        var: String,
        value: Expr,
    },
    Load {
        reg: String,
        var: String,
    },
    Assign {
        reg: String,
        value: Expr,
    },
    Nondet {
        reg: String,
        values: Vec<i64>,
    },
    Assume {
        cond: Expr,
    },
    If {
        cond: Expr,
        then: Vec<Instr>,
        #[serde(default, rename = "else")]
        otherwise: Vec<Instr>,
    },
    While {
        cond: Expr,
        body: Vec<Instr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Reg(String),
    Op { op: String, args: Vec<Expr> },
}

impl Expr {
    pub fn to_term(&self) -> Result<Term, DriverError> {
        match self {
            Expr::Int(n) => Ok(Term::int(i128::from(*n))),
            Expr::Bool(b) => Ok(Term::BoolLit(*b)),
            Expr::Reg(name) => Ok(Term::var(name.clone())),
            Expr::Op { op, args } => {
                let args = args.iter().map(Expr::to_term).collect::<Result<Vec<_>, _>>()?;
                apply(op, args)
            }
        }
    }
}

fn apply(op: &str, mut args: Vec<Term>) -> Result<Term, DriverError> {
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(DriverError::Litmus(format!(
                "operator '{op}' takes {n} argument(s), got {}",
                args.len()
            )))
        }
    };
    match op {
        "and" | "&&" => return Ok(Term::and(args)),
        "or" | "||" => return Ok(Term::or(args)),
        "not" | "!" => {
            arity(1)?;
            return Ok(Term::not(args.remove(0)));
        }
        "neg" => {
            arity(1)?;
            return Ok(Term::IntNeg(Box::new(args.remove(0))));
        }
        _ => arity(2)?,
    }
    let rhs = Box::new(args.remove(1));
    let lhs = Box::new(args.remove(0));
    match op {
        "+" => Ok(Term::IntAdd(lhs, rhs)),
        "-" => Ok(Term::IntSub(lhs, rhs)),
        "*" => Ok(Term::IntMul(lhs, rhs)),
        "/" => Ok(Term::IntDiv(lhs, rhs)),
        "%" => Ok(Term::IntMod(lhs, rhs)),
        "==" => Ok(Term::eq(*lhs, *rhs)),
        "!=" => Ok(Term::not(Term::eq(*lhs, *rhs))),
        "<" => Ok(Term::IntLt(lhs, rhs)),
        "<=" => Ok(Term::IntLe(lhs, rhs)),
        ">" => Ok(Term::IntGt(lhs, rhs)),
        ">=" => Ok(Term::IntGe(lhs, rhs)),
        other => Err(DriverError::Litmus(format!("unknown operator '{other}'"))),
    }
}

impl LitmusTest {
    pub fn from_file(path: &Path) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DriverError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// One automaton per thread. Threads without a name are called `P<i>`.
    pub fn automata(&self) -> Result<Vec<ProcessAutomaton>, DriverError> {
        if self.threads.is_empty() {
            return Err(DriverError::Litmus(format!("'{}' has no threads", self.name)));
        }
        self.threads
            .iter()
            .enumerate()
            .map(|(i, thread)| {
                let name = thread.name.clone().unwrap_or_else(|| format!("P{i}"));
                compile(name, &thread.code)
            })
            .collect()
    }

    pub fn initial_writes(&self) -> Vec<(String, i128)> {
        self.init
            .iter()
            .map(|(var, v)| (var.clone(), i128::from(*v)))
            .collect()
    }

    pub fn outcome(&self) -> Result<Outcome, DriverError> {
        match &self.exists {
            Some(text) => text.parse().map_err(DriverError::Check),
            None => Ok(Outcome::any()),
        }
    }

    /// Exploration precision; `step_bound` overrides the test's own bound.
    pub fn precision(&self, step_bound: Option<usize>) -> Precision {
        let mut precision = Precision::new();
        for reg in &self.tracked {
            precision = precision.with_tracked(reg.clone());
        }
        match step_bound.or(self.step_bound) {
            Some(bound) => precision.with_step_bound(bound),
            None => precision,
        }
    }
}

/// Lower structured code to an automaton whose single final location is
/// the end of the code.
fn compile(name: String, code: &[Instr]) -> Result<ProcessAutomaton, DriverError> {
    let mut automaton = ProcessAutomaton::new(name);
    let start = automaton.initial();
    let end = lower(&mut automaton, start, code)?;
    automaton.mark_final(end)?;
    tracing::debug!(
        process = automaton.name(),
        locations = automaton.location_count(),
        edges = automaton.edges().len(),
        "compiled thread"
    );
    Ok(automaton)
}

fn lower(
    automaton: &mut ProcessAutomaton,
    mut at: LocationId,
    code: &[Instr],
) -> Result<LocationId, DriverError> {
    for instr in code {
        at = match instr {
            Instr::Skip => edge(automaton, at, Label::Skip)?,
            Instr::Store { var, value } => {
                edge(automaton, at, Label::Store(var.clone(), value.to_term()?))?
            }
            Instr::Load { reg, var } => edge(automaton, at, Label::Load(reg.clone(), var.clone()))?,
            Instr::Assign { reg, value } => {
                edge(automaton, at, Label::Assign(reg.clone(), value.to_term()?))?
            }
            Instr::Nondet { reg, values } => {
                if values.is_empty() {
                    return Err(DriverError::Litmus(format!("nondet '{reg}' has no values")));
                }
                let values = values.iter().map(|v| i128::from(*v)).collect();
                edge(automaton, at, Label::Nondet(reg.clone(), values))?
            }
            Instr::Assume { cond } => edge(automaton, at, Label::Assume(cond.to_term()?))?,
            Instr::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = cond.to_term()?;
                let then_start = edge(automaton, at, Label::Assume(cond.clone()))?;
                let then_end = lower(automaton, then_start, then)?;
                let else_start = edge(automaton, at, Label::Assume(Term::not(cond)))?;
                let else_end = lower(automaton, else_start, otherwise)?;
                let join = automaton.add_location();
                automaton.add_edge(then_end, join, Label::Skip)?;
                automaton.add_edge(else_end, join, Label::Skip)?;
                join
            }
            Instr::While { cond, body } => {
                let cond = cond.to_term()?;
                let body_start = edge(automaton, at, Label::Assume(cond.clone()))?;
                let body_end = lower(automaton, body_start, body)?;
                automaton.add_edge(body_end, at, Label::Skip)?;
                edge(automaton, at, Label::Assume(Term::not(cond)))?
            }
        };
    }
    Ok(at)
}

/// Add a fresh location reached from `from` through `label`.
fn edge(
    automaton: &mut ProcessAutomaton,
    from: LocationId,
    label: Label,
) -> Result<LocationId, DriverError> {
    let to = automaton.add_location();
    automaton.add_edge(from, to, label)?;
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SB: &str = r#"{
        "name": "SB",
        "threads": [
            { "code": [ { "store": { "var": "x", "value": 1 } },
                        { "load": { "reg": "r0", "var": "y" } } ] },
            { "name": "writer", "code": [ { "store": { "var": "y", "value": 1 } },
                        { "load": { "reg": "r0", "var": "x" } } ] }
        ],
        "exists": "0:r0=0 /\\ 1:r0=0"
    }"#;

    #[test]
    fn parses_store_buffering() {
        let test: LitmusTest = serde_json::from_str(SB).unwrap();
        let automata = test.automata().unwrap();
        assert_eq!(automata.len(), 2);
        assert_eq!(automata[0].name(), "P0");
        assert_eq!(automata[1].name(), "writer");
        assert_eq!(automata[0].edges().len(), 2);
        assert_eq!(test.outcome().unwrap().atoms().len(), 2);
        assert!(test.initial_writes().is_empty());
    }

    #[test]
    fn expressions_lower_to_terms() {
        let e: Expr = serde_json::from_str(r#"{ "op": "+", "args": ["r0", 1] }"#).unwrap();
        assert_eq!(
            e.to_term().unwrap(),
            Term::IntAdd(Box::new(Term::var("r0")), Box::new(Term::int(1)))
        );
        let c: Expr = serde_json::from_str(r#"{ "op": "!=", "args": ["r0", 0] }"#).unwrap();
        assert_eq!(
            c.to_term().unwrap(),
            Term::not(Term::eq(Term::var("r0"), Term::int(0)))
        );
    }

    #[test]
    fn bad_operator_arity_is_reported() {
        let e: Expr = serde_json::from_str(r#"{ "op": "<", "args": [1] }"#).unwrap();
        let err = e.to_term().unwrap_err();
        assert!(err.to_string().contains("takes 2"));
        let e: Expr = serde_json::from_str(r#"{ "op": "**", "args": [1, 2] }"#).unwrap();
        assert!(e.to_term().unwrap_err().to_string().contains("unknown operator"));
    }

    #[test]
    fn if_lowers_to_two_guarded_branches() {
        let code: Vec<Instr> = serde_json::from_str(
            r#"[ { "load": { "reg": "r0", "var": "x" } },
                 { "if": { "cond": { "op": "==", "args": ["r0", 1] },
                           "then": [ { "store": { "var": "y", "value": 1 } } ] } } ]"#,
        )
        .unwrap();
        let automaton = compile("P0".into(), &code).unwrap();
        // load, two guards, the store, two joins
        assert_eq!(automaton.edges().len(), 6);
        let guards = automaton
            .edges()
            .iter()
            .filter(|e| matches!(e.label, Label::Assume(_)))
            .count();
        assert_eq!(guards, 2);
    }

    #[test]
    fn while_loops_back_to_its_head() {
        let code: Vec<Instr> = serde_json::from_str(
            r#"[ { "while": { "cond": { "op": "<", "args": ["i", 2] },
                              "body": [ { "assign": { "reg": "i", "value": { "op": "+", "args": ["i", 1] } } } ] } } ]"#,
        )
        .unwrap();
        let automaton = compile("P0".into(), &code).unwrap();
        let head = automaton.initial();
        assert!(automaton.edges().iter().any(|e| e.target == head));
        assert_eq!(automaton.outgoing(head).len(), 2);
    }

    #[test]
    fn empty_program_is_rejected() {
        let test: LitmusTest = serde_json::from_str(r#"{ "name": "none", "threads": [] }"#).unwrap();
        assert!(matches!(test.automata(), Err(DriverError::Litmus(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<LitmusTest>(r#"{ "name": "t", "threads": [], "bogus": 1 }"#);
        assert!(err.is_err());
    }

    #[test]
    fn precision_from_test() {
        let mut test: LitmusTest = serde_json::from_str(SB).unwrap();
        test.tracked = vec!["r1".into()];
        test.step_bound = Some(5);
        let p = test.precision(None);
        assert!(p.tracks("r1"));
        assert_eq!(p.step_bound, Some(5));
        assert_eq!(test.precision(Some(9)).step_bound, Some(9));
    }
}
