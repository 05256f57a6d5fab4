//! Native Z3 API backend using the z3 crate.
//!
//! Translates a [`Script`] into z3 AST calls instead of piping text into a
//! subprocess. Requires the system Z3 library (`libz3-dev`, `brew install z3`).

use std::collections::HashMap;

use mcm_smtlib::command::Command as SmtCmd;
use mcm_smtlib::script::Script;
use mcm_smtlib::sort::Sort;
use mcm_smtlib::term::Term;
use z3::ast::{Bool, Int};
use z3::{Params, SatResult, Solver};

use crate::backend::SolverBackend;
use crate::error::SolverError;
use crate::model::Model;
use crate::result::SolverResult;

/// Native Z3 solver backend.
///
/// z3 0.19 keeps a global context, so each query only needs a fresh `Solver`.
#[derive(Debug, Default)]
pub struct Z3NativeSolver {
    timeout_ms: u64,
}

impl Z3NativeSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn solve_script(&self, script: &Script) -> Result<SolverResult, SolverError> {
        let start = std::time::Instant::now();
        let solver = Solver::new();
        if self.timeout_ms > 0 {
            let mut params = Params::new();
            params.set_u32("timeout", u32::try_from(self.timeout_ms).unwrap_or(u32::MAX));
            solver.set_params(&params);
        }

        let mut symbols: HashMap<String, Z3Value> = HashMap::new();
        let mut declared: Vec<String> = Vec::new();

        for cmd in script.commands() {
            match cmd {
                SmtCmd::DeclareConst(name, sort) => {
                    symbols.insert(name.clone(), create_const(name, sort)?);
                    declared.push(name.clone());
                }
                SmtCmd::DeclareFun(name, params, sort) if params.is_empty() => {
                    symbols.insert(name.clone(), create_const(name, sort)?);
                    declared.push(name.clone());
                }
                SmtCmd::Assert(term) => match translate_term(&symbols, term)? {
                    Z3Value::Bool(b) => solver.assert(&b),
                    Z3Value::Int(_) => {
                        return Err(SolverError::ParseError(format!(
                            "Assert requires Bool term: {term}"
                        )));
                    }
                },
                SmtCmd::SetLogic(_)
                | SmtCmd::SetOption(_, _)
                | SmtCmd::CheckSat
                | SmtCmd::GetModel
                | SmtCmd::Comment(_)
                | SmtCmd::Exit => {}
                other => {
                    return Err(SolverError::Unsupported(format!(
                        "command {other} in native backend"
                    )));
                }
            }
        }

        let result = match solver.check() {
            SatResult::Sat => {
                let model = solver
                    .get_model()
                    .map(|m| extract_model(&m, &symbols, &declared));
                SolverResult::Sat(model)
            }
            SatResult::Unsat => SolverResult::Unsat,
            SatResult::Unknown => SolverResult::Unknown(
                solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        };
        tracing::debug!(elapsed = ?start.elapsed(), ?result, "Z3 native query finished");
        Ok(result)
    }
}

impl SolverBackend for Z3NativeSolver {
    fn check_sat(&self, script: &Script) -> Result<SolverResult, SolverError> {
        self.solve_script(script)
    }
}

#[derive(Clone, Debug)]
enum Z3Value {
    Bool(Bool),
    Int(Int),
}

fn create_const(name: &str, sort: &Sort) -> Result<Z3Value, SolverError> {
    match sort {
        Sort::Bool => Ok(Z3Value::Bool(Bool::new_const(name))),
        Sort::Int => Ok(Z3Value::Int(Int::new_const(name))),
        Sort::Uninterpreted(s) => Err(SolverError::Unsupported(format!(
            "uninterpreted sort {s} in native backend"
        ))),
    }
}

fn expect_bool(symbols: &HashMap<String, Z3Value>, term: &Term) -> Result<Bool, SolverError> {
    match translate_term(symbols, term)? {
        Z3Value::Bool(b) => Ok(b),
        Z3Value::Int(_) => Err(SolverError::ParseError(format!("expected Bool: {term}"))),
    }
}

fn expect_int(symbols: &HashMap<String, Z3Value>, term: &Term) -> Result<Int, SolverError> {
    match translate_term(symbols, term)? {
        Z3Value::Int(i) => Ok(i),
        Z3Value::Bool(_) => Err(SolverError::ParseError(format!("expected Int: {term}"))),
    }
}

fn translate_term(symbols: &HashMap<String, Z3Value>, term: &Term) -> Result<Z3Value, SolverError> {
    let int2 = |a: &Term, b: &Term| -> Result<(Int, Int), SolverError> {
        Ok((expect_int(symbols, a)?, expect_int(symbols, b)?))
    };
    Ok(match term {
        Term::BoolLit(b) => Z3Value::Bool(Bool::from_bool(*b)),
        Term::IntLit(n) => {
            let n = i64::try_from(*n).map_err(|_| {
                SolverError::Unsupported(format!("integer literal {n} exceeds 64 bits"))
            })?;
            Z3Value::Int(Int::from_i64(n))
        }
        Term::Const(name) => symbols
            .get(name)
            .cloned()
            .ok_or_else(|| SolverError::ParseError(format!("Undefined symbol: {name}")))?,

        Term::Not(a) => Z3Value::Bool(expect_bool(symbols, a)?.not()),
        Term::And(terms) | Term::Or(terms) => {
            let bools = terms
                .iter()
                .map(|t| expect_bool(symbols, t))
                .collect::<Result<Vec<_>, _>>()?;
            let refs: Vec<&Bool> = bools.iter().collect();
            if matches!(term, Term::And(_)) {
                Z3Value::Bool(Bool::and(&refs))
            } else {
                Z3Value::Bool(Bool::or(&refs))
            }
        }
        Term::Implies(a, b) => {
            Z3Value::Bool(expect_bool(symbols, a)?.implies(&expect_bool(symbols, b)?))
        }
        Term::Iff(a, b) => Z3Value::Bool(expect_bool(symbols, a)?.iff(&expect_bool(symbols, b)?)),
        Term::Eq(a, b) => match (translate_term(symbols, a)?, translate_term(symbols, b)?) {
            (Z3Value::Bool(x), Z3Value::Bool(y)) => Z3Value::Bool(x.iff(&y)),
            (Z3Value::Int(x), Z3Value::Int(y)) => Z3Value::Bool(x.eq(&y)),
            _ => {
                return Err(SolverError::ParseError(format!(
                    "Eq requires matching sorts: {term}"
                )));
            }
        },
        Term::Distinct(terms) => {
            let mut pairwise = Vec::new();
            for (i, a) in terms.iter().enumerate() {
                for b in &terms[i + 1..] {
                    let eq = expect_bool(symbols, &Term::eq(a.clone(), b.clone()))?;
                    pairwise.push(eq.not());
                }
            }
            let refs: Vec<&Bool> = pairwise.iter().collect();
            Z3Value::Bool(Bool::and(&refs))
        }
        Term::Ite(c, t, e) => {
            let c = expect_bool(symbols, c)?;
            match (translate_term(symbols, t)?, translate_term(symbols, e)?) {
                (Z3Value::Bool(t), Z3Value::Bool(e)) => Z3Value::Bool(c.ite(&t, &e)),
                (Z3Value::Int(t), Z3Value::Int(e)) => Z3Value::Int(c.ite(&t, &e)),
                _ => {
                    return Err(SolverError::ParseError(format!(
                        "ITE branches must have matching sorts: {term}"
                    )));
                }
            }
        }

        Term::IntAdd(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Int(Int::add(&[&x, &y]))
        }
        Term::IntSub(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Int(Int::sub(&[&x, &y]))
        }
        Term::IntMul(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Int(Int::mul(&[&x, &y]))
        }
        Term::IntDiv(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Int(x.div(&y))
        }
        Term::IntMod(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Int(x.modulo(&y))
        }
        Term::IntNeg(a) => Z3Value::Int(expect_int(symbols, a)?.unary_minus()),
        Term::IntLt(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Bool(x.lt(&y))
        }
        Term::IntLe(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Bool(x.le(&y))
        }
        Term::IntGt(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Bool(x.gt(&y))
        }
        Term::IntGe(a, b) => {
            let (x, y) = int2(a, b)?;
            Z3Value::Bool(x.ge(&y))
        }

        Term::App(name, _) => {
            return Err(SolverError::Unsupported(format!(
                "function application {name} in native backend"
            )));
        }
    })
}

/// Read back declared constants in declaration order, in SMT-LIB value syntax.
fn extract_model(
    model: &z3::Model,
    symbols: &HashMap<String, Z3Value>,
    declared: &[String],
) -> Model {
    let assignments = declared
        .iter()
        .filter_map(|name| {
            let value = match symbols.get(name)? {
                Z3Value::Bool(b) => model.eval(b, true)?.as_bool()?.to_string(),
                Z3Value::Int(i) => {
                    let v = model.eval(i, true)?;
                    match v.as_i64() {
                        Some(n) => Term::IntLit(i128::from(n)).to_string(),
                        None => v.to_string(),
                    }
                }
            };
            Some((name.clone(), value))
        })
        .collect();
    Model::with_assignments(assignments)
}
