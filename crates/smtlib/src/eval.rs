//! Evaluation of ground (or fully bound) terms.
//!
//! Used for deciding guards while exploring process automata and for
//! checking candidate assignments inside the built-in solver.

use std::fmt;

use crate::term::Term;

/// A concrete value of the Bool/Int fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Bool(bool),
    Int(i128),
}

impl Value {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(b),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(self) -> Option<i128> {
        match self {
            Value::Int(n) => Some(n),
            Value::Bool(_) => None,
        }
    }

    /// The literal term denoting this value.
    pub fn to_term(self) -> Term {
        match self {
            Value::Bool(b) => Term::BoolLit(b),
            Value::Int(n) => Term::IntLit(n),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Evaluate `term` under `env`.
///
/// Returns `None` when a constant is unbound, operands are ill-sorted,
/// arithmetic overflows, or a division by zero occurs. Uninterpreted
/// applications are never evaluated.
pub fn eval_term(term: &Term, env: &impl Fn(&str) -> Option<Value>) -> Option<Value> {
    let int = |t: &Term| eval_term(t, env).and_then(Value::as_int);
    let boolean = |t: &Term| eval_term(t, env).and_then(Value::as_bool);
    Some(match term {
        Term::BoolLit(b) => Value::Bool(*b),
        Term::IntLit(n) => Value::Int(*n),
        Term::Const(name) => return env(name),
        Term::Not(a) => Value::Bool(!boolean(a)?),
        Term::And(ts) => {
            let mut all = true;
            for t in ts {
                all &= boolean(t)?;
            }
            Value::Bool(all)
        }
        Term::Or(ts) => {
            let mut any = false;
            for t in ts {
                any |= boolean(t)?;
            }
            Value::Bool(any)
        }
        Term::Implies(a, b) => Value::Bool(!boolean(a)? || boolean(b)?),
        Term::Iff(a, b) => Value::Bool(boolean(a)? == boolean(b)?),
        Term::Eq(a, b) => {
            let (va, vb) = (eval_term(a, env)?, eval_term(b, env)?);
            if std::mem::discriminant(&va) != std::mem::discriminant(&vb) {
                return None;
            }
            Value::Bool(va == vb)
        }
        Term::Distinct(ts) => {
            let mut seen = Vec::with_capacity(ts.len());
            for t in ts {
                seen.push(eval_term(t, env)?);
            }
            let n = seen.len();
            seen.sort();
            seen.dedup();
            Value::Bool(seen.len() == n)
        }
        Term::Ite(c, t, e) => {
            if boolean(c)? {
                eval_term(t, env)?
            } else {
                eval_term(e, env)?
            }
        }
        Term::IntAdd(a, b) => Value::Int(int(a)?.checked_add(int(b)?)?),
        Term::IntSub(a, b) => Value::Int(int(a)?.checked_sub(int(b)?)?),
        Term::IntMul(a, b) => Value::Int(int(a)?.checked_mul(int(b)?)?),
        // SMT-LIB `div`/`mod` are Euclidean.
        Term::IntDiv(a, b) => Value::Int(int(a)?.checked_div_euclid(int(b)?)?),
        Term::IntMod(a, b) => Value::Int(int(a)?.checked_rem_euclid(int(b)?)?),
        Term::IntNeg(a) => Value::Int(int(a)?.checked_neg()?),
        Term::IntLt(a, b) => Value::Bool(int(a)? < int(b)?),
        Term::IntLe(a, b) => Value::Bool(int(a)? <= int(b)?),
        Term::IntGt(a, b) => Value::Bool(int(a)? > int(b)?),
        Term::IntGe(a, b) => Value::Bool(int(a)? >= int(b)?),
        Term::App(_, _) => return None,
    })
}

/// Evaluate a term that must not reference any constants.
pub fn eval_ground(term: &Term) -> Option<Value> {
    eval_term(term, &|_| None)
}
