//! Formula simplification for SMT-LIB terms.
//!
//! Constant folding, identity elimination, double negation and ITE
//! elimination over the Bool/Int fragment. Register valuations are kept
//! simplified so that equal values have equal terms.

use crate::eval::eval_ground;
use crate::term::Term;

/// Simplify a single term recursively.
///
/// The result is semantically equivalent to the input. Any ground subterm
/// that evaluates is replaced by its literal.
pub fn simplify_term(term: &Term) -> Term {
    let simplified = simplify_structure(term);
    if simplified.is_ground()
        && let Some(value) = eval_ground(&simplified)
    {
        return value.to_term();
    }
    simplified
}

fn simplify_structure(term: &Term) -> Term {
    let bin = |a: &Term, b: &Term| (Box::new(simplify_term(a)), Box::new(simplify_term(b)));
    match term {
        Term::BoolLit(_) | Term::IntLit(_) | Term::Const(_) => term.clone(),

        Term::Not(inner) => Term::not(simplify_term(inner)),
        Term::And(terms) => Term::and(terms.iter().map(simplify_term).collect()),
        Term::Or(terms) => Term::or(terms.iter().map(simplify_term).collect()),
        Term::Implies(a, b) => Term::implies(simplify_term(a), simplify_term(b)),
        Term::Iff(a, b) => {
            let (a, b) = bin(a, b);
            match (a.as_bool(), b.as_bool()) {
                (Some(true), _) => *b,
                (_, Some(true)) => *a,
                (Some(false), _) => Term::not(*b),
                (_, Some(false)) => Term::not(*a),
                _ if a == b => Term::BoolLit(true),
                _ => Term::Iff(a, b),
            }
        }

        Term::Eq(a, b) => {
            let (a, b) = bin(a, b);
            if a == b {
                Term::BoolLit(true)
            } else {
                Term::Eq(a, b)
            }
        }
        Term::Distinct(terms) => Term::Distinct(terms.iter().map(simplify_term).collect()),
        Term::Ite(cond, then_branch, else_branch) => match simplify_term(cond) {
            Term::BoolLit(true) => simplify_term(then_branch),
            Term::BoolLit(false) => simplify_term(else_branch),
            c => {
                let t = simplify_term(then_branch);
                let e = simplify_term(else_branch);
                if t == e {
                    t
                } else {
                    Term::Ite(Box::new(c), Box::new(t), Box::new(e))
                }
            }
        },

        Term::IntAdd(a, b) => {
            let (a, b) = bin(a, b);
            match (a.as_int(), b.as_int()) {
                (Some(0), _) => *b,
                (_, Some(0)) => *a,
                _ => Term::IntAdd(a, b),
            }
        }
        Term::IntSub(a, b) => {
            let (a, b) = bin(a, b);
            match b.as_int() {
                Some(0) => *a,
                _ => Term::IntSub(a, b),
            }
        }
        Term::IntMul(a, b) => {
            let (a, b) = bin(a, b);
            match (a.as_int(), b.as_int()) {
                (Some(0), _) | (_, Some(0)) => Term::IntLit(0),
                (Some(1), _) => *b,
                (_, Some(1)) => *a,
                _ => Term::IntMul(a, b),
            }
        }
        Term::IntDiv(a, b) => {
            let (a, b) = bin(a, b);
            Term::IntDiv(a, b)
        }
        Term::IntMod(a, b) => {
            let (a, b) = bin(a, b);
            Term::IntMod(a, b)
        }
        Term::IntNeg(a) => match simplify_term(a) {
            Term::IntNeg(inner) => *inner,
            other => Term::IntNeg(Box::new(other)),
        },
        Term::IntLt(a, b) => {
            let (a, b) = bin(a, b);
            Term::IntLt(a, b)
        }
        Term::IntLe(a, b) => {
            let (a, b) = bin(a, b);
            Term::IntLe(a, b)
        }
        Term::IntGt(a, b) => {
            let (a, b) = bin(a, b);
            Term::IntGt(a, b)
        }
        Term::IntGe(a, b) => {
            let (a, b) = bin(a, b);
            Term::IntGe(a, b)
        }

        Term::App(name, args) => Term::App(name.clone(), args.iter().map(simplify_term).collect()),
    }
}
