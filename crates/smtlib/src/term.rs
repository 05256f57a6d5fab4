use std::collections::BTreeSet;

/// SMT-LIB term (expression) representation.
///
/// Terms double as the value language of process registers, so they are
/// hashable and totally ordered: global states built from them are used as
/// keys of the visited table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    // === Literals ===
    /// Boolean literal
    BoolLit(bool),
    /// Integer literal (unbounded)
    IntLit(i128),

    // === Variables ===
    /// Named constant/variable reference
    Const(String),

    // === Boolean operations ===
    /// Logical NOT
    Not(Box<Term>),
    /// Logical AND (n-ary)
    And(Vec<Term>),
    /// Logical OR (n-ary)
    Or(Vec<Term>),
    /// Logical implication: `(=> a b)`
    Implies(Box<Term>, Box<Term>),
    /// Logical if-and-only-if: `(= a b)` for Bool
    Iff(Box<Term>, Box<Term>),

    // === Core ===
    /// Equality: `(= a b)`
    Eq(Box<Term>, Box<Term>),
    /// Distinct: `(distinct a b ...)`
    Distinct(Vec<Term>),
    /// If-then-else: `(ite cond then else)`
    Ite(Box<Term>, Box<Term>, Box<Term>),

    // === Integer arithmetic ===
    /// `(+ a b)`
    IntAdd(Box<Term>, Box<Term>),
    /// `(- a b)`
    IntSub(Box<Term>, Box<Term>),
    /// `(* a b)`
    IntMul(Box<Term>, Box<Term>),
    /// `(div a b)`: integer division
    IntDiv(Box<Term>, Box<Term>),
    /// `(mod a b)`
    IntMod(Box<Term>, Box<Term>),
    /// `(- a)`: integer negation
    IntNeg(Box<Term>),
    /// `(< a b)`
    IntLt(Box<Term>, Box<Term>),
    /// `(<= a b)`
    IntLe(Box<Term>, Box<Term>),
    /// `(> a b)`
    IntGt(Box<Term>, Box<Term>),
    /// `(>= a b)`
    IntGe(Box<Term>, Box<Term>),

    // === Function application ===
    /// `(f arg1 arg2 ...)`
    App(String, Vec<Term>),
}

impl Term {
    /// Named constant reference.
    pub fn var(name: impl Into<String>) -> Term {
        Term::Const(name.into())
    }

    /// Integer literal.
    pub fn int(value: i128) -> Term {
        Term::IntLit(value)
    }

    /// `(= a b)`.
    pub fn eq(lhs: Term, rhs: Term) -> Term {
        Term::Eq(Box::new(lhs), Box::new(rhs))
    }

    /// Negation that folds literals and double negation.
    pub fn not(inner: Term) -> Term {
        match inner {
            Term::BoolLit(b) => Term::BoolLit(!b),
            Term::Not(t) => *t,
            other => Term::Not(Box::new(other)),
        }
    }

    /// Conjunction that drops `true`, short-circuits on `false` and unwraps
    /// singletons.
    pub fn and(terms: Vec<Term>) -> Term {
        let mut kept = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Term::BoolLit(true) => {}
                Term::BoolLit(false) => return Term::BoolLit(false),
                Term::And(inner) => kept.extend(inner),
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Term::BoolLit(true),
            1 => kept.pop().unwrap_or(Term::BoolLit(true)),
            _ => Term::And(kept),
        }
    }

    /// Disjunction that drops `false`, short-circuits on `true` and unwraps
    /// singletons.
    pub fn or(terms: Vec<Term>) -> Term {
        let mut kept = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Term::BoolLit(false) => {}
                Term::BoolLit(true) => return Term::BoolLit(true),
                Term::Or(inner) => kept.extend(inner),
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Term::BoolLit(false),
            1 => kept.pop().unwrap_or(Term::BoolLit(false)),
            _ => Term::Or(kept),
        }
    }

    /// `(=> a b)` with literal folding.
    pub fn implies(lhs: Term, rhs: Term) -> Term {
        match (&lhs, &rhs) {
            (Term::BoolLit(false), _) | (_, Term::BoolLit(true)) => Term::BoolLit(true),
            (Term::BoolLit(true), _) => rhs,
            (_, Term::BoolLit(false)) => Term::not(lhs),
            _ => Term::Implies(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Boolean equivalence.
    pub fn iff(lhs: Term, rhs: Term) -> Term {
        Term::Iff(Box::new(lhs), Box::new(rhs))
    }

    /// Returns the literal value if this is a Boolean literal.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Term::BoolLit(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the literal value if this is an integer literal.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Term::IntLit(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns `true` if the term contains no named constants.
    pub fn is_ground(&self) -> bool {
        let mut names = BTreeSet::new();
        self.collect_consts(&mut names);
        names.is_empty()
    }

    /// Collect every named constant referenced by this term.
    pub fn collect_consts(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::BoolLit(_) | Term::IntLit(_) => {}
            Term::Const(name) => {
                out.insert(name.clone());
            }
            Term::Not(a) | Term::IntNeg(a) => a.collect_consts(out),
            Term::And(ts) | Term::Or(ts) | Term::Distinct(ts) | Term::App(_, ts) => {
                for t in ts {
                    t.collect_consts(out);
                }
            }
            Term::Implies(a, b)
            | Term::Iff(a, b)
            | Term::Eq(a, b)
            | Term::IntAdd(a, b)
            | Term::IntSub(a, b)
            | Term::IntMul(a, b)
            | Term::IntDiv(a, b)
            | Term::IntMod(a, b)
            | Term::IntLt(a, b)
            | Term::IntLe(a, b)
            | Term::IntGt(a, b)
            | Term::IntGe(a, b) => {
                a.collect_consts(out);
                b.collect_consts(out);
            }
            Term::Ite(c, t, e) => {
                c.collect_consts(out);
                t.collect_consts(out);
                e.collect_consts(out);
            }
        }
    }

    /// Replace named constants using `f`; constants for which `f` returns
    /// `None` are left untouched.
    pub fn substitute(&self, f: &impl Fn(&str) -> Option<Term>) -> Term {
        let sub = |t: &Term| Box::new(t.substitute(f));
        match self {
            Term::BoolLit(_) | Term::IntLit(_) => self.clone(),
            Term::Const(name) => f(name).unwrap_or_else(|| self.clone()),
            Term::Not(a) => Term::Not(sub(a)),
            Term::IntNeg(a) => Term::IntNeg(sub(a)),
            Term::And(ts) => Term::And(ts.iter().map(|t| t.substitute(f)).collect()),
            Term::Or(ts) => Term::Or(ts.iter().map(|t| t.substitute(f)).collect()),
            Term::Distinct(ts) => Term::Distinct(ts.iter().map(|t| t.substitute(f)).collect()),
            Term::App(name, ts) => {
                Term::App(name.clone(), ts.iter().map(|t| t.substitute(f)).collect())
            }
            Term::Implies(a, b) => Term::Implies(sub(a), sub(b)),
            Term::Iff(a, b) => Term::Iff(sub(a), sub(b)),
            Term::Eq(a, b) => Term::Eq(sub(a), sub(b)),
            Term::IntAdd(a, b) => Term::IntAdd(sub(a), sub(b)),
            Term::IntSub(a, b) => Term::IntSub(sub(a), sub(b)),
            Term::IntMul(a, b) => Term::IntMul(sub(a), sub(b)),
            Term::IntDiv(a, b) => Term::IntDiv(sub(a), sub(b)),
            Term::IntMod(a, b) => Term::IntMod(sub(a), sub(b)),
            Term::IntLt(a, b) => Term::IntLt(sub(a), sub(b)),
            Term::IntLe(a, b) => Term::IntLe(sub(a), sub(b)),
            Term::IntGt(a, b) => Term::IntGt(sub(a), sub(b)),
            Term::IntGe(a, b) => Term::IntGe(sub(a), sub(b)),
            Term::Ite(c, t, e) => Term::Ite(sub(c), sub(t), sub(e)),
        }
    }
}
