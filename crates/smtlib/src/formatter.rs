//! SMT-LIB2 text formatting for AST types.
//!
//! Implements `Display` for [`Sort`], [`Term`], [`Command`], and [`Script`].
//! The output is the text the subprocess backend pipes into an external solver.

use std::fmt;

use crate::command::Command;
use crate::script::Script;
use crate::sort::Sort;
use crate::term::Term;

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Uninterpreted(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// Write a binary SMT-LIB operator: `(op lhs rhs)`.
fn fmt_binop(op: &str, lhs: &Term, rhs: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {lhs} {rhs})")
}

/// Write a unary SMT-LIB operator: `(op arg)`.
fn fmt_unop(op: &str, arg: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {arg})")
}

/// Write an n-ary operator; `empty` is emitted when there are no operands.
fn fmt_nary(op: &str, empty: &str, terms: &[Term], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match terms {
        [] => write!(f, "{empty}"),
        [single] => write!(f, "{single}"),
        _ => {
            write!(f, "({op} ")?;
            fmt_term_list(terms, f)?;
            write!(f, ")")
        }
    }
}

fn fmt_sorted_vars(vars: &[(String, Sort)], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, (name, sort)) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({name} {sort})")?;
    }
    write!(f, ")")
}

/// Write a space-separated list of terms.
fn fmt_term_list(terms: &[Term], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, t) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // --- Literals ---
            Term::BoolLit(true) => write!(f, "true"),
            Term::BoolLit(false) => write!(f, "false"),
            Term::IntLit(n) => {
                if *n < 0 {
                    // SMT-LIB represents negative integers as `(- N)`
                    write!(f, "(- {})", n.unsigned_abs())
                } else {
                    write!(f, "{n}")
                }
            }

            // --- Variables ---
            Term::Const(name) => write!(f, "{name}"),

            // --- Boolean operations ---
            Term::Not(inner) => fmt_unop("not", inner, f),
            Term::And(terms) => fmt_nary("and", "true", terms, f),
            Term::Or(terms) => fmt_nary("or", "false", terms, f),
            Term::Implies(lhs, rhs) => fmt_binop("=>", lhs, rhs, f),
            Term::Iff(lhs, rhs) => fmt_binop("=", lhs, rhs, f),

            // --- Core ---
            Term::Eq(lhs, rhs) => fmt_binop("=", lhs, rhs, f),
            Term::Distinct(terms) => {
                if terms.len() < 2 {
                    write!(f, "true")
                } else {
                    write!(f, "(distinct ")?;
                    fmt_term_list(terms, f)?;
                    write!(f, ")")
                }
            }
            Term::Ite(cond, then_branch, else_branch) => {
                write!(f, "(ite {cond} {then_branch} {else_branch})")
            }

            // --- Integer arithmetic ---
            Term::IntAdd(a, b) => fmt_binop("+", a, b, f),
            Term::IntSub(a, b) => fmt_binop("-", a, b, f),
            Term::IntMul(a, b) => fmt_binop("*", a, b, f),
            Term::IntDiv(a, b) => fmt_binop("div", a, b, f),
            Term::IntMod(a, b) => fmt_binop("mod", a, b, f),
            Term::IntNeg(a) => fmt_unop("-", a, f),
            Term::IntLt(a, b) => fmt_binop("<", a, b, f),
            Term::IntLe(a, b) => fmt_binop("<=", a, b, f),
            Term::IntGt(a, b) => fmt_binop(">", a, b, f),
            Term::IntGe(a, b) => fmt_binop(">=", a, b, f),

            // --- Function application ---
            Term::App(name, args) => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "({name} ")?;
                    fmt_term_list(args, f)?;
                    write!(f, ")")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetLogic(logic) => write!(f, "(set-logic {logic})"),
            Command::SetOption(key, value) => write!(f, "(set-option :{key} {value})"),
            Command::DeclareConst(name, sort) => {
                write!(f, "(declare-const {name} {sort})")
            }
            Command::DeclareFun(name, param_sorts, return_sort) => {
                write!(f, "(declare-fun {name} (")?;
                for (i, s) in param_sorts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{s}")?;
                }
                write!(f, ") {return_sort})")
            }
            Command::DefineFun(name, params, return_sort, body) => {
                write!(f, "(define-fun {name} ")?;
                fmt_sorted_vars(params, f)?;
                write!(f, " {return_sort} {body})")
            }
            Command::Assert(term) => write!(f, "(assert {term})"),
            Command::CheckSat => write!(f, "(check-sat)"),
            Command::GetModel => write!(f, "(get-model)"),
            Command::GetValue(terms) => {
                write!(f, "(get-value (")?;
                fmt_term_list(terms, f)?;
                write!(f, "))")
            }
            Command::Push(n) => write!(f, "(push {n})"),
            Command::Pop(n) => write!(f, "(pop {n})"),
            Command::Comment(text) => write!(f, ";; {text}"),
            Command::Exit => write!(f, "(exit)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::command::Command;
    use crate::script::Script;
    use crate::sort::Sort;
    use crate::term::Term;

    fn c(name: &str) -> Term {
        Term::Const(name.to_string())
    }

    #[test]
    fn sorts() {
        assert_eq!(Sort::Bool.to_string(), "Bool");
        assert_eq!(Sort::Int.to_string(), "Int");
        assert_eq!(Sort::Uninterpreted("Event".into()).to_string(), "Event");
    }

    #[test]
    fn int_literals() {
        assert_eq!(Term::IntLit(0).to_string(), "0");
        assert_eq!(Term::IntLit(42).to_string(), "42");
        assert_eq!(Term::IntLit(-1).to_string(), "(- 1)");
        assert_eq!(Term::IntLit(i128::MIN).to_string(), format!("(- {})", i128::MIN.unsigned_abs()));
    }

    #[test]
    fn and_or_edge_cases() {
        assert_eq!(Term::And(vec![]).to_string(), "true");
        assert_eq!(Term::Or(vec![]).to_string(), "false");
        assert_eq!(Term::And(vec![c("a")]).to_string(), "a");
        assert_eq!(Term::Or(vec![c("a"), c("b")]).to_string(), "(or a b)");
    }

    #[test]
    fn distinct_needs_two_operands() {
        assert_eq!(Term::Distinct(vec![c("x")]).to_string(), "true");
        assert_eq!(
            Term::Distinct(vec![c("x"), c("y")]).to_string(),
            "(distinct x y)"
        );
    }

    #[test]
    fn implication_and_iff() {
        let t = Term::Implies(
            Box::new(c("rf_2_1")),
            Box::new(Term::Eq(Box::new(c("rv_t1_0")), Box::new(Term::IntLit(1)))),
        );
        assert_eq!(t.to_string(), "(=> rf_2_1 (= rv_t1_0 1))");
        let iff = Term::Iff(Box::new(c("a")), Box::new(c("b")));
        assert_eq!(iff.to_string(), "(= a b)");
    }

    #[test]
    fn integer_arithmetic() {
        let sum = Term::IntAdd(Box::new(c("r0")), Box::new(Term::IntLit(-2)));
        assert_eq!(sum.to_string(), "(+ r0 (- 2))");
        assert_eq!(Term::IntNeg(Box::new(c("r0"))).to_string(), "(- r0)");
        let cmp = Term::IntLe(Box::new(c("a")), Box::new(c("b")));
        assert_eq!(cmp.to_string(), "(<= a b)");
        let m = Term::IntMod(Box::new(c("a")), Box::new(Term::IntLit(2)));
        assert_eq!(m.to_string(), "(mod a 2)");
    }

    #[test]
    fn nested_ite() {
        let t = Term::Ite(
            Box::new(Term::IntLt(Box::new(c("x")), Box::new(Term::IntLit(0)))),
            Box::new(Term::IntNeg(Box::new(c("x")))),
            Box::new(c("x")),
        );
        assert_eq!(t.to_string(), "(ite (< x 0) (- x) x)");
    }

    #[test]
    fn application() {
        assert_eq!(Term::App("f".into(), vec![]).to_string(), "f");
        assert_eq!(
            Term::App("f".into(), vec![c("a"), Term::IntLit(3)]).to_string(),
            "(f a 3)"
        );
    }

    #[test]
    fn commands() {
        assert_eq!(
            Command::SetLogic("QF_LIA".into()).to_string(),
            "(set-logic QF_LIA)"
        );
        assert_eq!(
            Command::SetOption("produce-models".into(), "true".into()).to_string(),
            "(set-option :produce-models true)"
        );
        assert_eq!(
            Command::DeclareConst("co_1_2".into(), Sort::Bool).to_string(),
            "(declare-const co_1_2 Bool)"
        );
        assert_eq!(
            Command::DeclareFun("f".into(), vec![Sort::Int, Sort::Int], Sort::Bool).to_string(),
            "(declare-fun f (Int Int) Bool)"
        );
        assert_eq!(
            Command::DefineFun(
                "inc".into(),
                vec![("x".into(), Sort::Int)],
                Sort::Int,
                Term::IntAdd(Box::new(c("x")), Box::new(Term::IntLit(1)))
            )
            .to_string(),
            "(define-fun inc ((x Int)) Int (+ x 1))"
        );
        assert_eq!(
            Command::GetValue(vec![c("a"), c("b")]).to_string(),
            "(get-value (a b))"
        );
        assert_eq!(Command::Push(1).to_string(), "(push 1)");
        assert_eq!(Command::Pop(2).to_string(), "(pop 2)");
        assert_eq!(Command::Comment("axioms".into()).to_string(), ";; axioms");
        assert_eq!(Command::Exit.to_string(), "(exit)");
    }

    #[test]
    fn script_is_newline_separated() {
        let mut script = Script::new();
        script.push(Command::SetLogic("QF_LIA".into()));
        script.declare_const("x", Sort::Int);
        script.assert(Term::IntGt(Box::new(c("x")), Box::new(Term::IntLit(0))));
        script.push(Command::CheckSat);
        script.push(Command::GetModel);
        assert_eq!(
            script.to_string(),
            "(set-logic QF_LIA)\n(declare-const x Int)\n(assert (> x 0))\n(check-sat)\n(get-model)"
        );
        assert_eq!(Script::new().to_string(), "");
    }
}
