//! Parsing of solver stdout.
//!
//! The first meaningful line is the verdict. On `sat` the rest is the
//! `(get-model)` answer, which is read as an S-expression and scanned for
//! nullary `define-fun` entries.

use crate::error::SolverError;
use crate::model::Model;
use crate::result::SolverResult;

/// Parse solver stdout/stderr into a `SolverResult`.
pub fn parse_solver_output(stdout: &str, stderr: &str) -> Result<SolverResult, SolverError> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first_line) = lines.next() else {
        if stderr.contains("timeout") {
            return Ok(SolverResult::Unknown("timeout".to_string()));
        }
        return Err(SolverError::ParseError(format!(
            "Empty solver output. stderr: {}",
            stderr.trim()
        )));
    };

    match first_line {
        "unsat" => Ok(SolverResult::Unsat),
        "sat" => {
            let rest: Vec<&str> = lines.collect();
            let model = parse_model(&rest.join(" "))?;
            Ok(SolverResult::Sat(model))
        }
        "unknown" => {
            let reason = lines
                .next()
                .map(|l| l.trim_start_matches('(').trim_end_matches(')').to_string())
                .filter(|l| !l.is_empty() && !l.starts_with("error"))
                .unwrap_or_else(|| {
                    if stderr.trim().is_empty() {
                        "unknown".to_string()
                    } else {
                        stderr.trim().to_string()
                    }
                });
            Ok(SolverResult::Unknown(reason))
        }
        "timeout" => Ok(SolverResult::Unknown("timeout".to_string())),
        other if other.starts_with("(error") => Err(SolverError::ParseError(format!(
            "Solver rejected script: {other}"
        ))),
        other => Err(SolverError::ParseError(format!(
            "Unexpected solver output: {other}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    fn render(&self) -> String {
        match self {
            Sexp::Atom(a) => a.clone(),
            Sexp::List(items) => {
                let inner: Vec<String> = items.iter().map(Sexp::render).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            '|' => {
                // Quoted symbol, kept verbatim including the bars.
                current.push(c);
                for q in chars.by_ref() {
                    current.push(q);
                    if q == '|' {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_sexps(tokens: &[String]) -> Result<Vec<Sexp>, SolverError> {
    let mut stack: Vec<Vec<Sexp>> = vec![Vec::new()];
    for tok in tokens {
        match tok.as_str() {
            "(" => stack.push(Vec::new()),
            ")" => {
                let done = stack
                    .pop()
                    .ok_or_else(|| SolverError::ParseError("unbalanced ')'".to_string()))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| SolverError::ParseError("unbalanced ')'".to_string()))?;
                parent.push(Sexp::List(done));
            }
            atom => {
                if let Some(top) = stack.last_mut() {
                    top.push(Sexp::Atom(atom.to_string()));
                }
            }
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(top), true) => Ok(top),
        _ => Err(SolverError::ParseError("unbalanced '('".to_string())),
    }
}

/// Collect nullary `define-fun` entries anywhere in the model text.
fn parse_model(text: &str) -> Result<Option<Model>, SolverError> {
    if !text.contains("define-fun") {
        return Ok(None);
    }
    let sexps = parse_sexps(&tokenize(text))?;
    let mut assignments = Vec::new();
    for sexp in &sexps {
        collect_define_funs(sexp, &mut assignments);
    }
    Ok((!assignments.is_empty()).then(|| Model::with_assignments(assignments)))
}

fn collect_define_funs(sexp: &Sexp, out: &mut Vec<(String, String)>) {
    let Sexp::List(items) = sexp else {
        return;
    };
    match items.as_slice() {
        [Sexp::Atom(head), Sexp::Atom(name), Sexp::List(params), _sort, value]
            if head == "define-fun" =>
        {
            if params.is_empty() {
                out.push((name.trim_matches('|').to_string(), value.render()));
            }
        }
        _ => {
            for item in items {
                collect_define_funs(item, out);
            }
        }
    }
}
