use std::io::Write;
use std::process::{Command, Stdio};

use mcm_smtlib::command::Command as SmtCmd;
use mcm_smtlib::script::Script;
use mcm_smtlib::term::Term;

use crate::config::{SolverConfig, SolverKind};
use crate::error::SolverError;
use crate::parser::parse_solver_output;
use crate::result::SolverResult;

/// Subprocess solver: pipes SMT-LIB2 text into Z3, CVC5 or Yices.
#[derive(Debug, Clone)]
pub struct CliSolver {
    config: SolverConfig,
}

impl CliSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Auto-detect the binary for `kind`.
    pub fn with_default_config_for(kind: SolverKind) -> Result<Self, SolverError> {
        Ok(Self::new(SolverConfig::auto_detect_for(kind)?))
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Check satisfiability of a Script.
    ///
    /// A `(set-option :produce-models true)` header is prepended and
    /// `(check-sat)`/`(get-model)` appended when missing.
    pub fn check_sat(&self, script: &Script) -> Result<SolverResult, SolverError> {
        self.check_sat_raw(&render_script(script))
    }

    /// Check satisfiability of raw SMT-LIB2 text.
    pub fn check_sat_raw(&self, smtlib: &str) -> Result<SolverResult, SolverError> {
        self.config.validate()?;
        let kind = self.config.kind;

        let mut child = Command::new(&self.config.solver_path)
            .args(self.config.build_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SolverError::ProcessError(format!("Failed to start {kind}: {e}")))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| SolverError::ProcessError(format!("Failed to open {kind} stdin")))?;
            stdin.write_all(smtlib.as_bytes()).map_err(|e| {
                SolverError::ProcessError(format!("Failed to write to {kind} stdin: {e}"))
            })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SolverError::ProcessError(format!("Failed to wait for {kind}: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::trace!(solver = %kind, %stdout, "solver answered");

        if stdout.trim() == "timeout" || stderr.contains("timeout") {
            return Ok(SolverResult::Unknown("timeout".to_string()));
        }

        parse_solver_output(&stdout, &stderr)
    }
}

/// Render `script` with model production switched on and the query
/// commands present exactly once.
fn render_script(script: &Script) -> String {
    let has = |pred: fn(&SmtCmd) -> bool| script.commands().iter().any(pred);
    let mut text = String::new();
    if !has(|c| matches!(c, SmtCmd::SetOption(key, _) if key == "produce-models")) {
        text.push_str("(set-option :produce-models true)\n");
    }
    if !has(|c| matches!(c, SmtCmd::SetLogic(_))) {
        text.push_str(&format!("(set-logic {})\n", default_logic(script)));
    }
    text.push_str(&script.to_string());
    text.push('\n');
    if !has(|c| matches!(c, SmtCmd::CheckSat)) {
        text.push_str("(check-sat)\n");
    }
    if !has(|c| matches!(c, SmtCmd::GetModel)) {
        text.push_str("(get-model)\n");
    }
    text
}

/// `QF_LIA` unless some product, quotient or remainder has no literal operand.
fn default_logic(script: &Script) -> &'static str {
    fn nonlinear(t: &Term) -> bool {
        let literal = |x: &Term| matches!(x, Term::IntLit(_));
        match t {
            Term::IntMul(a, b) | Term::IntDiv(a, b) | Term::IntMod(a, b)
                if !literal(a) && !literal(b) =>
            {
                true
            }
            Term::IntDiv(_, b) | Term::IntMod(_, b) if !literal(b) => true,
            Term::BoolLit(_) | Term::IntLit(_) | Term::Const(_) => false,
            Term::Not(a) | Term::IntNeg(a) => nonlinear(a),
            Term::And(ts) | Term::Or(ts) | Term::Distinct(ts) | Term::App(_, ts) => {
                ts.iter().any(nonlinear)
            }
            Term::Ite(c, a, b) => nonlinear(c) || nonlinear(a) || nonlinear(b),
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
            | Term::IntGe(a, b) => nonlinear(a) || nonlinear(b),
        }
    }
    if script.assertions().any(nonlinear) {
        "QF_NIA"
    } else {
        "QF_LIA"
    }
}
