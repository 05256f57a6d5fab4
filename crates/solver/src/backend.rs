//! Abstraction over solver backends.
//!
//! `SolverBackend` is the single capability the checker consumes. Three
//! implementations exist: the subprocess [`CliSolver`], the in-process
//! [`BuiltinSolver`], and the native Z3 binding behind `z3-native`.

use std::fmt;
use std::str::FromStr;

use mcm_smtlib::script::Script;

use crate::builtin::BuiltinSolver;
use crate::config::SolverKind;
use crate::error::SolverError;
use crate::result::SolverResult;
use crate::solver::CliSolver;

/// Trait abstracting over different SMT solver backends.
pub trait SolverBackend {
    /// Check satisfiability of the given SMT script.
    ///
    /// - `Ok(SolverResult::Sat(model))` if satisfiable
    /// - `Ok(SolverResult::Unsat)` if unsatisfiable
    /// - `Ok(SolverResult::Unknown(reason))` if the backend couldn't decide
    /// - `Err(SolverError)` if the invocation itself failed
    fn check_sat(&self, script: &Script) -> Result<SolverResult, SolverError>;
}

impl SolverBackend for CliSolver {
    fn check_sat(&self, script: &Script) -> Result<SolverResult, SolverError> {
        CliSolver::check_sat(self, script)
    }
}

impl<B: SolverBackend + ?Sized> SolverBackend for Box<B> {
    fn check_sat(&self, script: &Script) -> Result<SolverResult, SolverError> {
        (**self).check_sat(script)
    }
}

/// Which backend to instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// In-process finite-domain solver; needs no external binary.
    #[default]
    Builtin,
    /// External solver driven through stdin/stdout.
    Cli(SolverKind),
    /// Z3 through its C API.
    Z3Native,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Builtin => write!(f, "builtin"),
            BackendKind::Cli(kind) => write!(f, "{}", kind.binary_name()),
            BackendKind::Z3Native => write!(f, "z3-native"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "builtin" | "internal" => Ok(BackendKind::Builtin),
            "z3-native" | "z3native" => Ok(BackendKind::Z3Native),
            other => other.parse::<SolverKind>().map(BackendKind::Cli).map_err(|_| {
                format!("Unknown solver: {s}. Valid options: builtin, z3, cvc5, yices, z3-native")
            }),
        }
    }
}

/// Create a backend of the requested kind.
///
/// `timeout_ms == 0` means no timeout.
pub fn create_backend(
    kind: BackendKind,
    timeout_ms: u64,
) -> Result<Box<dyn SolverBackend>, SolverError> {
    match kind {
        BackendKind::Builtin => {
            tracing::debug!("Using built-in finite-domain backend");
            Ok(Box::new(BuiltinSolver::new().with_timeout(timeout_ms)))
        }
        BackendKind::Cli(solver) => {
            tracing::debug!("Using {solver} subprocess backend");
            let mut cli = CliSolver::with_default_config_for(solver)?;
            if timeout_ms > 0 {
                cli = CliSolver::new(cli.config().clone().with_timeout(timeout_ms));
            }
            Ok(Box::new(cli))
        }
        BackendKind::Z3Native => create_native(timeout_ms),
    }
}

#[cfg(feature = "z3-native")]
fn create_native(timeout_ms: u64) -> Result<Box<dyn SolverBackend>, SolverError> {
    tracing::debug!("Using Z3 native API backend");
    Ok(Box::new(
        crate::z3_native::Z3NativeSolver::new().with_timeout(timeout_ms),
    ))
}

#[cfg(not(feature = "z3-native"))]
fn create_native(_timeout_ms: u64) -> Result<Box<dyn SolverBackend>, SolverError> {
    Err(SolverError::Unsupported(
        "z3-native backend requires the `z3-native` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcm_smtlib::sort::Sort;
    use mcm_smtlib::term::Term;

    #[test]
    fn backend_kind_parsing() {
        assert_eq!("builtin".parse::<BackendKind>(), Ok(BackendKind::Builtin));
        assert_eq!(
            "z3".parse::<BackendKind>(),
            Ok(BackendKind::Cli(SolverKind::Z3))
        );
        assert_eq!(
            "yices".parse::<BackendKind>(),
            Ok(BackendKind::Cli(SolverKind::Yices))
        );
        assert_eq!("z3-native".parse::<BackendKind>(), Ok(BackendKind::Z3Native));
        let err = "minisat".parse::<BackendKind>().unwrap_err();
        assert!(err.contains("builtin"));
    }

    #[test]
    fn backend_kind_display_round_trips() {
        for kind in [
            BackendKind::Builtin,
            BackendKind::Cli(SolverKind::Z3),
            BackendKind::Cli(SolverKind::Cvc5),
            BackendKind::Cli(SolverKind::Yices),
            BackendKind::Z3Native,
        ] {
            assert_eq!(kind.to_string().parse::<BackendKind>(), Ok(kind));
        }
    }

    #[test]
    fn builtin_backend_always_available() {
        let backend = create_backend(BackendKind::Builtin, 0).expect("builtin backend");
        let mut script = Script::new();
        script.declare_const("x", Sort::Bool);
        script.assert(Term::var("x"));
        assert!(backend.check_sat(&script).unwrap().is_sat());
    }

    #[test]
    fn cli_backend_names_missing_solver() {
        for kind in SolverKind::ALL {
            if let Err(err) = create_backend(BackendKind::Cli(kind), 0) {
                assert!(err.to_string().contains(&kind.to_string()), "{err}");
            }
        }
    }

    #[cfg(not(feature = "z3-native"))]
    #[test]
    fn native_backend_requires_feature() {
        assert!(matches!(
            create_backend(BackendKind::Z3Native, 0),
            Err(SolverError::Unsupported(_))
        ));
    }
}
