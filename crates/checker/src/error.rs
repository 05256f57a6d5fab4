use std::fmt;

use mcm_solver::error::SolverError;

use crate::mcm::McmError;

/// Errors of a memory-model check.
#[derive(Debug, PartialEq)]
pub enum CheckError {
    /// The memory model is malformed; reported before any exploration.
    InvalidModel(McmError),
    /// The queried outcome names a missing process, register or variable.
    InvalidOutcome(String),
    /// A solver query failed.
    Solver {
        /// Index of the terminal state whose query failed.
        terminal: usize,
        /// Human-readable description of the queried state.
        description: String,
        source: SolverError,
    },
    /// The solver backend could not be created.
    Backend(SolverError),
    /// The worker pool could not be created.
    ThreadPool(String),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::InvalidModel(err) => write!(f, "invalid memory model: {err}"),
            CheckError::InvalidOutcome(msg) => write!(f, "invalid outcome: {msg}"),
            CheckError::Solver {
                terminal,
                description,
                source,
            } => write!(
                f,
                "solver failed on terminal state #{terminal} ({description}): {source}"
            ),
            CheckError::Backend(err) => write!(f, "cannot create solver backend: {err}"),
            CheckError::ThreadPool(msg) => write!(f, "cannot create worker pool: {msg}"),
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckError::InvalidModel(err) => Some(err),
            CheckError::Solver { source, .. } | CheckError::Backend(source) => Some(source),
            CheckError::InvalidOutcome(_) | CheckError::ThreadPool(_) => None,
        }
    }
}

impl From<McmError> for CheckError {
    fn from(err: McmError) -> Self {
        CheckError::InvalidModel(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_names_the_relation() {
        let err = CheckError::InvalidModel(McmError::UnknownRelation {
            name: "hb".into(),
            referenced_from: "main".into(),
        });
        assert_eq!(
            err.to_string(),
            "invalid memory model: unknown relation 'hb' referenced from 'main'"
        );
    }

    #[test]
    fn solver_error_is_chained() {
        let err = CheckError::Solver {
            terminal: 3,
            description: "P0: W(x)=1@T0.0".into(),
            source: SolverError::Timeout,
        };
        assert!(err.to_string().starts_with("solver failed on terminal state #3"));
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("Solver timeout exceeded".to_string())
        );
        assert!(CheckError::InvalidOutcome("x".into()).source().is_none());
    }
}
