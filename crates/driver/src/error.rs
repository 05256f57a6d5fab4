use std::fmt;
use std::path::PathBuf;

use mcm_checker::process::AutomatonError;
use mcm_checker::{CheckError, McmError};

/// Errors of the `mcm-check` front end.
#[derive(Debug)]
pub enum DriverError {
    /// Bad command line.
    Usage(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The litmus test is well-formed JSON but not a valid program.
    Litmus(String),
    Model(McmError),
    Check(CheckError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Usage(msg) => write!(f, "{msg}"),
            DriverError::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            DriverError::Json { path, source } => {
                write!(f, "malformed JSON in {}: {source}", path.display())
            }
            DriverError::Litmus(msg) => write!(f, "invalid litmus test: {msg}"),
            DriverError::Model(err) => write!(f, "invalid memory model: {err}"),
            DriverError::Check(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io { source, .. } => Some(source),
            DriverError::Json { source, .. } => Some(source),
            DriverError::Model(err) => Some(err),
            DriverError::Check(err) => Some(err),
            DriverError::Usage(_) | DriverError::Litmus(_) => None,
        }
    }
}

impl From<McmError> for DriverError {
    fn from(err: McmError) -> Self {
        DriverError::Model(err)
    }
}

impl From<CheckError> for DriverError {
    fn from(err: CheckError) -> Self {
        DriverError::Check(err)
    }
}

impl From<AutomatonError> for DriverError {
    fn from(err: AutomatonError) -> Self {
        DriverError::Litmus(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_error_names_path() {
        let err = DriverError::Io {
            path: PathBuf::from("sb.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("sb.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn model_errors_convert() {
        let err: DriverError = McmError::RecursiveRelation("hb".into()).into();
        assert!(matches!(err, DriverError::Model(_)));
        assert!(err.to_string().contains("hb"));
    }
}
