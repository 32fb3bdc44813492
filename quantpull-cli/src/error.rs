//! CLI error type.

use std::process::ExitCode;

use quantpull::FetchError;
use thiserror::Error;

/// Errors surfaced by the command line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid combination of arguments.
    #[error("{0}")]
    Config(String),

    /// Listing, matching or downloading failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Every failure exits with 1; scripts distinguish success from failure
    /// only.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_converts() {
        let err: CliError = FetchError::RepositoryNotFound {
            repo: "org/model".to_string(),
        }
        .into();

        assert!(matches!(err, CliError::Fetch(_)));
        assert_eq!(err.to_string(), "repository 'org/model' not found or is private");
    }

    #[test]
    fn test_every_error_exits_with_failure() {
        let errors = [
            CliError::Config("bad".to_string()),
            CliError::Fetch(FetchError::Unclassified("boom".to_string())),
        ];

        for err in errors {
            assert_eq!(err.exit_code(), ExitCode::FAILURE);
        }
    }
}
