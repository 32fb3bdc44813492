//! Error taxonomy for resolving and downloading repository artifacts.
//!
//! Repository-level failures (`RepositoryNotFound`), match failures
//! (`NoMatch`, `AmbiguousMatch`), network failures (`Transport`), local
//! destination failures (`Filesystem`) and content failures (`Integrity`)
//! are kept apart so callers can report each one differently.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for resolve and fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while listing, matching or fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The repository identifier was empty.
    #[error("invalid repository identifier: {0}")]
    InvalidRepository(String),

    /// The repository does not exist or is not visible without credentials.
    #[error("repository '{repo}' not found or is private")]
    RepositoryNotFound { repo: String },

    /// The listing succeeded but no filename contains the search term.
    #[error("no files found matching '{term}' ({total} files in repository)")]
    NoMatch {
        term: String,
        /// Leading entries of the listing, in listing order.
        preview: Vec<String>,
        total: usize,
    },

    /// Several filenames matched while a unique match was required.
    #[error("'{term}' matched {} files, expected exactly one", .candidates.len())]
    AmbiguousMatch {
        term: String,
        candidates: Vec<String>,
    },

    /// Network failure, timeout or unexpected HTTP status.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The local destination could not be created or written.
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem { path: PathBuf, source: io::Error },

    /// The transfer finished but the content is incomplete or corrupt.
    #[error("integrity check failed for {filename}: {failure}")]
    Integrity {
        filename: String,
        failure: IntegrityFailure,
    },

    /// Anything not covered above, with the underlying message preserved.
    #[error("{0}")]
    Unclassified(String),
}

/// What the integrity check detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityFailure {
    /// Byte count on disk differs from the size advertised by the server.
    #[error("expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// SHA-256 of the content differs from the advertised hash.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Stable classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRepository,
    RepositoryNotFound,
    NoMatch,
    AmbiguousMatch,
    Transport,
    Filesystem,
    Integrity,
    Unclassified,
}

impl FetchError {
    /// Build a transport error from a URL and any displayable cause.
    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a filesystem error for the given path.
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRepository(_) => ErrorKind::InvalidRepository,
            Self::RepositoryNotFound { .. } => ErrorKind::RepositoryNotFound,
            Self::NoMatch { .. } => ErrorKind::NoMatch,
            Self::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Unclassified(_) => ErrorKind::Unclassified,
        }
    }

    /// A follow-up hint for the user, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RepositoryNotFound { .. } => Some(
                "If it is private or gated, make sure an access token is set in HF_TOKEN.",
            ),
            Self::AmbiguousMatch { .. } => {
                Some("Use a longer quantization string, or drop --strict to take the first match.")
            }
            Self::Transport { .. } => {
                Some("Check your network connection; rerunning resumes a partial download.")
            }
            Self::Filesystem { .. } => {
                Some("Check that the output directory can be created and is writable.")
            }
            Self::Integrity { .. } => Some("Rerun the command to fetch the file again."),
            _ => None,
        }
    }
}
