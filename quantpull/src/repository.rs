//! Repository identifiers and file listings.

use std::fmt;

use crate::error::{FetchError, FetchResult};

/// Identifier of a remote repository, e.g. `TheBloke/Llama-2-7B-GGUF`.
///
/// Only emptiness is checked locally; the remote side decides whether the
/// repository exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef(String);

impl RepositoryRef {
    /// Create a repository reference, rejecting empty identifiers.
    pub fn new(id: impl Into<String>) -> FetchResult<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(FetchError::InvalidRepository(
                "repository identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// The identifier as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Slash-separated parts of the identifier, for building URLs.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filenames of a repository, in the order the remote source returned them.
///
/// The order is significant: it decides which file wins when several match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    files: Vec<String>,
}

impl FileListing {
    pub fn new(files: Vec<String>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// The first `limit` filenames, in listing order.
    pub fn preview(&self, limit: usize) -> Vec<String> {
        self.files.iter().take(limit).cloned().collect()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.files
    }
}

impl From<Vec<String>> for FileListing {
    fn from(files: Vec<String>) -> Self {
        Self::new(files)
    }
}

impl FromIterator<String> for FileListing {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
