//! Quantization tag matching against a repository listing.
//!
//! Matching is plain case-insensitive substring containment. There is no
//! wildcard syntax, scoring or ranking: when several files contain the
//! term, the first one in listing order is selected.

use crate::error::{FetchError, FetchResult};
use crate::repository::FileListing;

/// Number of listing entries shown when nothing matches.
pub const NO_MATCH_PREVIEW_LIMIT: usize = 20;

/// A search term, lower-cased once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    original: String,
    normalized: String,
}

impl SearchTerm {
    pub fn new(term: impl Into<String>) -> Self {
        let original = term.into();
        let normalized = original.to_lowercase();
        Self {
            original,
            normalized,
        }
    }

    /// The term as the user typed it.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Whether `filename` contains this term, ignoring case.
    pub fn matches(&self, filename: &str) -> bool {
        filename.to_lowercase().contains(&self.normalized)
    }
}

/// How to proceed when more than one file matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Take the first match in listing order and flag the ambiguity.
    #[default]
    FirstMatch,
    /// Fail with [`FetchError::AmbiguousMatch`].
    RequireUnique,
}

/// Filenames that contain the search term, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    matches: Vec<String>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.matches
    }

    /// The first match in listing order.
    pub fn first(&self) -> Option<&str> {
        self.matches.first().map(String::as_str)
    }
}

/// The file chosen for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Exactly one file matched.
    Unique(String),
    /// Several files matched; `selected` is the first of `candidates`.
    Ambiguous {
        selected: String,
        candidates: Vec<String>,
    },
}

impl Selection {
    /// The selected filename.
    pub fn file(&self) -> &str {
        match self {
            Self::Unique(file) => file,
            Self::Ambiguous { selected, .. } => selected,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }

    /// Every file that matched, selected one first.
    pub fn candidates(&self) -> &[String] {
        match self {
            Self::Unique(file) => std::slice::from_ref(file),
            Self::Ambiguous { candidates, .. } => candidates,
        }
    }
}

/// Collect the filenames of `listing` that contain `term`, keeping order.
pub fn find_matches(listing: &FileListing, term: &SearchTerm) -> MatchSet {
    let matches = listing
        .iter()
        .filter(|name| term.matches(name))
        .map(str::to_string)
        .collect();
    MatchSet { matches }
}

/// Match `term` against `listing` and decide which file to fetch.
///
/// # Errors
///
/// Returns [`FetchError::NoMatch`] with a preview of the listing when no file
/// contains the term, and [`FetchError::AmbiguousMatch`] when several do and
/// `policy` is [`MatchPolicy::RequireUnique`].
pub fn select(
    listing: &FileListing,
    term: &SearchTerm,
    policy: MatchPolicy,
) -> FetchResult<Selection> {
    let mut set = find_matches(listing, term);

    match set.len() {
        0 => Err(FetchError::NoMatch {
            term: term.as_str().to_string(),
            preview: listing.preview(NO_MATCH_PREVIEW_LIMIT),
            total: listing.len(),
        }),
        1 => Ok(Selection::Unique(set.matches.remove(0))),
        count => {
            if policy == MatchPolicy::RequireUnique {
                return Err(FetchError::AmbiguousMatch {
                    term: term.as_str().to_string(),
                    candidates: set.matches,
                });
            }

            let selected = set.matches[0].clone();
            // The caller decides how to warn the user
            tracing::info!(
                term = term.as_str(),
                count,
                selected = %selected,
                "multiple files matched, selecting the first in listing order"
            );
            Ok(Selection::Ambiguous {
                selected,
                candidates: set.matches,
            })
        }
    }
}
