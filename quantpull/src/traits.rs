//! Capability interfaces for listing and fetching repository files.
//!
//! The resolver depends only on these traits, so the hub client can be
//! replaced by another remote source or by in-memory fakes in tests.

use std::path::{Path, PathBuf};

use crate::error::FetchResult;
use crate::repository::{FileListing, RepositoryRef};

/// Progress callback for a single transfer.
///
/// Arguments: (bytes_downloaded, total_bytes). `total_bytes` is 0 when the
/// server did not advertise a size.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Lists the files of a repository.
pub trait RepositoryLister: Send + Sync {
    /// Return every filename in the repository, in remote order.
    ///
    /// Implementations exhaust any pagination of the backing source and
    /// make a single attempt, without retries.
    fn list(&self, repo: &RepositoryRef) -> FetchResult<FileListing>;
}

/// Transfers one repository file into a local directory.
pub trait ArtifactFetcher: Send + Sync {
    /// Download `filename` from `repo` into `destination_dir`.
    fn fetch(
        &self,
        repo: &RepositoryRef,
        filename: &str,
        destination_dir: &Path,
    ) -> FetchResult<FetchedArtifact>;

    /// Download with progress reporting.
    fn fetch_with_progress(
        &self,
        repo: &RepositoryRef,
        filename: &str,
        destination_dir: &Path,
        on_progress: ProgressCallback,
    ) -> FetchResult<FetchedArtifact>;
}

/// A file that is fully present on local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    /// Final path of the file.
    pub path: PathBuf,
    /// Size of the file on disk.
    pub bytes: u64,
    /// Offset a previous partial transfer was resumed from (0 if none).
    pub resumed_from: u64,
    /// The file was already complete and nothing was transferred.
    pub already_complete: bool,
}

impl<T: RepositoryLister + ?Sized> RepositoryLister for &T {
    fn list(&self, repo: &RepositoryRef) -> FetchResult<FileListing> {
        (**self).list(repo)
    }
}

impl<T: ArtifactFetcher + ?Sized> ArtifactFetcher for &T {
    fn fetch(
        &self,
        repo: &RepositoryRef,
        filename: &str,
        destination_dir: &Path,
    ) -> FetchResult<FetchedArtifact> {
        (**self).fetch(repo, filename, destination_dir)
    }

    fn fetch_with_progress(
        &self,
        repo: &RepositoryRef,
        filename: &str,
        destination_dir: &Path,
        on_progress: ProgressCallback,
    ) -> FetchResult<FetchedArtifact> {
        (**self).fetch_with_progress(repo, filename, destination_dir, on_progress)
    }
}
