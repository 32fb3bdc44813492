//! Resolve a quantization tag to one repository file and download it.
//!
//! This module runs the full workflow:
//! 1. List the repository files
//! 2. Match the search term against the listing
//! 3. Download the selected file
//!
//! Each stage gates the next. The fetcher is never called when listing or
//! matching fails, so those failures leave the filesystem untouched.

use std::path::Path;

use tracing::info;

use crate::error::FetchResult;
use crate::matcher::{select, MatchPolicy, SearchTerm, Selection};
use crate::repository::RepositoryRef;
use crate::traits::{ArtifactFetcher, FetchedArtifact, ProgressCallback, RepositoryLister};

/// Stage callback for resolve operations.
///
/// # Arguments
///
/// * `stage` - Stage being entered
/// * `message` - Human-readable message
pub type StageCallback = Box<dyn Fn(ResolveStage, &str) + Send + Sync>;

/// Resolve stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    /// Fetching the repository listing.
    Listing,
    /// Matching the search term.
    Matching,
    /// Transferring the selected file.
    Downloading,
    /// File is on local storage.
    Complete,
}

impl ResolveStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Listing => "Listing",
            Self::Matching => "Matching",
            Self::Downloading => "Downloading",
            Self::Complete => "Complete",
        }
    }
}

/// Result of a successful resolve and download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Which file was chosen, and whether the choice was ambiguous.
    pub selection: Selection,
    /// The file on local storage.
    pub artifact: FetchedArtifact,
}

/// Runs listing, matching and fetching over swappable backends.
pub struct ArtifactResolver<L: RepositoryLister, F: ArtifactFetcher> {
    lister: L,
    fetcher: F,
    policy: MatchPolicy,
    on_stage: Option<StageCallback>,
}

impl<L: RepositoryLister, F: ArtifactFetcher> ArtifactResolver<L, F> {
    /// Create a resolver with the default match policy.
    pub fn new(lister: L, fetcher: F) -> Self {
        Self {
            lister,
            fetcher,
            policy: MatchPolicy::default(),
            on_stage: None,
        }
    }

    /// Set the match policy.
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set a callback invoked when each stage starts.
    pub fn with_stage_callback(mut self, callback: StageCallback) -> Self {
        self.on_stage = Some(callback);
        self
    }

    fn report(&self, stage: ResolveStage, message: &str) {
        if let Some(ref cb) = self.on_stage {
            cb(stage, message);
        }
    }

    /// List the repository and select the file matching `term`.
    ///
    /// # Errors
    ///
    /// Propagates listing errors (`RepositoryNotFound`, `Transport`) and
    /// matching errors (`NoMatch`, or `AmbiguousMatch` under
    /// [`MatchPolicy::RequireUnique`]).
    pub fn resolve(&self, repo: &RepositoryRef, term: &SearchTerm) -> FetchResult<Selection> {
        self.report(ResolveStage::Listing, &format!("Listing files in {}", repo));
        let listing = self.lister.list(repo)?;
        info!(repo = %repo, files = listing.len(), "Repository listed");

        self.report(
            ResolveStage::Matching,
            &format!("Matching '{}' against {} files", term.as_str(), listing.len()),
        );
        let selection = select(&listing, term, self.policy)?;
        info!(
            selected = selection.file(),
            candidates = selection.candidates().len(),
            "Selected file"
        );

        Ok(selection)
    }

    /// Resolve `term` in `repo` and download the selected file into
    /// `destination_dir`.
    ///
    /// # Errors
    ///
    /// Any error from [`resolve`](Self::resolve), plus `Transport`,
    /// `Filesystem` and `Integrity` from the fetcher.
    pub fn download(
        &self,
        repo: &RepositoryRef,
        term: &SearchTerm,
        destination_dir: &Path,
        progress: Option<ProgressCallback>,
    ) -> FetchResult<DownloadOutcome> {
        let selection = self.resolve(repo, term)?;
        let artifact = self.fetch_selected(repo, &selection, destination_dir, progress)?;
        Ok(DownloadOutcome {
            selection,
            artifact,
        })
    }

    /// Download a previously resolved selection.
    pub fn fetch_selected(
        &self,
        repo: &RepositoryRef,
        selection: &Selection,
        destination_dir: &Path,
        progress: Option<ProgressCallback>,
    ) -> FetchResult<FetchedArtifact> {
        let filename = selection.file();
        self.report(
            ResolveStage::Downloading,
            &format!("Downloading {} to {}", filename, destination_dir.display()),
        );

        let artifact = match progress {
            Some(cb) => self
                .fetcher
                .fetch_with_progress(repo, filename, destination_dir, cb)?,
            None => self.fetcher.fetch(repo, filename, destination_dir)?,
        };

        self.report(
            ResolveStage::Complete,
            &format!("Saved to {}", artifact.path.display()),
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, FetchError};
    use crate::repository::FileListing;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Lister returning a fixed result.
    struct MockLister {
        result: Result<Vec<String>, ErrorKind>,
    }

    impl MockLister {
        fn files(files: &[&str]) -> Self {
            Self {
                result: Ok(files.iter().map(|f| f.to_string()).collect()),
            }
        }

        fn failing(kind: ErrorKind) -> Self {
            Self { result: Err(kind) }
        }
    }

    impl RepositoryLister for MockLister {
        fn list(&self, repo: &RepositoryRef) -> FetchResult<FileListing> {
            match &self.result {
                Ok(files) => Ok(FileListing::new(files.clone())),
                Err(ErrorKind::RepositoryNotFound) => Err(FetchError::RepositoryNotFound {
                    repo: repo.to_string(),
                }),
                Err(_) => Err(FetchError::transport("http://hub", "connection reset")),
            }
        }
    }

    /// Fetcher recording the files it was asked for.
    #[derive(Clone, Default)]
    struct RecordingFetcher {
        calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
    }

    impl RecordingFetcher {
        fn calls(&self) -> Vec<(String, PathBuf)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ArtifactFetcher for RecordingFetcher {
        fn fetch(
            &self,
            _repo: &RepositoryRef,
            filename: &str,
            destination_dir: &Path,
        ) -> FetchResult<FetchedArtifact> {
            self.calls
                .lock()
                .unwrap()
                .push((filename.to_string(), destination_dir.to_path_buf()));
            Ok(FetchedArtifact {
                path: destination_dir.join(filename),
                bytes: 42,
                resumed_from: 0,
                already_complete: false,
            })
        }

        fn fetch_with_progress(
            &self,
            repo: &RepositoryRef,
            filename: &str,
            destination_dir: &Path,
            on_progress: ProgressCallback,
        ) -> FetchResult<FetchedArtifact> {
            on_progress(42, 42);
            self.fetch(repo, filename, destination_dir)
        }
    }

    fn repo() -> RepositoryRef {
        RepositoryRef::new("TheBloke/Llama-2-7B-GGUF").unwrap()
    }

    #[test]
    fn test_download_unique_match() {
        let fetcher = RecordingFetcher::default();
        let resolver = ArtifactResolver::new(
            MockLister::files(&["model.Q4_K_M.gguf", "model.Q8_0.gguf"]),
            fetcher.clone(),
        );

        let outcome = resolver
            .download(&repo(), &SearchTerm::new("q4_k_m"), Path::new("out"), None)
            .unwrap();

        assert_eq!(
            outcome.selection,
            Selection::Unique("model.Q4_K_M.gguf".to_string())
        );
        assert_eq!(outcome.artifact.path, PathBuf::from("out/model.Q4_K_M.gguf"));
        assert_eq!(
            fetcher.calls(),
            vec![("model.Q4_K_M.gguf".to_string(), PathBuf::from("out"))]
        );
    }

    #[test]
    fn test_download_ambiguous_match_fetches_first() {
        let fetcher = RecordingFetcher::default();
        let resolver =
            ArtifactResolver::new(MockLister::files(&["a-q4_0.bin", "b-q4_0.bin"]), fetcher.clone());

        let outcome = resolver
            .download(&repo(), &SearchTerm::new("q4_0"), Path::new("."), None)
            .unwrap();

        assert!(outcome.selection.is_ambiguous());
        assert_eq!(outcome.selection.candidates().len(), 2);
        assert_eq!(fetcher.calls()[0].0, "a-q4_0.bin");
    }

    #[test]
    fn test_strict_policy_does_not_fetch_on_ambiguity() {
        let fetcher = RecordingFetcher::default();
        let resolver =
            ArtifactResolver::new(MockLister::files(&["a-q4_0.bin", "b-q4_0.bin"]), fetcher.clone())
                .with_policy(MatchPolicy::RequireUnique);

        let err = resolver
            .download(&repo(), &SearchTerm::new("q4_0"), Path::new("."), None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);
        assert!(fetcher.calls().is_empty());
    }

    #[test]
    fn test_no_match_does_not_fetch() {
        let fetcher = RecordingFetcher::default();
        let resolver =
            ArtifactResolver::new(MockLister::files(&["readme.md", "config.json"]), fetcher.clone());

        let err = resolver
            .download(&repo(), &SearchTerm::new("q4_k_m"), Path::new("."), None)
            .unwrap_err();

        match err {
            FetchError::NoMatch { preview, .. } => {
                assert_eq!(preview, vec!["readme.md", "config.json"]);
            }
            other => panic!("Expected NoMatch, got {:?}", other),
        }
        assert!(fetcher.calls().is_empty());
    }

    #[test]
    fn test_repository_not_found_does_not_fetch() {
        let fetcher = RecordingFetcher::default();
        let resolver = ArtifactResolver::new(
            MockLister::failing(ErrorKind::RepositoryNotFound),
            fetcher.clone(),
        );

        let err = resolver
            .download(&repo(), &SearchTerm::new("q4_k_m"), Path::new("."), None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RepositoryNotFound);
        assert!(fetcher.calls().is_empty());
    }

    #[test]
    fn test_listing_transport_error_propagates() {
        let resolver = ArtifactResolver::new(
            MockLister::failing(ErrorKind::Transport),
            RecordingFetcher::default(),
        );

        let err = resolver
            .resolve(&repo(), &SearchTerm::new("q4_k_m"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_stage_callback_sees_every_stage_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = Arc::clone(&stages);

        let resolver = ArtifactResolver::new(
            MockLister::files(&["model.Q4_K_M.gguf"]),
            RecordingFetcher::default(),
        )
        .with_stage_callback(Box::new(move |stage: ResolveStage, _message: &str| {
            stages_clone.lock().unwrap().push(stage);
        }));

        resolver
            .download(&repo(), &SearchTerm::new("Q4_K_M"), Path::new("."), None)
            .unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                ResolveStage::Listing,
                ResolveStage::Matching,
                ResolveStage::Downloading,
                ResolveStage::Complete,
            ]
        );
    }

    #[test]
    fn test_progress_callback_is_forwarded() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        let resolver = ArtifactResolver::new(
            MockLister::files(&["model.Q4_K_M.gguf"]),
            RecordingFetcher::default(),
        );

        resolver
            .download(
                &repo(),
                &SearchTerm::new("Q4_K_M"),
                Path::new("."),
                Some(Box::new(move |bytes, total| {
                    *seen_clone.lock().unwrap() = Some((bytes, total));
                })),
            )
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), Some((42, 42)));
    }

    #[test]
    fn test_resolve_stage_names() {
        assert_eq!(ResolveStage::Listing.name(), "Listing");
        assert_eq!(ResolveStage::Complete.name(), "Complete");
    }
}
