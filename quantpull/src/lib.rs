//! quantpull - fetch one model file from a Hugging Face repository by
//! quantization tag.
//!
//! The library resolves a partial filename such as `Q4_K_M` against the
//! files of a remote repository and downloads the selected file:
//!
//! ```text
//! RepositoryLister ──► matcher::select ──► ArtifactFetcher
//!   (file listing)      (substring match)    (resumable transfer)
//! ```
//!
//! [`hub::HubClient`] implements both capability traits against the Hub's
//! HTTP interface; [`ArtifactResolver`] runs the stages in order.

pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod matcher;
pub mod repository;
pub mod resolver;
pub mod traits;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::HubConfig;
pub use error::{ErrorKind, FetchError, FetchResult, IntegrityFailure};
pub use hub::HubClient;
pub use matcher::{MatchPolicy, SearchTerm, Selection, NO_MATCH_PREVIEW_LIMIT};
pub use repository::{FileListing, RepositoryRef};
pub use resolver::{ArtifactResolver, DownloadOutcome, ResolveStage, StageCallback};
pub use traits::{ArtifactFetcher, FetchedArtifact, ProgressCallback, RepositoryLister};
