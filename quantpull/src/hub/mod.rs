//! Hugging Face Hub client.
//!
//! [`HubClient`] implements both capability traits against the hub's HTTP
//! interface:
//! - Recursive file listing with `Link` header pagination (`listing`)
//! - Single file downloads with resume support (`download`)
//! - SHA-256 verification of LFS content (`checksum`)
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use quantpull::hub::HubClient;
//! use quantpull::{ArtifactFetcher, HubConfig, RepositoryLister, RepositoryRef};
//!
//! let client = HubClient::new(HubConfig::from_env())?;
//! let repo = RepositoryRef::new("TheBloke/Llama-2-7B-GGUF")?;
//!
//! let listing = client.list(&repo)?;
//! let artifact = client.fetch(&repo, "llama-2-7b.Q4_K_M.gguf", Path::new("models"))?;
//! println!("Saved to {}", artifact.path.display());
//! ```

mod checksum;
mod download;
mod listing;
mod transport;
mod urls;

use reqwest::blocking::Client;

use crate::config::HubConfig;
use crate::error::FetchResult;
use transport::{build_client, ClientKind};

pub use checksum::calculate_file_checksum;
pub use download::PARTIAL_SUFFIX;

/// Blocking client for the hub's listing and file endpoints.
#[derive(Debug)]
pub struct HubClient {
    config: HubConfig,
    api: Client,
    metadata: Client,
    transfer: Client,
}

impl HubClient {
    /// Create a hub client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Unclassified`](crate::FetchError::Unclassified)
    /// if the token is not a valid header value or the TLS backend fails to
    /// initialise.
    pub fn new(config: HubConfig) -> FetchResult<Self> {
        Ok(Self {
            api: build_client(&config, ClientKind::Api)?,
            metadata: build_client(&config, ClientKind::Metadata)?,
            transfer: build_client(&config, ClientKind::Transfer)?,
            config,
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}
