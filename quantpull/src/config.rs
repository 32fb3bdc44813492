//! Configuration for talking to the model hub.

use std::env;
use std::time::Duration;

use crate::matcher::MatchPolicy;

/// Public Hugging Face Hub endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Revision read when none is given.
pub const DEFAULT_REVISION: &str = "main";

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Environment variable overriding the hub endpoint.
pub const ENDPOINT_ENV: &str = "HF_ENDPOINT";

/// Environment variables holding an access token, in lookup order.
pub const TOKEN_ENVS: [&str; 2] = ["HF_TOKEN", "HUGGING_FACE_HUB_TOKEN"];

/// Configuration for the hub client and the resolver.
#[derive(Clone)]
pub struct HubConfig {
    /// Base URL of the hub, without a trailing slash.
    pub endpoint: String,

    /// Branch, tag or commit to list and download from.
    pub revision: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Access token sent as a bearer token.
    ///
    /// Only carried, never obtained or stored.
    pub token: Option<String>,

    /// User agent sent with every request.
    pub user_agent: String,

    /// What to do when several files match.
    pub match_policy: MatchPolicy,
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("endpoint", &self.endpoint)
            .field("revision", &self.revision)
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("match_policy", &self.match_policy)
            .finish()
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token: None,
            user_agent: format!("quantpull/{}", crate::VERSION),
            match_policy: MatchPolicy::default(),
        }
    }
}

impl HubConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from `HF_ENDPOINT` and the token variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            config = config.with_endpoint(endpoint);
        }

        config.token = TOKEN_ENVS
            .iter()
            .filter_map(|key| lookup(key))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());

        config
    }

    /// Set the hub endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the revision.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the match policy.
    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }
}
