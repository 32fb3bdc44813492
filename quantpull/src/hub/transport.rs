//! HTTP client construction and response helpers shared by the hub client.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LINK};
use reqwest::redirect::Policy;

use crate::config::HubConfig;
use crate::error::{FetchError, FetchResult};

/// How a client handles redirects and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClientKind {
    /// API calls: follows redirects, whole-request timeout.
    Api,
    /// HEAD requests that read hub headers before any redirect.
    Metadata,
    /// File transfers: follows redirects, only the connect phase is bounded.
    Transfer,
}

/// Build a blocking reqwest client for the given role.
pub(crate) fn build_client(config: &HubConfig, kind: ClientKind) -> FetchResult<Client> {
    let mut headers = HeaderMap::new();
    if let Some(ref token) = config.token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            FetchError::Unclassified("access token contains invalid characters".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    let builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(config.timeout);

    let builder = match kind {
        ClientKind::Api => builder.timeout(config.timeout),
        ClientKind::Metadata => builder.timeout(config.timeout).redirect(Policy::none()),
        // Multi-gigabyte transfers must not hit a whole-request deadline
        ClientKind::Transfer => builder.timeout(None),
    };

    builder
        .build()
        .map_err(|e| FetchError::Unclassified(format!("failed to create HTTP client: {}", e)))
}

/// Convert a reqwest send error into a transport error.
pub(crate) fn request_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::transport(url, format!("request timed out ({})", error))
    } else if error.is_connect() {
        FetchError::transport(url, format!("connection failed ({})", error))
    } else {
        FetchError::transport(url, error)
    }
}

/// Read a header as a trimmed string.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Read a header as an unsigned integer.
pub(crate) fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|v| v.parse::<u64>().ok())
}

/// Extract the `rel="next"` target from a `Link` header.
pub(crate) fn next_page_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(parse_next_link)
}

fn parse_next_link(link: &str) -> Option<String> {
    let mut parts = link.split(';');
    let target = parts.next()?.trim();
    let target = target.strip_prefix('<')?.strip_suffix('>')?;

    let is_next = parts.any(|param| {
        let param = param.trim();
        param
            .strip_prefix("rel=")
            .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
            .unwrap_or(false)
    });

    is_next.then(|| target.to_string())
}
