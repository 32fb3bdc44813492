//! URL construction for hub API and file endpoints.

use reqwest::Url;

use crate::error::{FetchError, FetchResult};
use crate::repository::RepositoryRef;

/// `{endpoint}/api/models/{repo}/tree/{revision}?recursive=true`
pub(crate) fn tree_url(endpoint: &str, repo: &RepositoryRef, revision: &str) -> FetchResult<Url> {
    let mut url = parse_endpoint(endpoint)?;
    url.path_segments_mut()
        .map_err(|_| not_a_base(endpoint))?
        .pop_if_empty()
        .extend(["api", "models"])
        .extend(repo.segments())
        // The revision is a single segment even when it contains slashes
        .push("tree")
        .push(revision);
    url.query_pairs_mut().append_pair("recursive", "true");
    Ok(url)
}

/// `{endpoint}/{repo}/resolve/{revision}/{filename}`
pub(crate) fn resolve_url(
    endpoint: &str,
    repo: &RepositoryRef,
    revision: &str,
    filename: &str,
) -> FetchResult<Url> {
    let mut url = parse_endpoint(endpoint)?;
    url.path_segments_mut()
        .map_err(|_| not_a_base(endpoint))?
        .pop_if_empty()
        .extend(repo.segments())
        .push("resolve")
        .push(revision)
        .extend(filename.split('/'));
    Ok(url)
}

fn parse_endpoint(endpoint: &str) -> FetchResult<Url> {
    Url::parse(endpoint)
        .map_err(|e| FetchError::Unclassified(format!("invalid hub endpoint '{}': {}", endpoint, e)))
}

fn not_a_base(endpoint: &str) -> FetchError {
    FetchError::Unclassified(format!("hub endpoint '{}' cannot be used as a base URL", endpoint))
}
