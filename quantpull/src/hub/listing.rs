//! Repository file listing via the hub tree API.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, trace};

use super::transport::{header_str, next_page_link, request_error};
use super::urls::tree_url;
use super::HubClient;
use crate::error::{FetchError, FetchResult};
use crate::repository::{FileListing, RepositoryRef};
use crate::traits::RepositoryLister;

/// Header the hub uses to classify API errors.
const ERROR_CODE_HEADER: &str = "x-error-code";

/// One entry of a tree API page.
#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

impl RepositoryLister for HubClient {
    fn list(&self, repo: &RepositoryRef) -> FetchResult<FileListing> {
        let revision = &self.config.revision;
        let mut next = Some(tree_url(&self.config.endpoint, repo, revision)?.to_string());
        let mut files = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            trace!(url = %url, "Fetching listing page");

            let response = self
                .api
                .get(&url)
                .send()
                .map_err(|e| request_error(&url, e))?;

            let status = response.status();
            if !status.is_success() {
                let error_code = header_str(response.headers(), ERROR_CODE_HEADER);
                return Err(listing_status_error(repo, revision, &url, status, error_code));
            }

            next = next_page_link(response.headers());

            let entries: Vec<TreeEntry> = response.json().map_err(|e| {
                if e.is_decode() {
                    FetchError::Unclassified(format!("invalid listing response from {}: {}", url, e))
                } else {
                    request_error(&url, e)
                }
            })?;

            files.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.kind == "file")
                    .map(|entry| entry.path),
            );
            pages += 1;
        }

        debug!(repo = %repo, revision = %revision, files = files.len(), pages, "Listed repository");
        Ok(FileListing::new(files))
    }
}

/// Map a non-success listing status to the error taxonomy.
///
/// The hub answers 401 for both missing and private repositories, so 401,
/// 403 and 404 all mean the repository is not reachable with the current
/// credentials.
fn listing_status_error(
    repo: &RepositoryRef,
    revision: &str,
    url: &str,
    status: StatusCode,
    error_code: Option<&str>,
) -> FetchError {
    if error_code == Some("RevisionNotFound") {
        return FetchError::Unclassified(format!(
            "revision '{}' not found in repository '{}'",
            revision, repo
        ));
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            FetchError::RepositoryNotFound {
                repo: repo.to_string(),
            }
        }
        _ => FetchError::transport(url, format!("listing failed with status {}", status)),
    }
}
