//! Single file downloads with resume support.
//!
//! Bytes are streamed into `<target>.incomplete` next to the final path.
//! An existing partial file is resumed with an HTTP Range request, and the
//! partial is only renamed onto the target after the size (and the SHA-256,
//! when the hub advertises one) has been verified. An interrupted run
//! therefore leaves at most a resumable partial, never a truncated target.
//!
//! Only LFS files carry a SHA-256. A partial of any other file is discarded
//! rather than resumed, since a size check alone cannot tell a partial left
//! by an older revision from one of the current file.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use reqwest::blocking::Response;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, ETAG, LOCATION, RANGE};
use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use super::checksum::{calculate_file_checksum, sha256_from_etag};
use super::transport::{header_str, header_u64, request_error};
use super::urls::resolve_url;
use super::HubClient;
use crate::error::{FetchError, FetchResult, IntegrityFailure};
use crate::repository::RepositoryRef;
use crate::traits::{ArtifactFetcher, FetchedArtifact, ProgressCallback};

/// Suffix of the resumable partial file kept next to the target.
pub const PARTIAL_SUFFIX: &str = ".incomplete";

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Size of the file before any redirect to LFS storage.
const LINKED_SIZE_HEADER: &str = "x-linked-size";

/// Etag of the LFS object (its SHA-256) before any redirect.
const LINKED_ETAG_HEADER: &str = "x-linked-etag";

/// What the hub reports about a file before transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RemoteFileInfo {
    /// Expected size in bytes, 0 if unknown.
    size: u64,
    /// Expected SHA-256, for LFS-stored files.
    sha256: Option<String>,
}

impl RemoteFileInfo {
    fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let size = header_u64(headers, LINKED_SIZE_HEADER)
            .or_else(|| header_u64(headers, CONTENT_LENGTH.as_str()))
            .unwrap_or(0);
        let sha256 = header_str(headers, LINKED_ETAG_HEADER)
            .or_else(|| header_str(headers, ETAG.as_str()))
            .and_then(sha256_from_etag);
        Self { size, sha256 }
    }

    /// Hub headers present on a redirect response, if any.
    fn from_linked_headers(headers: &reqwest::header::HeaderMap) -> Option<Self> {
        header_u64(headers, LINKED_SIZE_HEADER).map(|_| Self::from_headers(headers))
    }
}

impl HubClient {
    /// Download a file with resumption support.
    fn download_with_resume(
        &self,
        repo: &RepositoryRef,
        filename: &str,
        destination_dir: &Path,
        progress: Option<ProgressCallback>,
    ) -> FetchResult<FetchedArtifact> {
        let target = target_path(destination_dir, filename)?;
        let partial = partial_path(&target);
        let url = resolve_url(&self.config.endpoint, repo, &self.config.revision, filename)?;

        let info = self.query_file_info(repo, &url)?;
        debug!(
            url = %url,
            size = info.size,
            sha256 = info.sha256.as_deref().unwrap_or("-"),
            "Queried remote file"
        );

        if let Some(artifact) = check_existing_download(&target, &partial, &info, progress.as_ref())? {
            info!(path = %artifact.path.display(), "File already complete, skipping download");
            return Ok(artifact);
        }

        let start_byte = prepare_destination(destination_dir, &target, &partial, &info)?;
        let (written, resumed_from) =
            self.stream_download(repo, &url, &partial, start_byte, &info, progress)?;

        verify_download(filename, &partial, written, &info)?;

        fs::rename(&partial, &target).map_err(|e| FetchError::filesystem(&target, e))?;
        info!(path = %target.display(), bytes = written, resumed_from, "Download complete");

        Ok(FetchedArtifact {
            path: target,
            bytes: written,
            resumed_from,
            already_complete: false,
        })
    }

    /// Query size and checksum via HEAD, reading hub headers before redirects.
    fn query_file_info(&self, repo: &RepositoryRef, url: &Url) -> FetchResult<RemoteFileInfo> {
        let response = self
            .metadata
            .head(url.clone())
            .send()
            .map_err(|e| request_error(url.as_str(), e))?;

        if !response.status().is_redirection() {
            return file_info_from_response(repo, url.as_str(), &response);
        }

        if let Some(info) = RemoteFileInfo::from_linked_headers(response.headers()) {
            return Ok(info);
        }

        let location = header_str(response.headers(), LOCATION.as_str()).ok_or_else(|| {
            FetchError::transport(url.as_str(), "redirect without a Location header")
        })?;
        let redirected = url
            .join(location)
            .map_err(|e| FetchError::transport(url.as_str(), format!("invalid redirect: {}", e)))?;

        debug!(from = %url, to = %redirected, "Following metadata redirect");
        let response = self
            .api
            .head(redirected.clone())
            .send()
            .map_err(|e| request_error(redirected.as_str(), e))?;
        file_info_from_response(repo, redirected.as_str(), &response)
    }

    /// Stream the file body into the partial file.
    ///
    /// Returns the final partial size and the offset the transfer resumed
    /// from.
    fn stream_download(
        &self,
        repo: &RepositoryRef,
        url: &Url,
        partial: &Path,
        start_byte: u64,
        info: &RemoteFileInfo,
        progress: Option<ProgressCallback>,
    ) -> FetchResult<(u64, u64)> {
        // Build request with optional Range header
        let mut request = self.transfer.get(url.clone());
        if start_byte > 0 {
            request = request.header(RANGE, format!("bytes={}-", start_byte));
        }

        let mut response = request.send().map_err(|e| request_error(url.as_str(), e))?;

        let status = response.status();
        let start_byte = match status {
            StatusCode::PARTIAL_CONTENT if start_byte > 0 => {
                check_content_range(url.as_str(), &response, start_byte)?;
                info!(offset = start_byte, "Resuming partial download");
                start_byte
            }
            StatusCode::OK => {
                if start_byte > 0 {
                    warn!("Server ignored the range request, restarting download");
                }
                0
            }
            _ => return Err(file_status_error(repo, url.as_str(), "GET", status)),
        };

        let file = if start_byte > 0 {
            OpenOptions::new().append(true).open(partial)
        } else {
            File::create(partial)
        }
        .map_err(|e| FetchError::filesystem(partial, e))?;

        // Stream to file
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = start_byte;

        loop {
            let bytes_read = match response.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Keep what was written so the next run can resume
                    writer.flush().ok();
                    return Err(FetchError::transport(url.as_str(), format!("read error: {}", e)));
                }
            };

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| FetchError::filesystem(partial, e))?;

            downloaded += bytes_read as u64;

            if let Some(ref cb) = progress {
                cb(downloaded, info.size);
            }
        }

        writer
            .into_inner()
            .map_err(|e| FetchError::filesystem(partial, e.into_error()))?
            .sync_all()
            .map_err(|e| FetchError::filesystem(partial, e))?;

        Ok((downloaded, start_byte))
    }
}

impl ArtifactFetcher for HubClient {
    fn fetch(
        &self,
        repo: &RepositoryRef,
        filename: &str,
        destination_dir: &Path,
    ) -> FetchResult<FetchedArtifact> {
        self.download_with_resume(repo, filename, destination_dir, None)
    }

    fn fetch_with_progress(
        &self,
        repo: &RepositoryRef,
        filename: &str,
        destination_dir: &Path,
        on_progress: ProgressCallback,
    ) -> FetchResult<FetchedArtifact> {
        self.download_with_resume(repo, filename, destination_dir, Some(on_progress))
    }
}

fn file_info_from_response(
    repo: &RepositoryRef,
    url: &str,
    response: &Response,
) -> FetchResult<RemoteFileInfo> {
    let status = response.status();
    if !status.is_success() {
        return Err(file_status_error(repo, url, "HEAD", status));
    }
    Ok(RemoteFileInfo::from_headers(response.headers()))
}

/// Map a failed file request to the error taxonomy.
///
/// The hub answers 401 or 403 for private and gated repositories, which
/// a token can fix; everything else is a transport failure.
fn file_status_error(
    repo: &RepositoryRef,
    url: &str,
    method: &str,
    status: StatusCode,
) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::RepositoryNotFound {
            repo: repo.to_string(),
        },
        StatusCode::NOT_FOUND => {
            FetchError::transport(url, "file not found in repository (HTTP 404)")
        }
        _ => FetchError::transport(
            url,
            format!("{} request failed with status {}", method, status),
        ),
    }
}

/// A 206 response must continue exactly where the partial file ends.
fn check_content_range(url: &str, response: &Response, start_byte: u64) -> FetchResult<()> {
    let Some(range) = header_str(response.headers(), CONTENT_RANGE.as_str()) else {
        return Ok(());
    };

    let expected = format!("bytes {}-", start_byte);
    if range.starts_with(&expected) {
        Ok(())
    } else {
        Err(FetchError::transport(
            url,
            format!("unexpected content range '{}', wanted '{}'", range, expected),
        ))
    }
}

/// Local path for a remote filename, keeping its relative directories.
///
/// Rejects names that would land outside the destination directory.
fn target_path(destination_dir: &Path, filename: &str) -> FetchResult<PathBuf> {
    let relative = Path::new(filename);
    let contained = !filename.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if !contained {
        return Err(FetchError::filesystem(
            destination_dir.join(filename),
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "remote filename escapes the destination directory",
            ),
        ));
    }

    Ok(destination_dir.join(relative))
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

fn file_len(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Check whether the target is already complete.
///
/// Completion needs a known size; when the hub advertises a checksum the
/// existing file must match it too.
fn check_existing_download(
    target: &Path,
    partial: &Path,
    info: &RemoteFileInfo,
    progress: Option<&ProgressCallback>,
) -> FetchResult<Option<FetchedArtifact>> {
    let existing_size = match file_len(target) {
        Some(size) => size,
        None => return Ok(None),
    };

    if info.size == 0 || existing_size != info.size {
        return Ok(None);
    }

    if let Some(ref expected) = info.sha256 {
        let actual = calculate_file_checksum(target)?;
        if &actual != expected {
            warn!(
                path = %target.display(),
                "Existing file does not match remote checksum, downloading again"
            );
            return Ok(None);
        }
    }

    // A stale partial next to a complete file is never needed again
    if file_len(partial).is_some() {
        fs::remove_file(partial).ok();
    }

    if let Some(cb) = progress {
        cb(info.size, info.size);
    }

    Ok(Some(FetchedArtifact {
        path: target.to_path_buf(),
        bytes: existing_size,
        resumed_from: 0,
        already_complete: true,
    }))
}

/// Create the destination directories and decide where to start.
fn prepare_destination(
    destination_dir: &Path,
    target: &Path,
    partial: &Path,
    info: &RemoteFileInfo,
) -> FetchResult<u64> {
    fs::create_dir_all(destination_dir).map_err(|e| FetchError::filesystem(destination_dir, e))?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| FetchError::filesystem(parent, e))?;
    }

    // Resuming needs a known size and a checksum to vouch for the spliced file
    let existing_size = file_len(partial).unwrap_or(0);
    let resumable = info.size > 0 && info.sha256.is_some();
    if existing_size > 0 && resumable && existing_size < info.size {
        return Ok(existing_size);
    }

    if existing_size > 0 {
        debug!(
            path = %partial.display(),
            existing_size,
            expected = info.size,
            "Discarding partial file that cannot be resumed"
        );
    }
    Ok(0)
}

/// Compare the finished partial file against the advertised size and hash.
///
/// A short partial is kept for the next run; anything else that fails is
/// removed.
fn verify_download(
    filename: &str,
    partial: &Path,
    written: u64,
    info: &RemoteFileInfo,
) -> FetchResult<()> {
    if info.size > 0 && written != info.size {
        if written > info.size {
            fs::remove_file(partial).ok();
        }
        return Err(FetchError::Integrity {
            filename: filename.to_string(),
            failure: IntegrityFailure::SizeMismatch {
                expected: info.size,
                actual: written,
            },
        });
    }

    if let Some(ref expected) = info.sha256 {
        let actual = calculate_file_checksum(partial)?;
        if &actual != expected {
            fs::remove_file(partial).ok();
            return Err(FetchError::Integrity {
                filename: filename.to_string(),
                failure: IntegrityFailure::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                },
            });
        }
    }

    Ok(())
}
