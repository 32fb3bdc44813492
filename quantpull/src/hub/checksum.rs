//! SHA-256 checksums for downloaded artifacts.
//!
//! The hub advertises the SHA-256 of LFS-stored files as their linked etag;
//! this module hashes local files to compare against it.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{FetchError, FetchResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the SHA-256 checksum of a file.
///
/// # Returns
///
/// The lowercase hexadecimal SHA-256 hash of the file contents.
///
/// # Errors
///
/// Returns [`FetchError::Filesystem`] if the file cannot be read.
pub fn calculate_file_checksum(path: &Path) -> FetchResult<String> {
    let mut file = File::open(path).map_err(|e| FetchError::filesystem(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| FetchError::filesystem(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Interpret an etag as a SHA-256 digest.
///
/// Returns the lowercase digest when the etag (quotes and weak prefix
/// removed) is 64 hex characters, `None` otherwise. Git blob etags are 40
/// characters and are not content hashes.
pub(crate) fn sha256_from_etag(etag: &str) -> Option<String> {
    let etag = etag.trim();
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    let etag = etag.trim_matches('"');

    (etag.len() == 64 && etag.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| etag.to_ascii_lowercase())
}
