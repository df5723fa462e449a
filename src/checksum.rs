//! Archive integrity verification.
//!
//! A formula's checksum corresponds to exactly one immutable artifact.
//! Downloaded bytes must hash to that value exactly or the install
//! aborts before the archive is ever extracted.

use anyhow::{Context, Result};
use log::debug;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::runtime::Runtime;

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large archives.
#[tracing::instrument(skip(runtime, path))]
pub fn sha256_file<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let mut reader = runtime
        .open(path)
        .with_context(|| format!("Failed to open {:?} for hashing", path))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("Failed to read {:?} while hashing", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Integrity failure: the downloaded artifact does not match the
/// formula's declared checksum.
#[derive(Debug, PartialEq)]
pub struct ChecksumMismatch {
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checksum mismatch: expected sha256 {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for ChecksumMismatch {}

/// Verify a file's SHA-256 against the expected hex digest. Comparison is
/// case-insensitive; the caller owns cleanup of the rejected file.
#[tracing::instrument(skip(runtime, path, expected))]
pub fn verify_file<R: Runtime>(runtime: &R, path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(runtime, path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ChecksumMismatch {
            expected: expected.to_ascii_lowercase(),
            actual,
        }
        .into());
    }
    debug!("Checksum verified for {:?}", path);
    Ok(())
}
