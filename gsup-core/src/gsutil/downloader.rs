//! Streaming download of the gsutil release archive.
//!
//! Downloads are validated before any network activity (HTTPS only, host
//! pinned to the release domain) and may be verified against an expected
//! SHA-256 after the stream completes.

use anyhow::{Context, Result};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// Fixed URL of the gsutil release archive.
pub const GSUTIL_ARCHIVE_URL: &str = "https://storage.googleapis.com/pub/gsutil.tar.gz";

/// Hosts the downloader will fetch from.
const ALLOWED_DOMAINS: &[&str] = &["storage.googleapis.com"];

// ============================================================================
// URL Validation
// ============================================================================

/// Validates that a URL is safe to download from.
///
/// The scheme must be HTTPS and the host must match the release domain.
fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL: {}", url_str))?;

    if url.scheme() != "https" {
        anyhow::bail!("URL must use HTTPS: {}", url_str);
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL must have a host: {}", url_str))?;

    let is_allowed = ALLOWED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));

    if !is_allowed {
        anyhow::bail!(
            "Download domain not allowed: {}. Allowed: {:?}",
            host,
            ALLOWED_DOMAINS
        );
    }

    Ok(())
}

// ============================================================================
// Download
// ============================================================================

/// Downloads a file from a URL to a destination path.
///
/// The response body is streamed to disk while a SHA-256 digest is computed
/// on the fly. When `expected_sha256` is given and does not match, the
/// partial file is removed and an error is returned.
///
/// Returns the total number of bytes written.
pub async fn download_file(
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
) -> Result<u64> {
    info!("Downloading {} to {}", url, dest.display());

    validate_url(url)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to start download from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!(
            "Download failed with status {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }

    debug!("Content-Length: {:?}", response.content_length());

    let mut file = File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;
    let mut hasher = Sha256::new();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.with_context(|| "Failed to read chunk from response stream")?;
        hasher.update(&chunk);

        file.write_all(&chunk)
            .await
            .with_context(|| "Failed to write chunk to file")?;

        bytes_downloaded += chunk.len() as u64;
    }

    file.flush().await.context("Failed to flush file")?;

    if let Some(expected) = expected_sha256 {
        let actual_hex = format_sha256_hex(&hasher.finalize());
        if actual_hex != expected.to_lowercase() {
            let _ = tokio::fs::remove_file(dest).await;
            anyhow::bail!(
                "SHA256 checksum mismatch!\nExpected: {}\nActual: {}",
                expected,
                actual_hex
            );
        }
        debug!("SHA256 verified: {}", actual_hex);
    }

    info!(
        "Download complete: {} bytes written to {}",
        bytes_downloaded,
        dest.display()
    );

    Ok(bytes_downloaded)
}

/// Formats a SHA256 hash as lowercase hex.
fn format_sha256_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
