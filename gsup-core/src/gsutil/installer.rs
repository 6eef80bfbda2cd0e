//! On-demand installation of the gsutil tool.
//!
//! The install is a strictly sequential, fail-fast chain of three steps:
//! download the release archive, extract it into the home directory, link
//! the executable into `~/bin`. A failing step aborts the chain; later
//! steps are never attempted. The chain runs at most once per session and
//! only after the caller has obtained explicit user consent.
//!
//! On success the installer hands back the bin directory as an explicit
//! value. The caller threads it into its search path; the real process
//! environment is never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::downloader::{download_file, GSUTIL_ARCHIVE_URL};
use super::extractor::{extract_tar_gz, make_executable};
use super::locator::dir_contains_tool;
use super::paths;
use crate::error::Error;

// ============================================================================
// Install Stages
// ============================================================================

/// The step of the install chain a failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStage {
    Download,
    Extract,
    Link,
}

impl InstallStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Install Layout
// ============================================================================

/// Filesystem layout an install operates on.
///
/// Production installs use [`InstallLayout::resolve`]; tests substitute a
/// scratch layout so no real home directory is touched.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    /// URL of the release archive.
    pub archive_url: String,
    /// Expected SHA-256 of the archive, if pinned.
    pub expected_sha256: Option<String>,
    /// Download destination for the archive.
    pub archive_path: PathBuf,
    /// Directory the archive is extracted into.
    pub extract_dir: PathBuf,
    /// Path of the executable inside the extracted tree.
    pub extracted_executable: PathBuf,
    /// Bin directory the executable is linked into.
    pub bin_dir: PathBuf,
}

impl InstallLayout {
    /// Resolves the standard layout under the user's home directory.
    pub fn resolve() -> Result<Self, Error> {
        let resolve_inner = || -> anyhow::Result<Self> {
            Ok(Self {
                archive_url: GSUTIL_ARCHIVE_URL.to_string(),
                // The published gsutil tarball carries no release checksum.
                expected_sha256: None,
                archive_path: paths::get_archive_path(),
                extract_dir: paths::get_extract_dir()?,
                extracted_executable: paths::get_extracted_executable()?,
                bin_dir: paths::get_bin_dir()?,
            })
        };

        resolve_inner().map_err(|e| Error::InstallFailed {
            stage: InstallStage::Download,
            output: format!("{:#}", e),
        })
    }
}

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct Installed {
    /// Directory that now contains the gsutil executable. Push this onto
    /// the session's search path so subsequent probes and uploads succeed
    /// without a restart.
    pub bin_dir: PathBuf,
}

// ============================================================================
// Install Chain
// ============================================================================

/// Installs gsutil using the standard home-directory layout.
pub async fn install() -> Result<Installed, Error> {
    install_with_layout(&InstallLayout::resolve()?).await
}

/// Installs gsutil using an explicit layout.
///
/// Fail-fast: the first failing step aborts the chain with
/// `Error::InstallFailed` naming the stage and carrying the captured
/// diagnostic output.
pub async fn install_with_layout(layout: &InstallLayout) -> Result<Installed, Error> {
    info!(url = %layout.archive_url, "Installing gsutil");

    // Step 1: download the archive.
    download_file(
        &layout.archive_url,
        &layout.archive_path,
        layout.expected_sha256.as_deref(),
    )
    .await
    .map_err(|e| stage_failure(InstallStage::Download, e))?;
    debug!("Download step complete");

    // Step 2: extract into the home directory.
    extract_tar_gz(&layout.archive_path, &layout.extract_dir)
        .map_err(|e| stage_failure(InstallStage::Extract, e))?;
    debug!("Extract step complete");

    // Step 3: link the executable into the bin directory.
    link_executable(&layout.extracted_executable, &layout.bin_dir)
        .map_err(|e| stage_failure(InstallStage::Link, e))?;
    debug!("Link step complete");

    info!(bin_dir = %layout.bin_dir.display(), "gsutil installed");
    Ok(Installed {
        bin_dir: layout.bin_dir.clone(),
    })
}

fn stage_failure(stage: InstallStage, e: anyhow::Error) -> Error {
    Error::InstallFailed {
        stage,
        output: format!("{:#}", e),
    }
}

// ============================================================================
// Link Step
// ============================================================================

/// Links the extracted executable into the bin directory, replacing any
/// existing entry (the behaviour of `ln -sf`).
fn link_executable(executable: &Path, bin_dir: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    if !executable.exists() {
        anyhow::bail!(
            "Extracted executable not found at {}",
            executable.display()
        );
    }

    make_executable(executable)?;

    std::fs::create_dir_all(bin_dir)
        .with_context(|| format!("Failed to create bin dir: {}", bin_dir.display()))?;

    let link_path = bin_dir.join(paths::TOOL_NAME);
    if link_path.symlink_metadata().is_ok() {
        std::fs::remove_file(&link_path)
            .with_context(|| format!("Failed to replace existing link: {}", link_path.display()))?;
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(executable, &link_path).with_context(|| {
        format!(
            "Failed to link {} -> {}",
            link_path.display(),
            executable.display()
        )
    })?;

    #[cfg(not(unix))]
    std::fs::copy(executable, &link_path).with_context(|| {
        format!(
            "Failed to copy {} -> {}",
            executable.display(),
            link_path.display()
        )
    })?;

    if !dir_contains_tool(bin_dir) {
        anyhow::bail!("Link created but {} is still empty", bin_dir.display());
    }

    Ok(())
}
