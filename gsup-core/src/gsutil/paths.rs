//! Path resolution for the gsutil installation.
//!
//! The install layout follows the stock gsutil tarball:
//!
//! - archive download: `{temp}/gsup/gsutil.tar.gz`
//! - extracted tree:   `~/gsutil/`
//! - executable:       `~/gsutil/gsutil`
//! - symlink:          `~/bin/gsutil`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Subdirectory name under the OS temp folder for downloads.
const GSUP_TEMP_DIR: &str = "gsup";

/// Name of the gsutil executable.
pub const TOOL_NAME: &str = "gsutil";

// ============================================================================
// Path Resolution
// ============================================================================

/// Returns the base gsup directory inside the OS temp folder.
///
/// e.g., `/tmp/gsup/` on Linux
pub fn get_temp_dir() -> PathBuf {
    std::env::temp_dir().join(GSUP_TEMP_DIR)
}

/// Returns the download destination for the gsutil archive.
///
/// Path: `{temp}/gsup/gsutil.tar.gz`
pub fn get_archive_path() -> PathBuf {
    get_temp_dir().join("gsutil.tar.gz")
}

/// Returns the user's home directory.
///
/// # Errors
///
/// Returns an error when the home directory cannot be determined.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine the user's home directory")
}

/// Returns the directory the archive is extracted into (the home directory).
///
/// The gsutil tarball carries a top-level `gsutil/` folder, so extraction
/// into `~` yields `~/gsutil/`.
pub fn get_extract_dir() -> Result<PathBuf> {
    get_home_dir()
}

/// Returns the path to the extracted gsutil executable.
///
/// Path: `~/gsutil/gsutil`
pub fn get_extracted_executable() -> Result<PathBuf> {
    Ok(get_home_dir()?.join(TOOL_NAME).join(TOOL_NAME))
}

/// Returns the per-user bin directory the executable is linked into.
///
/// Path: `~/bin/`
pub fn get_bin_dir() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("bin"))
}

/// Returns the symlink path inside the bin directory.
///
/// Path: `~/bin/gsutil`
pub fn get_link_path() -> Result<PathBuf> {
    Ok(get_bin_dir()?.join(TOOL_NAME))
}

/// Ensures the temp download directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_temp_dir_exists() -> Result<()> {
    let dir = get_temp_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    Ok(())
}
