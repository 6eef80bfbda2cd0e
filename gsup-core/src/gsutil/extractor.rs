//! Extraction of the gsutil tar.gz archive.
//!
//! The release tarball carries a top-level `gsutil/` directory, so
//! extracting into the user's home yields `~/gsutil/`. Entries that could
//! escape the destination (absolute paths, `..` components, symlinks,
//! hardlinks) are skipped.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// Archive Extraction
// ============================================================================

/// Extracts a gzip-compressed tar archive into a destination directory.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or an entry cannot be
/// written.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    info!(
        "Extracting {} to {}",
        archive_path.display(),
        dest_dir.display()
    );

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open tar.gz: {}", archive_path.display()))?;

    let reader = BufReader::new(file);
    let decoder = flate2::read::GzDecoder::new(reader);
    extract_tar(decoder, dest_dir)
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let dest_dir_canonical = dest_dir
        .canonicalize()
        .unwrap_or_else(|_| dest_dir.to_path_buf());

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_type = entry.header().entry_type();

        // Security: skip symlinks and hardlinks entirely to prevent escape attacks
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            warn!("Skipping symlink/hardlink in tar archive (security)");
            continue;
        }

        let path = entry.path()?;

        // Security: skip absolute paths and paths with ..
        if path.is_absolute()
            || path
                .components()
                .any(|c| c == std::path::Component::ParentDir)
        {
            warn!("Skipping unsafe path in tar: {:?}", path);
            continue;
        }

        let dest_path = dest_dir.join(&path);

        // Security: verify destination stays within dest_dir
        let dest_canonical = if dest_path.exists() {
            dest_path.canonicalize()?
        } else if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
            let parent_canonical = parent.canonicalize()?;
            parent_canonical.join(dest_path.file_name().unwrap_or_default())
        } else {
            dest_path.clone()
        };

        if !dest_canonical.starts_with(&dest_dir_canonical) {
            warn!(
                "Skipping path that escapes dest_dir: {:?} -> {:?}",
                path, dest_canonical
            );
            continue;
        }

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;
            io::copy(&mut entry, &mut outfile)?;
            outfile.flush()?;

            #[cfg(unix)]
            {
                if let Ok(mode) = entry.header().mode() {
                    set_unix_permissions(&dest_path, Some(mode))?;
                }
            }
        }
    }

    debug!("TAR extraction complete");
    Ok(())
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode(mode | 0o755);
            fs::set_permissions(path, permissions)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
    }

    Ok(())
}

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for {}", path.display()))?;

        let mut permissions = metadata.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);

        fs::set_permissions(path, permissions).with_context(|| {
            format!("Failed to set executable permission on {}", path.display())
        })?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}
