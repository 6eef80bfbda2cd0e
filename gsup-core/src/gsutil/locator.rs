//! Presence probe for the gsutil executable.
//!
//! The probe runs against an explicit [`SearchPath`] value instead of the
//! real process environment. The installer returns the directory it linked
//! the tool into, the caller pushes it here, and subsequent probes succeed
//! within the same run without mutating `PATH` and without a restart.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::paths::TOOL_NAME;

// ============================================================================
// Search Path
// ============================================================================

/// An explicit executable search path.
///
/// Captures the process `PATH` once at construction; extra directories are
/// prepended with [`SearchPath::push_dir`] so freshly installed tools win
/// over stale system copies.
#[derive(Debug, Clone)]
pub struct SearchPath {
    base: String,
    extra_dirs: Vec<PathBuf>,
}

/// Returns the PATH separator for the current platform.
#[inline]
fn path_separator() -> &'static str {
    #[cfg(windows)]
    {
        ";"
    }
    #[cfg(not(windows))]
    {
        ":"
    }
}

impl SearchPath {
    /// Captures the current process `PATH`.
    pub fn from_env() -> Self {
        Self {
            base: std::env::var("PATH").unwrap_or_default(),
            extra_dirs: Vec::new(),
        }
    }

    /// Builds a search path from an explicit base value (for testing).
    pub fn from_value(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            extra_dirs: Vec::new(),
        }
    }

    /// Prepends a directory to the search path.
    pub fn push_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.extra_dirs.contains(&dir) {
            self.extra_dirs.push(dir);
        }
    }

    /// Returns the joined search path suitable for a `PATH` value.
    ///
    /// Extra directories come first, in the order they were pushed.
    pub fn joined(&self) -> String {
        let sep = path_separator();
        let extra: Vec<String> = self
            .extra_dirs
            .iter()
            .filter_map(|p| p.to_str().map(|s| s.to_string()))
            .collect();

        if extra.is_empty() {
            return self.base.clone();
        }

        let extra_joined = extra.join(sep);
        if self.base.is_empty() {
            extra_joined
        } else {
            format!("{}{}{}", extra_joined, sep, self.base)
        }
    }
}

// ============================================================================
// Presence Probe
// ============================================================================

/// Checks whether the gsutil executable is reachable on the search path.
pub fn check_available(search_path: &SearchPath) -> bool {
    check_tool_available(TOOL_NAME, search_path)
}

/// Checks whether a named executable is reachable on the search path.
///
/// Returns true iff the probe resolves the name to an executable file. A
/// probe that fails for any other reason (permission error, unreadable
/// directory) is folded into `false`; absence and probe failure are not
/// distinguished, and the negative result routes to the install flow.
pub fn check_tool_available(tool: &str, search_path: &SearchPath) -> bool {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match which::which_in(tool, Some(search_path.joined()), cwd) {
        Ok(path) => {
            debug!(tool, path = %path.display(), "Probe resolved executable");
            true
        }
        Err(e) => {
            debug!(tool, error = %e, "Probe did not resolve executable");
            false
        }
    }
}

/// Resolves the full path of the gsutil executable, if reachable.
pub fn resolve(search_path: &SearchPath) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(TOOL_NAME, Some(search_path.joined()), cwd).ok()
}

/// Returns true if `dir` contains an entry named after the tool.
///
/// Cheaper than a full probe; used by the installer to sanity-check the
/// link step.
pub fn dir_contains_tool(dir: &Path) -> bool {
    dir.join(TOOL_NAME).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_joined_empty_extra_is_base() {
        let sp = SearchPath::from_value("/usr/bin:/bin");
        assert_eq!(sp.joined(), "/usr/bin:/bin");
    }

    #[cfg(unix)]
    #[test]
    fn test_joined_prepends_extra_dirs() {
        let mut sp = SearchPath::from_value("/usr/bin");
        sp.push_dir("/opt/tools");
        assert_eq!(sp.joined(), "/opt/tools:/usr/bin");
    }

    #[test]
    fn test_push_dir_deduplicates() {
        let mut sp = SearchPath::from_value("");
        sp.push_dir("/opt/tools");
        sp.push_dir("/opt/tools");
        assert_eq!(sp.extra_dirs.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_check_available_false_when_absent() {
        let temp = TempDir::new().unwrap();
        let sp = SearchPath::from_value(temp.path().to_str().unwrap());
        assert!(!check_available(&sp));
    }

    #[cfg(unix)]
    #[test]
    fn test_check_available_true_when_present() {
        let temp = TempDir::new().unwrap();
        write_executable(temp.path(), TOOL_NAME);

        let sp = SearchPath::from_value(temp.path().to_str().unwrap());
        assert!(check_available(&sp));
    }

    #[cfg(unix)]
    #[test]
    fn test_push_dir_makes_tool_discoverable() {
        let temp = TempDir::new().unwrap();
        write_executable(temp.path(), TOOL_NAME);

        // Not reachable from an empty base path.
        let mut sp = SearchPath::from_value("");
        assert!(!check_available(&sp));

        // Reachable once the dir is pushed; the real PATH is untouched.
        sp.push_dir(temp.path());
        assert!(check_available(&sp));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_returns_full_path() {
        let temp = TempDir::new().unwrap();
        let expected = write_executable(temp.path(), TOOL_NAME);

        let sp = SearchPath::from_value(temp.path().to_str().unwrap());
        let resolved = resolve(&sp).unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_dir_contains_tool() {
        let temp = TempDir::new().unwrap();
        assert!(!dir_contains_tool(temp.path()));
        fs::write(temp.path().join(TOOL_NAME), "").unwrap();
        assert!(dir_contains_tool(temp.path()));
    }
}
