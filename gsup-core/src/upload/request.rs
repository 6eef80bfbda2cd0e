//! Upload request and the values derived from it.
//!
//! A request pairs the chosen local file with the configured bucket and
//! the desired visibility. The remote URI and the public link are derived
//! from those inputs whenever asked for; they are never stored or mutated
//! independently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// URI scheme of the remote object store.
pub const REMOTE_SCHEME: &str = "gs";

/// Base URL public objects are served from.
pub const PUBLIC_URL_BASE: &str = "https://storage.googleapis.com";

// ============================================================================
// Visibility
// ============================================================================

/// Readability of the uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone with the link can read the object.
    Public,
    /// Only authorised accounts can read the object.
    #[default]
    Private,
}

impl Visibility {
    /// Returns the ACL flag passed to `gsutil cp -a`.
    ///
    /// The mapping is total: every visibility has exactly one flag.
    pub fn acl_flag(&self) -> &'static str {
        match self {
            Self::Public => "public-read",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.acl_flag())
    }
}

// ============================================================================
// Remote URI
// ============================================================================

/// Fully qualified destination address for an upload.
///
/// Always `gs://{bucket}/{basename(local_path)}`; only the file name of
/// the local path contributes, its directory does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUri(String);

impl RemoteUri {
    /// Derives the remote URI from a bucket and a local path.
    pub fn derive(bucket: &str, local_path: &Path) -> Self {
        let basename = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self(format!("{}://{}/{}", REMOTE_SCHEME, bucket, basename))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Upload Request
// ============================================================================

/// A single upload: local file, target bucket, visibility.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Path of the file to upload. Must reference an existing regular file.
    pub local_path: PathBuf,
    /// Target bucket; fixed for the process lifetime.
    pub bucket: String,
    /// Readability of the uploaded object.
    pub visibility: Visibility,
}

impl UploadRequest {
    pub fn new(local_path: impl Into<PathBuf>, bucket: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            local_path: local_path.into(),
            bucket: bucket.into(),
            visibility,
        }
    }

    /// Returns true when the local path is empty.
    ///
    /// An empty path makes the request a no-op; the process layer rejects
    /// it before any spawn.
    pub fn is_empty(&self) -> bool {
        self.local_path.as_os_str().is_empty()
    }

    /// Returns true when the local path names an existing regular file.
    pub fn references_regular_file(&self) -> bool {
        self.local_path.is_file()
    }

    /// Derives the remote URI for this request.
    pub fn remote_uri(&self) -> RemoteUri {
        RemoteUri::derive(&self.bucket, &self.local_path)
    }

    /// Derives the public link for this request.
    ///
    /// Only meaningful for public uploads; private uploads have no link.
    pub fn public_link(&self) -> Option<String> {
        match self.visibility {
            Visibility::Public => {
                let basename = self
                    .local_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Some(format!("{}/{}/{}", PUBLIC_URL_BASE, self.bucket, basename))
            }
            Visibility::Private => None,
        }
    }
}
