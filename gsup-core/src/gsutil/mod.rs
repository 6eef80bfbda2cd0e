//! Bootstrap of the external gsutil tool.
//!
//! This module covers everything needed to get a working `gsutil` binary:
//!
//! - `locator`: presence probe against an explicit search path
//! - `installer`: download, extract and link chain for missing installs
//! - `downloader`: streaming archive download with URL and checksum checks
//! - `extractor`: tar.gz extraction with path-escape hardening
//! - `paths`: install layout resolution (temp, home, bin)
//!
//! # Example
//!
//! ```ignore
//! use gsup_core::gsutil::{self, SearchPath};
//!
//! let mut search_path = SearchPath::from_env();
//! if !gsutil::check_available(&search_path) {
//!     // after user consent:
//!     let installed = gsutil::install().await?;
//!     search_path.push_dir(installed.bin_dir);
//!     assert!(gsutil::check_available(&search_path));
//! }
//! ```

pub mod downloader;
pub mod extractor;
pub mod installer;
pub mod locator;
pub mod paths;

// Re-export commonly used items
pub use downloader::{download_file, GSUTIL_ARCHIVE_URL};
pub use extractor::{extract_tar_gz, make_executable};
pub use installer::{install, install_with_layout, InstallLayout, InstallStage, Installed};
pub use locator::{check_available, check_tool_available, resolve, SearchPath};
pub use paths::TOOL_NAME;
