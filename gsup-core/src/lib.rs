//! gsup Core Library
//!
//! This crate provides the core functionality for gsup, a small uploader
//! that copies local files into a Google Cloud Storage bucket via the
//! external `gsutil` tool. It includes:
//!
//! - Presence probing for the gsutil executable
//! - On-demand installation (download, extract, link, search-path update)
//! - Asynchronous upload subprocess with streamed lifecycle events
//! - Progress mapping for frontends to render
//! - A session orchestrator enforcing the single-upload guard
//!
//! Frontends (the CLI, originally a GUI) are external collaborators: they
//! call into this crate and render its events. Nothing here renders UI or
//! terminates the process.

pub mod config;
pub mod error;
pub mod gsutil;
pub mod orchestrator;
pub mod upload;

// Re-exports for convenience
pub use config::{Config, BUCKET_ENV_VAR};
pub use error::{Error, FATAL_EXIT_CODE};
pub use orchestrator::Orchestrator;

// Re-export tool bootstrap
pub use gsutil::{
    check_available, install, InstallLayout, InstallStage, Installed, SearchPath, TOOL_NAME,
};

// Re-export upload pipeline
pub use upload::{
    event_channel, start_upload, EventReceiver, EventSender, ProcessState, ProgressReporter,
    ProgressUpdate, RemoteUri, UploadEvent, UploadOutcome, UploadRequest, Visibility,
    SPAWN_FAILURE_CODE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
