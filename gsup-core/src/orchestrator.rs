//! Session orchestration for tool bootstrap and uploads.
//!
//! The orchestrator owns the startup configuration, the explicit search
//! path and the lifecycle state of at most one live upload. It enforces
//! the guards the subsystems themselves do not: a second upload cannot
//! start while one is active, and an install cannot run while an upload
//! is in flight.
//!
//! Every failure is returned as a value. The frontend's top-level handler
//! alone decides whether to terminate the process.

use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Error;
use crate::gsutil::installer::{self, InstallLayout};
use crate::gsutil::locator::{self, SearchPath};
use crate::upload::process::{self, EventReceiver, ProcessState, UploadEvent};
use crate::upload::request::{UploadRequest, Visibility};

/// Single-owner session over the bootstrap and upload subsystems.
pub struct Orchestrator {
    config: Config,
    search_path: SearchPath,
    state: ProcessState,
    upload_task: Option<JoinHandle<()>>,
}

impl Orchestrator {
    /// Creates a session from the startup configuration, capturing the
    /// process `PATH` as the initial search path.
    pub fn new(config: Config) -> Self {
        Self::with_search_path(config, SearchPath::from_env())
    }

    /// Creates a session with an explicit search path (for testing).
    pub fn with_search_path(config: Config, search_path: SearchPath) -> Self {
        Self {
            config,
            search_path,
            state: ProcessState::Idle,
            upload_task: None,
        }
    }

    /// The bucket uploads are sent to.
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Current lifecycle state of the session's upload slot.
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// True while the session still holds a live upload task handle.
    pub fn has_live_upload(&self) -> bool {
        self.upload_task.is_some()
    }

    // ========================================================================
    // Tool Bootstrap
    // ========================================================================

    /// Probes for the gsutil executable on the session's search path.
    pub fn tool_available(&self) -> bool {
        locator::check_available(&self.search_path)
    }

    /// Installs gsutil after the caller has obtained user consent.
    ///
    /// On success the installed bin directory is pushed onto the session's
    /// search path, so [`Orchestrator::tool_available`] succeeds without a
    /// restart. Rejected while an upload is in flight.
    pub async fn install_tool(&mut self) -> Result<(), Error> {
        let layout = InstallLayout::resolve()?;
        self.install_tool_with_layout(&layout).await
    }

    /// Installs gsutil using an explicit layout (for testing).
    pub async fn install_tool_with_layout(&mut self, layout: &InstallLayout) -> Result<(), Error> {
        if self.state.is_active() {
            return Err(Error::InstallWhileUploading);
        }

        let installed = installer::install_with_layout(layout).await?;
        info!(bin_dir = %installed.bin_dir.display(), "Extending search path");
        self.search_path.push_dir(installed.bin_dir);
        Ok(())
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    /// Starts an upload of `local_path` to the configured bucket.
    ///
    /// Returns the event receiver for the new upload, or `Ok(None)` when
    /// the request is an empty-path no-op. Returns
    /// `Error::UploadInProgress` while another upload is active: one
    /// session owns at most one live upload.
    pub fn start_upload(
        &mut self,
        local_path: &Path,
        visibility: Visibility,
    ) -> Result<Option<EventReceiver>, Error> {
        if self.state.is_active() {
            return Err(Error::UploadInProgress);
        }

        let request = UploadRequest::new(local_path, self.config.bucket.clone(), visibility);
        if request.is_empty() {
            debug!("Ignoring upload request with empty local path");
            return Ok(None);
        }

        self.state = ProcessState::Starting;
        let (tx, rx) = process::event_channel();
        self.upload_task = process::start_upload(&request, &self.search_path, &tx);
        Ok(Some(rx))
    }

    /// Advances the session state with an event relayed from the upload.
    ///
    /// The frontend calls this for every event it receives before
    /// rendering it; a terminal event releases the upload slot's guard
    /// (the session itself stays in the terminal state).
    pub fn observe(&mut self, event: &UploadEvent) {
        self.state = self.state.apply(event);
        if self.state.is_terminal() {
            self.upload_task = None;
        }
    }
}
