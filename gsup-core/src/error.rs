//! Error taxonomy for the upload orchestration core.
//!
//! Every failure is surfaced as a value; nothing in this crate terminates
//! the process. The frontend's top-level handler decides whether an error
//! is fatal and which exit code to use.

use thiserror::Error;

use crate::gsutil::installer::InstallStage;

/// Exit code used by the frontend for any fatal configuration,
/// installation or upload error.
pub const FATAL_EXIT_CODE: u8 = 111;

/// Errors that can occur during tool bootstrap and upload orchestration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("DEFAULTBUCKET environment variable is not set")]
    ConfigMissing,

    #[error("gsutil was not found on the search path")]
    ToolNotFound,

    #[error("gsutil installation was declined")]
    InstallDeclined,

    #[error("gsutil installation failed during {stage}: {output}")]
    InstallFailed {
        stage: InstallStage,
        /// Combined diagnostic output captured from the failed step.
        output: String,
    },

    #[error("an upload is already in progress")]
    UploadInProgress,

    #[error("an install cannot run while an upload is in progress")]
    InstallWhileUploading,

    #[error("could not spawn the upload process: {0}")]
    ProcessSpawnFailed(String),

    #[error("upload exited with code {code}")]
    UploadNonZeroExit { code: i32 },
}

impl Error {
    /// Returns true if the frontend should terminate rather than return
    /// to an interactive state after this error.
    pub fn is_fatal(&self) -> bool {
        // Every failure ends the current run; retrying requires a relaunch.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_failed_message_names_stage() {
        let err = Error::InstallFailed {
            stage: InstallStage::Download,
            output: "404 Not Found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("download"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_all_errors_are_fatal() {
        assert!(Error::ConfigMissing.is_fatal());
        assert!(Error::ToolNotFound.is_fatal());
        assert!(Error::InstallDeclined.is_fatal());
        assert!(Error::UploadInProgress.is_fatal());
        assert!(Error::UploadNonZeroExit { code: 42 }.is_fatal());
    }
}
