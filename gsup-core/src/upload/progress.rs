//! Presentation adapter from upload events to status notifications.
//!
//! The wrapped tool reports no byte-level progress, only line-oriented
//! text, so the only "progress" the system offers is the mapping defined
//! here: indeterminate while the upload runs, determinate idle once it
//! reaches its terminal outcome. No business logic lives in this module.

use super::process::{UploadEvent, UploadOutcome};

// ============================================================================
// Progress Updates
// ============================================================================

/// A single status/progress notification for a consumer to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// True while the upload is underway and no completion fraction is
    /// known (render a spinner/busy indicator); false once the outcome
    /// is terminal (render an idle indicator).
    pub indeterminate: bool,
    /// Human-readable status line.
    pub message: String,
    /// Number of output lines seen so far by this reporter instance.
    pub lines_seen: u64,
}

// ============================================================================
// Progress Reporter
// ============================================================================

/// Translates the lifecycle events of one upload into progress updates.
///
/// One reporter serves one upload instance; the line counter is owned
/// here rather than in any shared state.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    lines_seen: u64,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an upload event to the notification a consumer should render.
    pub fn on_event(&mut self, event: &UploadEvent) -> ProgressUpdate {
        match event {
            UploadEvent::Started => ProgressUpdate {
                indeterminate: true,
                message: "Starting upload".to_string(),
                lines_seen: self.lines_seen,
            },
            UploadEvent::Line(line) => {
                self.lines_seen += 1;
                ProgressUpdate {
                    indeterminate: true,
                    message: format!("Uploading..... {}", line),
                    lines_seen: self.lines_seen,
                }
            }
            UploadEvent::Finished(outcome) => ProgressUpdate {
                indeterminate: false,
                message: final_message(outcome),
                lines_seen: self.lines_seen,
            },
        }
    }
}

fn final_message(outcome: &UploadOutcome) -> String {
    match outcome {
        UploadOutcome::Succeeded { public_link } => match public_link {
            Some(link) => format!("Finished uploading. {}", link),
            None => "Finished uploading.".to_string(),
        },
        UploadOutcome::Failed { exit_code, .. } => {
            format!("Upload failed (exit code {})", exit_code)
        }
    }
}
