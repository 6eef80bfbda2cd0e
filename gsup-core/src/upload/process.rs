//! Asynchronous upload subprocess with streamed lifecycle events.
//!
//! One upload is one `gsutil cp` invocation. The caller receives a lazy,
//! finite sequence of events on an unbounded channel: `Started` once the
//! child is spawned, a `Line` per output line as it arrives, and exactly
//! one `Finished` carrying the terminal outcome after every line has been
//! delivered. The caller's task is never blocked while the child runs.
//!
//! Once started, an upload runs to completion; there is no cancellation,
//! no timeout and no retry.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::request::UploadRequest;
use crate::gsutil::locator::{resolve, SearchPath};
use crate::gsutil::paths::TOOL_NAME;

/// Sentinel exit code reported when the child could not be spawned at all
/// or terminated without an exit code.
pub const SPAWN_FAILURE_CODE: i32 = -1;

// ============================================================================
// Outcomes and Events
// ============================================================================

/// Terminal result of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The tool exited with code 0.
    Succeeded {
        /// Public URL of the object; `Some` only for public uploads.
        public_link: Option<String>,
    },
    /// The tool exited non-zero, or could not be spawned
    /// (`exit_code == SPAWN_FAILURE_CODE`).
    Failed {
        exit_code: i32,
        /// Combined stdout/stderr captured from the child.
        captured_output: String,
    },
}

/// Lifecycle events emitted by an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// The child process was spawned.
    Started,
    /// One line of combined child output, in stream order.
    Line(String),
    /// The upload reached its terminal outcome. Always the last event.
    Finished(UploadOutcome),
}

/// Sender for upload events.
pub type EventSender = mpsc::UnboundedSender<UploadEvent>;

/// Receiver for upload events.
pub type EventReceiver = mpsc::UnboundedReceiver<UploadEvent>;

/// Create an event channel for streaming upload events.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ============================================================================
// Process State
// ============================================================================

/// Lifecycle of one upload instance.
///
/// `Idle → Starting → Running → {Succeeded | Failed}`, with a direct
/// `Starting → Failed` edge for spawn failure. Terminal states never
/// return to `Idle`; a fresh upload requires a fresh start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessState {
    #[default]
    Idle,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl ProcessState {
    /// Advances the state machine with an observed event.
    pub fn apply(self, event: &UploadEvent) -> Self {
        match (self, event) {
            (Self::Starting, UploadEvent::Started) => Self::Running,
            (Self::Running, UploadEvent::Line(_)) => Self::Running,
            (Self::Running | Self::Starting, UploadEvent::Finished(outcome)) => match outcome {
                UploadOutcome::Succeeded { .. } => Self::Succeeded,
                UploadOutcome::Failed { .. } => Self::Failed,
            },
            // Events arriving in any other state leave it unchanged.
            (state, _) => state,
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true while an upload is underway.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

// ============================================================================
// Command Construction
// ============================================================================

/// Builds the argument vector for the upload invocation:
/// `cp -a {acl} {local_path} {remote_uri}`.
pub fn build_args(request: &UploadRequest) -> Vec<String> {
    vec![
        "cp".to_string(),
        "-a".to_string(),
        request.visibility.acl_flag().to_string(),
        request.local_path.to_string_lossy().into_owned(),
        request.remote_uri().to_string(),
    ]
}

// ============================================================================
// Upload Spawning
// ============================================================================

/// Starts an upload and returns immediately.
///
/// - An empty local path is rejected as a no-op: nothing is spawned, no
///   events are sent, `None` is returned.
/// - A spawn failure (binary missing, permission denied) sends a single
///   `Finished(Failed)` with [`SPAWN_FAILURE_CODE`] and returns `None`;
///   the upload never reaches `Running`.
/// - Otherwise `Started` is sent, a background task streams the child's
///   output onto the channel, and the task handle is returned.
pub fn start_upload(
    request: &UploadRequest,
    search_path: &SearchPath,
    sender: &EventSender,
) -> Option<JoinHandle<()>> {
    if request.is_empty() {
        debug!("Rejecting upload with empty local path");
        return None;
    }

    let args = build_args(request);
    let program = resolve(search_path)
        .unwrap_or_else(|| TOOL_NAME.into());

    info!(program = %program.display(), ?args, "Spawning upload");

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .env("PATH", search_path.joined())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "Could not spawn upload process");
            let _ = sender.send(UploadEvent::Finished(UploadOutcome::Failed {
                exit_code: SPAWN_FAILURE_CODE,
                captured_output: format!("could not start {}: {}", program.display(), e),
            }));
            return None;
        }
    };

    let _ = sender.send(UploadEvent::Started);

    let public_link = request.public_link();
    let sender = sender.clone();

    Some(tokio::spawn(async move {
        let mut captured = String::new();

        let mut stdout_lines = child.stdout.take().map(|s| BufReader::new(s).lines());
        let mut stderr_lines = child.stderr.take().map(|s| BufReader::new(s).lines());

        // Forward lines from both streams as they arrive. Order within a
        // stream is preserved; interleaving between streams is whatever
        // the child produced.
        loop {
            tokio::select! {
                line = next_line(&mut stdout_lines), if stdout_lines.is_some() => {
                    match line {
                        Some(l) => forward_line(&sender, &mut captured, l),
                        None => stdout_lines = None,
                    }
                }
                line = next_line(&mut stderr_lines), if stderr_lines.is_some() => {
                    match line {
                        Some(l) => forward_line(&sender, &mut captured, l),
                        None => stderr_lines = None,
                    }
                }
                else => break,
            }
        }

        let exit_code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(SPAWN_FAILURE_CODE),
            Err(e) => {
                warn!(error = %e, "Failed to await upload process");
                SPAWN_FAILURE_CODE
            }
        };

        let outcome = if exit_code == 0 {
            info!("Upload finished successfully");
            UploadOutcome::Succeeded { public_link }
        } else {
            warn!(exit_code, "Upload failed");
            UploadOutcome::Failed {
                exit_code,
                captured_output: captured,
            }
        };

        let _ = sender.send(UploadEvent::Finished(outcome));
    }))
}

async fn next_line<R>(lines: &mut Option<tokio::io::Lines<BufReader<R>>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}

fn forward_line(sender: &EventSender, captured: &mut String, line: String) {
    captured.push_str(&line);
    captured.push('\n');
    let _ = sender.send(UploadEvent::Line(line));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::request::Visibility;
    use std::path::Path;

    fn request(visibility: Visibility) -> UploadRequest {
        UploadRequest::new("/home/u/photo.png", "mybucket", visibility)
    }

    #[test]
    fn test_build_args_private() {
        let args = build_args(&request(Visibility::Private));
        assert_eq!(
            args,
            vec![
                "cp",
                "-a",
                "private",
                "/home/u/photo.png",
                "gs://mybucket/photo.png"
            ]
        );
    }

    #[test]
    fn test_build_args_public() {
        let args = build_args(&request(Visibility::Public));
        assert_eq!(args[2], "public-read");
    }

    #[test]
    fn test_lifecycle_success_path() {
        let mut state = ProcessState::Idle;
        assert!(!state.is_active());

        state = ProcessState::Starting;
        state = state.apply(&UploadEvent::Started);
        assert_eq!(state, ProcessState::Running);
        assert!(state.is_active());

        state = state.apply(&UploadEvent::Line("copying...".to_string()));
        assert_eq!(state, ProcessState::Running);

        state = state.apply(&UploadEvent::Finished(UploadOutcome::Succeeded {
            public_link: None,
        }));
        assert_eq!(state, ProcessState::Succeeded);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_lifecycle_failure_path() {
        let mut state = ProcessState::Starting;
        state = state.apply(&UploadEvent::Started);
        state = state.apply(&UploadEvent::Finished(UploadOutcome::Failed {
            exit_code: 42,
            captured_output: String::new(),
        }));
        assert_eq!(state, ProcessState::Failed);
    }

    #[test]
    fn test_lifecycle_spawn_failure_skips_running() {
        // Direct Starting -> Failed edge.
        let state = ProcessState::Starting.apply(&UploadEvent::Finished(UploadOutcome::Failed {
            exit_code: SPAWN_FAILURE_CODE,
            captured_output: "could not start".to_string(),
        }));
        assert_eq!(state, ProcessState::Failed);
    }

    #[test]
    fn test_terminal_states_do_not_advance() {
        let state = ProcessState::Succeeded.apply(&UploadEvent::Started);
        assert_eq!(state, ProcessState::Succeeded);
    }

    #[tokio::test]
    async fn test_empty_path_is_a_noop() {
        let (tx, mut rx) = event_channel();
        let request = UploadRequest::new("", "mybucket", Visibility::Private);
        let search_path = SearchPath::from_value("");

        let handle = start_upload(&request, &search_path, &tx);
        assert!(handle.is_none());

        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_spawn_failure_reports_sentinel() {
        let (tx, mut rx) = event_channel();
        let request = request(Visibility::Private);
        // Empty search path: gsutil cannot be found, so the spawn fails.
        let search_path = SearchPath::from_value("");

        let handle = start_upload(&request, &search_path, &tx);
        assert!(handle.is_none());

        match rx.recv().await.unwrap() {
            UploadEvent::Finished(UploadOutcome::Failed {
                exit_code,
                captured_output,
            }) => {
                assert_eq!(exit_code, SPAWN_FAILURE_CODE);
                assert!(!captured_output.is_empty());
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[cfg(unix)]
    mod with_fake_tool {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Writes a fake gsutil shell script with the given body and
        /// returns a search path that resolves it.
        fn fake_tool(script_body: &str) -> (TempDir, SearchPath) {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join(TOOL_NAME);
            fs::write(&path, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

            let search_path =
                SearchPath::from_value(format!("{}:/usr/bin:/bin", temp.path().display()));
            (temp, search_path)
        }

        fn existing_file(temp: &TempDir, visibility: Visibility) -> UploadRequest {
            let file = temp.path().join("photo.png");
            fs::write(&file, b"fake image").unwrap();
            UploadRequest::new(file, "mybucket", visibility)
        }

        async fn collect_events(mut rx: EventReceiver) -> Vec<UploadEvent> {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                let done = matches!(event, UploadEvent::Finished(_));
                events.push(event);
                if done {
                    break;
                }
            }
            events
        }

        #[tokio::test]
        async fn test_successful_upload_emits_lines_then_outcome() {
            let (temp, search_path) = fake_tool("echo copying; echo done; exit 0");
            let request = existing_file(&temp, Visibility::Private);

            let (tx, rx) = event_channel();
            let handle = start_upload(&request, &search_path, &tx).unwrap();
            let events = collect_events(rx).await;
            handle.await.unwrap();

            assert_eq!(events[0], UploadEvent::Started);
            assert_eq!(events[1], UploadEvent::Line("copying".to_string()));
            assert_eq!(events[2], UploadEvent::Line("done".to_string()));
            assert_eq!(
                events[3],
                UploadEvent::Finished(UploadOutcome::Succeeded { public_link: None })
            );
            assert_eq!(events.len(), 4);
        }

        #[tokio::test]
        async fn test_public_upload_carries_public_link() {
            let (temp, search_path) = fake_tool("exit 0");
            let request = existing_file(&temp, Visibility::Public);

            let (tx, rx) = event_channel();
            let handle = start_upload(&request, &search_path, &tx).unwrap();
            let events = collect_events(rx).await;
            handle.await.unwrap();

            match events.last().unwrap() {
                UploadEvent::Finished(UploadOutcome::Succeeded { public_link }) => {
                    assert_eq!(
                        public_link.as_deref(),
                        Some("https://storage.googleapis.com/mybucket/photo.png")
                    );
                }
                other => panic!("Unexpected terminal event: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_nonzero_exit_reports_code_and_output() {
            let (temp, search_path) = fake_tool("echo oops >&2; exit 42");
            let request = existing_file(&temp, Visibility::Private);

            let (tx, rx) = event_channel();
            let handle = start_upload(&request, &search_path, &tx).unwrap();
            let events = collect_events(rx).await;
            handle.await.unwrap();

            match events.last().unwrap() {
                UploadEvent::Finished(UploadOutcome::Failed {
                    exit_code,
                    captured_output,
                }) => {
                    assert_eq!(*exit_code, 42);
                    assert!(captured_output.contains("oops"));
                }
                other => panic!("Unexpected terminal event: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_terminal_event_is_delivered_after_all_lines() {
            let (temp, search_path) = fake_tool("for i in 1 2 3 4 5; do echo line$i; done");
            let request = existing_file(&temp, Visibility::Private);

            let (tx, rx) = event_channel();
            let handle = start_upload(&request, &search_path, &tx).unwrap();
            let events = collect_events(rx).await;
            handle.await.unwrap();

            let finished_count = events
                .iter()
                .filter(|e| matches!(e, UploadEvent::Finished(_)))
                .count();
            assert_eq!(finished_count, 1);
            assert!(matches!(events.last(), Some(UploadEvent::Finished(_))));

            let lines: Vec<&str> = events
                .iter()
                .filter_map(|e| match e {
                    UploadEvent::Line(l) => Some(l.as_str()),
                    _ => None,
                })
                .collect();
            assert_eq!(lines, vec!["line1", "line2", "line3", "line4", "line5"]);
        }
    }
}
