//! Upload orchestration: requests, the subprocess lifecycle, and the
//! progress mapping consumed by frontends.

pub mod process;
pub mod progress;
pub mod request;

// Re-export commonly used types
pub use process::{
    build_args, event_channel, start_upload, EventReceiver, EventSender, ProcessState,
    UploadEvent, UploadOutcome, SPAWN_FAILURE_CODE,
};
pub use progress::{ProgressReporter, ProgressUpdate};
pub use request::{RemoteUri, UploadRequest, Visibility, PUBLIC_URL_BASE, REMOTE_SCHEME};
