//! Submission assembly and execution
//!
//! 1. Assembly - turn fields and reconciler diffs into a multipart payload
//! 2. Execution - drive the payload through a transport
//! 3. Progress - typed events for the caller, one handle per submission

mod execute;
mod payload;
mod progress;

pub use execute::submit;
pub use payload::{assemble, PayloadPart, SubmissionPayload};
pub use progress::{
    FileStatus, NoopProgress, Phase, ProgressCallback, ProgressSink, UploadEvent, UploadHandle,
    UploadProgress,
};
