//! Submission execution
//!
//! Drives one assembled payload through a transport on a background task
//! and hands the caller a request-scoped [`UploadHandle`].

use crate::submit::{ProgressSink, SubmissionPayload, UploadHandle};
use crate::transport::{Transport, UploadRequest, UploadTarget};
use std::sync::Arc;
use tracing::{info, warn};

/// Start submitting a payload
///
/// Returns immediately; progress and the final entity come through the
/// handle. Exactly one terminal event is emitted. Failures are reported
/// once and never retried here.
pub fn submit(
    payload: SubmissionPayload,
    transport: Arc<dyn Transport>,
    target: UploadTarget,
) -> UploadHandle {
    let (sink, events) = ProgressSink::channel();
    let request = UploadRequest { target, payload };

    let task = tokio::spawn(async move {
        let target = request.target.clone();
        let parts = request.payload.parts().len();
        let bytes = request.payload.total_bytes();
        info!("Submitting {target}: {parts} parts, {bytes} bytes");

        let result = transport.send(request, sink.clone()).await;
        match &result {
            Ok(_) => info!("Submission to {target} complete"),
            Err(e) => warn!("Submission to {target} failed: {e}"),
        }
        sink.finish(&result);
        result
    });

    UploadHandle::new(events, task)
}
