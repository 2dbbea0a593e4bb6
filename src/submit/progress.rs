//! Progress reporting for preparation and upload
//!
//! Two channels, both typed:
//! - [`ProgressCallback`] receives phase changes and per-file advisories
//!   (compressed, compression skipped, dropped). Interfaces decide how to
//!   show them; control flow never depends on them.
//! - [`UploadHandle`] is returned for each submission and yields
//!   [`UploadEvent`]s until the upload completes or fails.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Submission phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Normalizing and reducing selected files
    Preparing,
    /// Checking required fields
    Validating,
    /// Building the multipart payload
    Assembling,
    /// Sending the payload
    Uploading,
    /// Submission complete
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Preparing => "Preparing images",
            Self::Validating => "Validating",
            Self::Assembling => "Assembling payload",
            Self::Uploading => "Uploading",
            Self::Complete => "Done",
        };
        f.write_str(label)
    }
}

/// Per-file preparation status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Converted from a non-canonical type to PNG
    Normalized {
        /// Declared type before conversion
        from_mime: String,
    },
    /// Recompressed to fit the size budget
    Compressed {
        /// Size before
        original_bytes: u64,
        /// Size after
        final_bytes: u64,
    },
    /// Recompression failed; the original is used
    CompressionSkipped(String),
    /// File could not be decoded and was left out of the batch
    Dropped(String),
    /// File is ready to submit
    Ready,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normalized { from_mime } => write!(f, "converted from {from_mime} to PNG"),
            Self::Compressed {
                original_bytes,
                final_bytes,
            } => write!(
                f,
                "compressed {} KiB → {} KiB",
                original_bytes / 1024,
                final_bytes / 1024
            ),
            Self::CompressionSkipped(reason) => {
                write!(f, "compression failed, using original ({reason})")
            }
            Self::Dropped(reason) => write!(f, "skipped: {reason}"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

/// Progress callback trait
///
/// Implement this trait to receive progress updates while a form prepares
/// files and submits. CLI implementations print to the terminal; a UI
/// would drive toasts or a status bar.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when entering a new phase
    async fn on_phase(&self, phase: Phase);

    /// Called with a per-file preparation status
    async fn on_file(&self, name: &str, status: FileStatus);

    /// Called as upload progress advances
    async fn on_upload(&self, progress: UploadProgress);

    /// Called when an error occurs
    async fn on_error(&self, error: &Error);

    /// Called with a general status message
    async fn on_message(&self, message: &str);
}

/// No-op progress callback for testing or when progress isn't needed
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_phase(&self, _phase: Phase) {}
    async fn on_file(&self, _name: &str, _status: FileStatus) {}
    async fn on_upload(&self, _progress: UploadProgress) {}
    async fn on_error(&self, _error: &Error) {}
    async fn on_message(&self, _message: &str) {}
}

/// Bytes transferred so far against the declared total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes handed to the transport so far
    pub loaded: u64,
    /// Declared total size of the payload
    pub total: u64,
}

impl UploadProgress {
    /// Whole percentage transferred, rounded down and clamped to 0..=100
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = u128::from(self.loaded.min(self.total)) * 100 / u128::from(self.total);
        u8::try_from(pct).unwrap_or(100)
    }
}

/// Event emitted while a submission is in flight
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// More bytes transferred; `percent` never decreases
    Progress {
        /// Bytes transferred
        loaded: u64,
        /// Declared total
        total: u64,
        /// Monotonic percentage
        percent: u8,
    },
    /// Server accepted the submission and returned the entity
    Completed(Value),
    /// Submission failed; terminal
    Failed(String),
}

impl UploadEvent {
    /// Whether no further events follow this one
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// Sending half handed to the transport
///
/// Collapses raw `(loaded, total)` reports into monotonic percentage events
/// and drops repeats. Transfer reports stop at 99; 100 is only emitted once
/// the server has accepted the submission. Clones share state, so the transport and the task
/// driving it see one stream. Sends never fail: if the caller stopped
/// listening the events are discarded.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<UploadEvent>,
    state: Arc<Mutex<SinkState>>,
}

#[derive(Debug, Default)]
struct SinkState {
    last_percent: Option<u8>,
    last_loaded: u64,
    last_total: u64,
    closed: bool,
}

impl ProgressSink {
    /// Create a connected sink/receiver pair
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                state: Arc::default(),
            },
            rx,
        )
    }

    /// Report transport progress
    pub fn report(&self, loaded: u64, total: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return;
        }
        let percent = UploadProgress { loaded, total }.percent().min(99);
        self.emit(&mut state, loaded.min(total), total, percent);
    }

    fn emit(&self, state: &mut SinkState, loaded: u64, total: u64, percent: u8) {
        if state.last_percent.is_some_and(|last| percent <= last) {
            return;
        }
        state.last_percent = Some(percent);
        state.last_loaded = loaded;
        state.last_total = total;
        let _ = self.tx.send(UploadEvent::Progress {
            loaded,
            total,
            percent,
        });
    }

    /// Emit the terminal event for a finished submission
    ///
    /// A success first completes the progress stream at 100. Later reports
    /// on any clone are ignored.
    pub fn finish(&self, result: &Result<Value>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return;
        }
        if result.is_ok() {
            let total = state.last_total;
            self.emit(&mut state, total, total, 100);
        }
        state.closed = true;
        let event = match result {
            Ok(entity) => UploadEvent::Completed(entity.clone()),
            Err(e) => UploadEvent::Failed(e.to_string()),
        };
        let _ = self.tx.send(event);
    }
}

/// Request-scoped handle for one in-flight submission
///
/// Owned by the caller for the duration of the submission. Dropping it
/// detaches: the upload keeps running but its events and result are
/// discarded.
#[derive(Debug)]
pub struct UploadHandle {
    events: mpsc::UnboundedReceiver<UploadEvent>,
    task: JoinHandle<Result<Value>>,
}

impl UploadHandle {
    pub(crate) const fn new(
        events: mpsc::UnboundedReceiver<UploadEvent>,
        task: JoinHandle<Result<Value>>,
    ) -> Self {
        Self { events, task }
    }

    /// Next event, or `None` once the stream is exhausted
    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        self.events.recv().await
    }

    /// Wait for the submission to settle and return the server's entity
    pub async fn finish(self) -> Result<Value> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("upload task failed: {e}")))?
    }

    /// Drain all events, then return the result
    pub async fn collect(mut self) -> (Vec<UploadEvent>, Result<Value>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let result = self.finish().await;
        (events, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percents(events: &[UploadEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                UploadEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_percent_rounds_down() {
        assert_eq!(UploadProgress { loaded: 0, total: 200 }.percent(), 0);
        assert_eq!(UploadProgress { loaded: 3, total: 200 }.percent(), 1);
        assert_eq!(UploadProgress { loaded: 199, total: 200 }.percent(), 99);
        assert_eq!(UploadProgress { loaded: 200, total: 200 }.percent(), 100);
        assert_eq!(UploadProgress { loaded: 500, total: 200 }.percent(), 100);
        assert_eq!(UploadProgress { loaded: 0, total: 0 }.percent(), 100);
    }

    #[test]
    fn test_sink_is_monotonic_and_terminates_at_100() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.report(10, 100);
        sink.report(10, 100);
        sink.report(5, 100);
        sink.report(60, 100);
        sink.finish(&Ok(serde_json::json!({"_id": "1"})));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(percents(&events), vec![10, 60, 100]);
        assert!(events.last().is_some_and(UploadEvent::is_terminal));
    }

    #[test]
    fn test_full_transfer_then_failure_never_reaches_100() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.report(995, 1000);
        sink.report(1000, 1000);
        sink.finish(&Err(Error::Transport {
            status: Some(500),
            message: "boom".to_string(),
        }));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(percents(&events), vec![99]);
        assert!(matches!(events.last(), Some(UploadEvent::Failed(_))));
    }

    #[test]
    fn test_sink_failure_is_terminal() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.report(30, 100);
        sink.finish(&Err(Error::Transport {
            status: Some(500),
            message: "boom".to_string(),
        }));

        let _ = rx.try_recv();
        match rx.try_recv() {
            Ok(UploadEvent::Failed(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected failure event, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.report(50, 100);
        sink.finish(&Ok(Value::Null));
    }

    #[test]
    fn test_clones_share_one_stream() {
        let (sink, mut rx) = ProgressSink::channel();
        let transport_side = sink.clone();
        transport_side.report(40, 100);
        sink.report(30, 100);
        sink.finish(&Ok(Value::Null));
        transport_side.report(100, 100);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(percents(&events), vec![40, 100]);
        assert_eq!(events.last(), Some(&UploadEvent::Completed(Value::Null)));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Uploading.to_string(), "Uploading");
        assert_eq!(
            FileStatus::Compressed {
                original_bytes: 2048 * 1024,
                final_bytes: 400 * 1024
            }
            .to_string(),
            "compressed 2048 KiB → 400 KiB"
        );
    }
}
