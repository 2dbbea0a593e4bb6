//! Shared CLI progress callback with styled output and an upload bar

use crate::cli::style::{arrow, bang, check, size, upload_style, Stylize};
use anstream::{eprintln, println};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::sync::{Mutex, PoisonError};
use storefront_media::error::Error;
use storefront_media::submit::{FileStatus, Phase, ProgressCallback, UploadProgress};

/// CLI progress callback that prints to stdout with styled output
///
/// Two modes:
/// - verbose (submit): shows all phases and the upload bar
/// - compact (prepare): per-file lines only
pub struct CliProgress {
    /// Verbose mode shows all phases and the upload bar
    pub verbose: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create verbose progress (for submit command)
    pub const fn verbose() -> Self {
        Self {
            verbose: true,
            bar: Mutex::new(None),
        }
    }

    /// Create compact progress (for prepare command)
    pub const fn compact() -> Self {
        Self {
            verbose: false,
            bar: Mutex::new(None),
        }
    }

    fn clear_bar(&self) {
        let bar = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_phase(&self, phase: Phase) {
        if phase == Phase::Complete {
            self.clear_bar();
        }
        if self.verbose {
            println!("{}...", phase.to_string().emphasis());
        }
    }

    async fn on_file(&self, name: &str, status: FileStatus) {
        match &status {
            FileStatus::Normalized { .. } => {
                println!("  {} {} {}", arrow(), name.accent(), status.to_string().muted());
            }
            FileStatus::Compressed {
                original_bytes,
                final_bytes,
            } => {
                println!(
                    "  {} {} compressed {} {} {}",
                    arrow(),
                    name.accent(),
                    size(*original_bytes).muted(),
                    arrow(),
                    size(*final_bytes).accent()
                );
            }
            FileStatus::CompressionSkipped(_) | FileStatus::Dropped(_) => {
                eprintln!(
                    "  {} {} {}",
                    bang(),
                    name.accent().for_stderr(),
                    status.to_string().warn()
                );
            }
            FileStatus::Ready => {
                if self.verbose {
                    println!("  {} {}", check(), name.emphasis());
                }
            }
        }
    }

    async fn on_upload(&self, progress: UploadProgress) {
        if !self.verbose {
            return;
        }
        let mut bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        let bar = bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(progress.total);
            bar.set_style(upload_style());
            bar
        });
        bar.set_length(progress.total);
        bar.set_position(progress.loaded);
    }

    async fn on_error(&self, err: &Error) {
        self.clear_bar();
        eprintln!("{}: {}", "error".error(), err);
    }

    async fn on_message(&self, message: &str) {
        if self.verbose {
            println!("{message}");
        } else {
            println!("  {}", message.muted());
        }
    }
}
