//! Per-file preparation chain and concurrent batches

use crate::error::{Error, Result};
use crate::media::normalize::normalize;
use crate::media::reduce::{reduce_if_large, ReduceOptions, ReduceOutcome};
use crate::submit::{FileStatus, Phase, ProgressCallback};
use crate::types::MediaFile;
use futures::future::join_all;
use tracing::{debug, warn};

/// A file that went through normalize → reduce
#[derive(Debug)]
pub struct Prepared {
    /// File ready for insertion into a slot or collection
    pub file: MediaFile,
    /// Declared type before normalization, when it was converted
    pub converted_from: Option<String>,
    /// Reducer outcome
    pub outcome: ReduceOutcome,
}

/// A file left out of a batch
#[derive(Debug)]
pub struct DroppedFile {
    /// Name as selected
    pub name: String,
    /// Why it was dropped
    pub error: Error,
}

/// Result of preparing a batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Prepared files, in input order
    pub prepared: Vec<MediaFile>,
    /// Files that could not be decoded
    pub dropped: Vec<DroppedFile>,
}

impl BatchOutcome {
    /// Whether every input made it through
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Run one file through normalize → reduce
///
/// Only normalization can fail; a reducer failure is carried in the outcome.
pub async fn prepare_file(file: MediaFile, options: ReduceOptions) -> Result<Prepared> {
    let declared = file.mime.clone();
    let canonical = file.is_canonical();

    let normalized = normalize(file).await?;
    let reduced = reduce_if_large(normalized, options).await;

    Ok(Prepared {
        file: reduced.file,
        converted_from: (!canonical).then_some(declared),
        outcome: reduced.outcome,
    })
}

/// Prepare several files concurrently
///
/// Each file's chain touches only its own buffer. Results are joined once
/// all have settled and keep input order. A file that cannot be decoded is
/// dropped with a warning; the rest of the batch is unaffected.
pub async fn prepare_batch(
    files: Vec<MediaFile>,
    options: ReduceOptions,
    progress: &dyn ProgressCallback,
) -> BatchOutcome {
    progress.on_phase(Phase::Preparing).await;
    debug!("Preparing batch of {} files", files.len());

    let results = join_all(files.into_iter().map(|file| async move {
        let name = file.name.clone();
        (name, prepare_file(file, options).await)
    }))
    .await;

    let mut outcome = BatchOutcome::default();
    for (name, result) in results {
        match result {
            Ok(prepared) => {
                report_prepared(&name, &prepared, progress).await;
                outcome.prepared.push(prepared.file);
            }
            Err(error) => {
                warn!("Dropping {name} from batch: {error}");
                progress
                    .on_file(&name, FileStatus::Dropped(error.to_string()))
                    .await;
                outcome.dropped.push(DroppedFile { name, error });
            }
        }
    }

    outcome
}

async fn report_prepared(name: &str, prepared: &Prepared, progress: &dyn ProgressCallback) {
    if let Some(from_mime) = &prepared.converted_from {
        progress
            .on_file(
                name,
                FileStatus::Normalized {
                    from_mime: from_mime.clone(),
                },
            )
            .await;
    }

    match &prepared.outcome {
        ReduceOutcome::Untouched => {}
        ReduceOutcome::Compressed {
            original_bytes,
            final_bytes,
        } => {
            progress
                .on_file(
                    name,
                    FileStatus::Compressed {
                        original_bytes: *original_bytes,
                        final_bytes: *final_bytes,
                    },
                )
                .await;
        }
        ReduceOutcome::Failed(e) => {
            progress
                .on_file(name, FileStatus::CompressionSkipped(e.to_string()))
                .await;
        }
    }

    progress.on_file(name, FileStatus::Ready).await;
}
