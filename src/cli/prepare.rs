//! Prepare command - normalize and shrink images on disk

use crate::cli::progress::CliProgress;
use crate::cli::style::{arrow, check, size, Stylize};
use anstream::{eprintln, println};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use storefront_media::media::{prepare_batch, ReduceOptions};
use storefront_media::types::MediaFile;
use tracing::debug;

/// Run the prepare command
///
/// Reads every input, runs the batch and writes the results into
/// `out_dir`. Undecodable inputs are reported and skipped; the command
/// fails only if nothing could be prepared.
pub async fn run_prepare(
    files: &[PathBuf],
    out_dir: &Path,
    options: ReduceOptions,
) -> Result<()> {
    let mut inputs = Vec::with_capacity(files.len());
    let mut input_bytes = 0;
    for path in files {
        let file = MediaFile::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        input_bytes += file.size();
        inputs.push(file);
    }

    debug!(
        "Preparing {} files with threshold {} B, max edge {} px",
        inputs.len(),
        options.threshold_bytes,
        options.max_dimension_px
    );

    let progress = CliProgress::compact();
    let outcome = prepare_batch(inputs, options, &progress).await;

    if outcome.prepared.is_empty() && !outcome.dropped.is_empty() {
        bail!("none of the {} files could be decoded", outcome.dropped.len());
    }

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut output_bytes = 0;
    let names = output_names(&outcome.prepared);
    for (file, name) in outcome.prepared.iter().zip(&names) {
        if *name != file.name {
            println!(
                "  {} {} {} {}",
                arrow(),
                file.name.accent(),
                "written as".muted(),
                name.accent()
            );
        }
        let target = out_dir.join(name);
        tokio::fs::write(&target, &file.bytes)
            .await
            .with_context(|| format!("failed to write {}", target.display()))?;
        output_bytes += file.size();
    }

    println!(
        "{} Prepared {} {} into {} ({} {} {})",
        check(),
        outcome.prepared.len().accent(),
        if outcome.prepared.len() == 1 { "file" } else { "files" },
        out_dir.display().accent(),
        size(input_bytes).muted(),
        "→".muted(),
        size(output_bytes).accent()
    );

    if !outcome.is_complete() {
        eprintln!("{}", format!("{} skipped", outcome.dropped.len()).warn());
    }

    Ok(())
}

/// Parse a size in KiB into bytes
pub fn parse_kib(raw: &str) -> std::result::Result<u64, String> {
    let kib: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("expected a whole number of KiB, got {raw:?}"))?;
    kib.checked_mul(1024)
        .ok_or_else(|| format!("{kib} KiB is too large"))
}

/// One distinct file name per prepared file
///
/// Different inputs can land on the same name (`a.webp` and `a.png` both
/// become `a.png`); later ones get a numeric suffix on the stem.
fn output_names(files: &[MediaFile]) -> Vec<String> {
    let mut taken = HashSet::new();
    files
        .iter()
        .map(|file| {
            let mut name = file.name.clone();
            let mut n = 1;
            while !taken.insert(name.clone()) {
                name = match file.name.rsplit_once('.') {
                    Some((stem, ext)) => format!("{stem}-{n}.{ext}"),
                    None => format!("{}-{n}", file.name),
                };
                n += 1;
            }
            name
        })
        .collect()
}
