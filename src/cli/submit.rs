//! Submit command - build an entity form and send it

use crate::cli::progress::CliProgress;
use crate::cli::style::{arrow, check, size, Stylize};
use anstream::println;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use storefront_media::config::ClientConfig;
use storefront_media::form::{EntityForm, EntityKind, ExistingEntity};
use storefront_media::submit::{PayloadPart, ProgressCallback};
use storefront_media::transport::HttpTransport;
use storefront_media::types::MediaFile;

/// Inputs for one submission
#[derive(Debug)]
pub struct SubmitArgs {
    /// Entity kind
    pub kind: EntityKind,
    /// Id of the entity to edit; omitted to create
    pub id: Option<String>,
    /// Scalar values
    pub set: Vec<(String, String)>,
    /// Images the entity already has
    pub existing: Vec<(String, String)>,
    /// Existing images to delete
    pub remove: Vec<(String, String)>,
    /// Local files to attach
    pub attach: Vec<(String, PathBuf)>,
    /// API base URL override
    pub api_url: Option<String>,
    /// Print the payload instead of sending it
    pub dry_run: bool,
}

/// Parse a `name=value` argument
pub fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got {raw:?}")),
    }
}

/// Run the submit command
pub async fn run_submit(args: SubmitArgs) -> Result<()> {
    let kind = args.kind;
    let existing = match &args.id {
        Some(id) => {
            let entity = args
                .existing
                .iter()
                .fold(ExistingEntity::new(id.as_str()), |entity, (field, url)| {
                    entity.with_image(field.as_str(), url.as_str())
                });
            Some(entity)
        }
        None if !args.existing.is_empty() => {
            bail!("--existing only applies when editing (pass --id)");
        }
        None => None,
    };

    let mut form = EntityForm::open(kind, existing)?;
    let progress = CliProgress::verbose();

    for (name, value) in &args.set {
        form.set_field(name, value.as_str())?;
    }

    for (field, url) in &args.remove {
        form.remove_existing(field, url)?;
    }

    for (field, files) in group_attachments(&args.attach) {
        let mut selected = Vec::with_capacity(files.len());
        for path in files {
            let file = MediaFile::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            selected.push(file);
        }
        let report = form.stage(field, selected, &progress).await?;
        if !report.dropped.is_empty() {
            progress
                .on_message(&format!(
                    "{} of the files for {field} could not be decoded and were skipped",
                    report.dropped.len()
                ))
                .await;
        }
    }

    if args.dry_run {
        let payload = form.payload()?;
        println!("{} {}", "Dry run".emphasis(), form.target().to_string().muted());
        for part in payload.parts() {
            match part {
                PayloadPart::Text { name, value } => {
                    println!("  {} {} = {}", arrow(), name.accent(), value);
                }
                PayloadPart::File { name, file } => {
                    println!(
                        "  {} {} = {} ({})",
                        arrow(),
                        name.accent(),
                        file.name,
                        size(file.size()).muted()
                    );
                }
            }
        }
        return Ok(());
    }

    let config = ClientConfig::from_env(args.api_url.as_deref())?;
    let transport = Arc::new(HttpTransport::new(&config)?);
    let entity = form.submit(transport, &progress).await?;

    let id = entity
        .get("_id")
        .or_else(|| entity.get("id"))
        .map_or_else(String::new, |v| v.as_str().map_or_else(|| v.to_string(), str::to_string));
    println!("{} Saved {} {}", check(), kind.emphasis(), id.accent());
    println!("{}", serde_json::to_string_pretty(&entity)?);

    Ok(())
}

/// Group attachments by field, keeping the order fields first appear in
fn group_attachments(attach: &[(String, PathBuf)]) -> Vec<(&str, Vec<&PathBuf>)> {
    let mut groups: Vec<(&str, Vec<&PathBuf>)> = Vec::new();
    for (field, path) in attach {
        match groups.iter_mut().find(|(f, _)| *f == field.as_str()) {
            Some((_, paths)) => paths.push(path),
            None => groups.push((field.as_str(), vec![path])),
        }
    }
    groups
}
