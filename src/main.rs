//! sfm - prepare and submit storefront images
//!
//! CLI binary for shrinking images ahead of upload and for submitting
//! landing page, category and product forms with their images.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use storefront_media::form::EntityKind;
use storefront_media::media::ReduceOptions;
use tracing_subscriber::prelude::*;

mod cli;

#[derive(Parser)]
#[command(name = "sfm")]
#[command(about = "Image preparation and submission for storefront admin forms")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// 1280 px longer edge
    Standard,
    /// 1920 px longer edge
    Catalog,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize and shrink images, writing the results to a directory
    Prepare {
        /// Image files to prepare
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "prepared")]
        out_dir: PathBuf,

        /// Reduction preset
        #[arg(long, value_enum, default_value = "standard")]
        preset: Preset,

        /// Files above this size are recompressed (KiB)
        #[arg(long = "threshold-kib", value_parser = cli::parse_kib)]
        threshold_bytes: Option<u64>,

        /// Longer-edge bound in pixels
        #[arg(long)]
        max_dimension: Option<u32>,

        /// Size ceiling for recompressed files (KiB)
        #[arg(long = "target-kib", value_parser = cli::parse_kib)]
        target_bytes: Option<u64>,
    },

    /// Submit a landing, category or product form
    Submit {
        /// Entity kind: landing, category or product
        kind: EntityKind,

        /// Id of the entity to edit (omit to create)
        #[arg(long)]
        id: Option<String>,

        /// Set a field, e.g. --set storeName="Corner Shop"
        #[arg(long = "set", value_parser = cli::parse_pair)]
        set: Vec<(String, String)>,

        /// Image the entity already has, e.g. --existing heroImage=https://...
        #[arg(long, value_parser = cli::parse_pair)]
        existing: Vec<(String, String)>,

        /// Existing image to delete, e.g. --remove heroImage=https://...
        #[arg(long, value_parser = cli::parse_pair)]
        remove: Vec<(String, String)>,

        /// Local file to attach, e.g. --attach image=logo.png
        #[arg(long, value_parser = cli::parse_pair)]
        attach: Vec<(String, String)>,

        /// API base URL (overrides STOREFRONT_API_URL)
        #[arg(long)]
        api_url: Option<String>,

        /// Dry run - print the payload without sending it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            files,
            out_dir,
            preset,
            threshold_bytes,
            max_dimension,
            target_bytes,
        } => {
            let mut options = match preset {
                Preset::Standard => ReduceOptions::standard(),
                Preset::Catalog => ReduceOptions::catalog(),
            };
            if let Some(bytes) = threshold_bytes {
                options.threshold_bytes = bytes;
            }
            if let Some(px) = max_dimension {
                options.max_dimension_px = px;
            }
            if let Some(bytes) = target_bytes {
                options.target_bytes = bytes;
            }
            cli::run_prepare(&files, &out_dir, options).await?;
        }
        Commands::Submit {
            kind,
            id,
            set,
            existing,
            remove,
            attach,
            api_url,
            dry_run,
        } => {
            let args = cli::SubmitArgs {
                kind,
                id,
                set,
                existing,
                remove,
                attach: attach
                    .into_iter()
                    .map(|(field, path)| (field, PathBuf::from(path)))
                    .collect(),
                api_url,
                dry_run,
            };
            cli::run_submit(args).await?;
        }
    }

    Ok(())
}
