//! sign-library - Main entry point
//!
//! Command-line front end for the icon library: bulk-upload a folder of sign
//! images with automatic color naming, classify a single RGB value, list the
//! library, or upload one icon.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sign_library::ingest::{self, Committer, StageError, Stager};
use sign_library::library::{self, IconSet};
use sign_library::storage::{MemoryStore, ObjectStore, PublicUrls, SqliteStore};
use sign_library::{ColorCode, Config, SourceFile, StageReport};

/// Command-line arguments for sign-library
#[derive(Parser, Debug)]
#[command(name = "sign-library")]
#[command(about = "Color-categorized image ingestion for road-sign icons")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SIGN_LIBRARY_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database backing the object store
    #[arg(short, long, env = "SIGN_LIBRARY_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify, rename and upload every image in a folder
    BulkUpload {
        folder: PathBuf,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Commit into a throwaway in-memory store
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the color code of an RGB value
    Classify { r: u8, g: u8, b: u8 },

    /// List the images in the library folder
    Library,

    /// Upload a single icon under a unique name
    Upload {
        file: PathBuf,

        /// Icon URLs the sign already has, for the duplicate check
        #[arg(long = "existing")]
        existing: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sign_library=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.database_path = database;
    }

    match args.command {
        Command::BulkUpload {
            folder,
            yes,
            dry_run,
        } => bulk_upload(&config, &folder, yes, dry_run).await,
        Command::Classify { r, g, b } => {
            let code = sign_library::classify(r, g, b);
            println!("{} ({})", code, code.label());
            Ok(())
        }
        Command::Library => list(&config).await,
        Command::Upload { file, existing } => upload(&config, &file, existing).await,
    }
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    let urls = PublicUrls::new(&config.public_base_url, &config.bucket);
    SqliteStore::open(&config.database_path, urls).with_context(|| {
        format!(
            "Failed to open object store at {}",
            config.database_path.display()
        )
    })
}

async fn bulk_upload(config: &Config, folder: &Path, yes: bool, dry_run: bool) -> Result<()> {
    if !folder.is_dir() {
        bail!("Not a folder: {}", folder.display());
    }

    let scan = ingest::scan_folder(folder).await;
    if scan.files.is_empty() {
        println!("No files found in {}", folder.display());
        return Ok(());
    }

    let stager = Stager::from_config(config).with_context(|| {
        format!(
            "Failed to create preview directory {}",
            config.preview_dir.display()
        )
    })?;

    // Ctrl+C abandons the batch while it is still staging
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let staged = stager.stage(scan.files, &cancel).await;
    watcher.abort();

    let report = match staged {
        Ok(report) => report,
        Err(StageError::Cancelled) => {
            println!("Batch cancelled, nothing was uploaded.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Staging failed"),
    };

    print_staged(&report);
    if report.staged.is_empty() {
        println!("Nothing to upload.");
        return Ok(());
    }

    if !yes && !confirm(report.staged.len()).await? {
        let released = report.release_all();
        info!(released, "Batch discarded");
        println!("Batch discarded, nothing was uploaded.");
        return Ok(());
    }

    let store: Arc<dyn ObjectStore> = if dry_run {
        info!("Dry run, committing to an in-memory store");
        Arc::new(MemoryStore::new(PublicUrls::new(
            &config.public_base_url,
            &config.bucket,
        )))
    } else {
        Arc::new(open_store(config)?)
    };

    let committed = Committer::from_config(store, config)
        .commit(&report.staged)
        .await;

    println!(
        "{}",
        serde_json::to_string_pretty(&committed).context("Failed to serialize commit report")?
    );
    println!(
        "Uploaded {} of {} images ({} failed)",
        committed.succeeded_count(),
        committed.attempted,
        committed.failed_count()
    );

    if !committed.is_complete() {
        bail!(
            "Some uploads failed, retry: {}",
            committed.retry_candidates().join(", ")
        );
    }
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl+C received, cancelling batch");
        cancel.cancel();
    }
}

/// Summary of the staged batch, grouped by color
fn print_staged(report: &StageReport) {
    println!(
        "Staged {} images, skipped {} non-images, {} failed",
        report.staged.len(),
        report.skipped_count(),
        report.failures.len()
    );

    for (color, assets) in ingest::group_by_color(&report.staged) {
        println!("\n{} ({}):", label_for(color), assets.len());
        for asset in assets {
            println!(
                "  {:<12} ← {}  [{}]",
                asset.assigned_name(),
                asset.original_name(),
                asset.preview().path().display()
            );
        }
    }

    for failure in &report.failures {
        println!("  ⚠️  {}: {}", failure.file_name, failure.reason);
    }
}

fn label_for(color: ColorCode) -> String {
    format!("{} [{}]", color.label(), color.letter())
}

async fn confirm(count: usize) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("\nUpload {} images? [y/N] ", count).as_bytes())
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read confirmation")?;

    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes"))
}

async fn list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let images = library::list_library(&store, config)
        .await
        .context("Failed to list library")?;

    for image in &images {
        println!("{}\t{}", image.name, image.public_url);
    }
    info!(count = images.len(), "Library listed");
    Ok(())
}

async fn upload(config: &Config, path: &Path, existing: Vec<String>) -> Result<()> {
    let file = SourceFile::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let icons = IconSet::from_urls(existing);

    let store = open_store(config)?;
    let url = library::upload_single(&store, config, &file, &icons)
        .await
        .with_context(|| format!("Failed to upload {}", file.name))?;

    println!("{}", url);
    Ok(())
}
