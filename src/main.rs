//! synchorus - content-addressed duplicate finder with a quarantine.
//!
//! Usage:
//!   synchorus dedupe [PATH]                  Report duplicate files
//!   synchorus dedupe [PATH] --autoclean      Move redundant copies to the holding directory
//!   synchorus upload [PATH] --store-dir DIR  Upload files into a local object store
//!   synchorus fetch BUCKET KEY --store-dir DIR
//!   synchorus --help                         Show help

mod config;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use synchorus_core::RemovalResult;
use synchorus_engine::{CollisionPolicy, Deduper};
use synchorus_scan::{ScanConfig, ScanProgress, Scanner};
use synchorus_store::{LocalObjectStore, ObjectStore, Uploader};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "synchorus",
    version,
    about = "Find duplicate files by content and quarantine redundant copies",
    long_about = "synchorus hashes every file under a directory, groups identical \
                  content and keeps one copy per group.\n\n\
                  Redundant copies are never deleted: with --autoclean they are moved \
                  into a holding directory for review."
)]
struct Cli {
    /// Configuration file (defaults to <config dir>/synchorus/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find duplicate files and optionally quarantine redundant copies
    Dedupe {
        /// Directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Move redundant copies into the holding directory
        #[arg(short, long)]
        autoclean: bool,

        /// Where redundant copies are moved
        #[arg(long, env = "SYNCHORUS_HOLDING_DIR")]
        holding_dir: Option<PathBuf>,

        /// Name collision handling in the holding directory (skip, rename, overwrite)
        #[arg(long)]
        collision: Option<CollisionPolicy>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Upload every file under a directory into a local object store
    Upload {
        /// Directory to upload
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Object store directory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Fetch an object and verify its content hash
    Fetch {
        bucket: String,

        key: String,

        /// Object store directory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Dedupe {
            path,
            autoclean,
            holding_dir,
            collision,
            format,
        } => {
            run_dedupe(&app, &path, autoclean, holding_dir, collision, format)?;
        }
        Command::Upload {
            path,
            store_dir,
            format,
        } => {
            let store_dir = resolve_store_dir(store_dir, &app)?;
            run_upload(&app, &path, &store_dir, format)?;
        }
        Command::Fetch {
            bucket,
            key,
            store_dir,
            output,
        } => {
            let store_dir = resolve_store_dir(store_dir, &app)?;
            run_fetch(&store_dir, &bucket, &key, output)?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` when set.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "synchorus=debug"
    } else {
        "synchorus=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_store_dir(flag: Option<PathBuf>, app: &AppConfig) -> Result<PathBuf> {
    match flag.or_else(|| app.storage.root.clone()) {
        Some(dir) => Ok(dir),
        None => bail!(
            "No object store configured; pass --store-dir or set storage.root in the config file"
        ),
    }
}

/// Run duplicate detection and, with `autoclean`, quarantine.
fn run_dedupe(
    app: &AppConfig,
    path: &Path,
    autoclean: bool,
    holding_dir: Option<PathBuf>,
    collision: Option<CollisionPolicy>,
    format: OutputFormat,
) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;

    let mut config = app.dedupe_config();
    if let Some(dir) = holding_dir {
        config.holding_dir = Some(dir);
    }
    if let Some(policy) = collision {
        config.collision = policy;
    }

    let deduper = Deduper::new(config);
    let progress = spawn_progress_logger(deduper.subscribe());

    info!(root = %path.display(), autoclean, "scanning");
    let result = deduper.dedupe(&path, autoclean);
    drop(deduper);
    let _ = progress.join();
    let result = result.context("Dedupe failed")?;

    match format {
        OutputFormat::Text => print_removal(&result, autoclean),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}

/// Log scan progress snapshots until the scanner goes away.
fn spawn_progress_logger(mut rx: broadcast::Receiver<ScanProgress>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match rx.blocking_recv() {
                Ok(progress) => debug!(
                    hashed = progress.files_hashed,
                    found = progress.files_found,
                    percent = %format!("{:.0}", progress.fraction_done() * 100.0),
                    rate = %format!("{}/s", format_size(progress.bytes_per_second() as u64)),
                    errors = progress.errors_count,
                    "hashing"
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_removal(result: &RemovalResult, autoclean: bool) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Duplicate File Report");
    println!("{}", "─".repeat(70));
    println!();

    if result.groups.is_empty() {
        println!(
            " No duplicate files found in {} files.",
            result.files_scanned
        );
    } else {
        println!(
            " Found {} duplicate groups ({} files of {} scanned)",
            result.groups.len(),
            result.duplicate_members.len(),
            result.files_scanned
        );
        println!(
            " Reclaimable space: {}",
            format_size(result.total_wasted_bytes())
        );
        println!();

        for (i, group) in result.groups.iter().enumerate() {
            let size = group.members.first().map(|m| m.size).unwrap_or(0);
            println!(
                " Group {} [{}] ({} files, {} each)",
                i + 1,
                group.fingerprint.short(),
                group.count(),
                format_size(size)
            );
            for member in &group.members {
                println!("   {}", member.path.display());
            }
            println!();
        }
    }

    if autoclean {
        println!(" Quarantined {} file(s)", result.removed_count);
        for relocation in &result.relocations {
            println!(
                "   {} -> {}",
                relocation.from.display(),
                relocation.to.display()
            );
        }
        if !result.unresolved.is_empty() {
            println!();
            println!(
                " {} group(s) left untouched (every name is a copy variant):",
                result.unresolved.len()
            );
            for fingerprint in &result.unresolved {
                println!("   {}", fingerprint.short());
            }
        }
        if !result.failures.is_empty() {
            println!();
            println!(" {} move(s) failed:", result.failures.len());
            for failure in &result.failures {
                println!("   {failure}");
            }
        }
    }

    if !result.scan_warnings.is_empty() {
        println!();
        println!("{} warning(s) during scan", result.scan_warnings.len());
    }
}

/// Upload every file under `path`.
fn run_upload(app: &AppConfig, path: &Path, store_dir: &Path, format: OutputFormat) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;

    let mut scan = ScanConfig::new(&path);
    scan.threads = app.scan.threads;
    scan.ignore_patterns = app.scan.ignore_patterns.clone();
    scan.include_hidden = app.scan.include_hidden;
    scan.min_size = app.scan.min_size;
    scan.exclude_paths.push(store_dir.to_path_buf());

    let outcome = Scanner::new().scan(&scan).context("Scan failed")?;
    let files: Vec<PathBuf> = outcome.records.into_iter().map(|r| r.path).collect();

    let uploader =
        Uploader::new(LocalObjectStore::new(store_dir)).with_selector(app.storage.selector());
    let report = uploader.upload_files(&outcome.root, &files);

    match format {
        OutputFormat::Text => {
            println!(
                " Uploaded {} file(s), {} to {}",
                report.uploaded.len(),
                format_size(report.uploaded_bytes()),
                store_dir.display()
            );
            for object in &report.uploaded {
                println!("   {}/{}", object.bucket, object.key);
            }
            if !report.failures.is_empty() {
                println!();
                println!(" {} upload(s) failed:", report.failures.len());
                for failure in &report.failures {
                    println!("   {}: {}", failure.path.display(), failure.message);
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

/// Fetch one object, verify it, and write it out.
fn run_fetch(store_dir: &Path, bucket: &str, key: &str, output: Option<PathBuf>) -> Result<()> {
    let store = LocalObjectStore::new(store_dir);
    let object = store.get_object(bucket, key).context("Fetch failed")?;
    let fingerprint = object.verify()?;

    info!(bucket, key, fingerprint = %fingerprint, "content hash verified");

    match output {
        Some(output_path) => {
            fs::write(&output_path, &object.content)
                .context(format!("Failed to write {}", output_path.display()))?;
            eprintln!(
                "Wrote {} to {}",
                format_size(object.content.len() as u64),
                output_path.display()
            );
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&object.content)?;
        }
    }

    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
