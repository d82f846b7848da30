//! JWalk-based directory scanner with parallel content hashing.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use synchorus_core::{FileRecord, ScanConfig, ScanError, ScanWarning, WarningKind};

use crate::hasher::hash_file;
use crate::progress::ScanProgress;

/// How often (in hashed files) a progress snapshot is broadcast.
const PROGRESS_INTERVAL: u64 = 256;

/// Everything a completed scan produced.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Canonicalized root that was scanned.
    pub root: PathBuf,
    /// One record per readable regular file, in discovery order.
    pub records: Vec<FileRecord>,
    /// Entries that were skipped.
    pub warnings: Vec<ScanWarning>,
    /// Wall time of the scan.
    pub duration: Duration,
}

impl ScanOutcome {
    /// Total bytes hashed.
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

/// Scanner that walks a tree with jwalk and hashes files on a rayon pool.
pub struct Scanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Scanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan the configured root and fingerprint every regular file under it.
    ///
    /// Fails only when the root itself cannot be used. Unreadable entries
    /// below the root are skipped and reported as warnings.
    pub fn scan(&self, config: &ScanConfig) -> Result<ScanOutcome, ScanError> {
        let start = Instant::now();
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let ignore = build_ignore_set(&config.ignore_patterns)?;

        info!(root = %root_path.display(), "scanning");

        let (paths, mut warnings) = self.collect_files(config, &root_path, ignore)?;
        debug!(files = paths.len(), "walk complete");

        let (records, hash_warnings) = match config.threads {
            0 => self.hash_paths_timed(&paths, start),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ScanError::InvalidConfig {
                        message: format!("cannot start {n} hashing threads: {e}"),
                    })?;
                pool.install(|| self.hash_paths_timed(&paths, start))
            }
        };
        warnings.extend(hash_warnings);

        let duration = start.elapsed();
        info!(
            files = records.len(),
            skipped = warnings.len(),
            elapsed_ms = duration.as_millis() as u64,
            "scan complete"
        );

        Ok(ScanOutcome {
            root: root_path,
            records,
            warnings,
            duration,
        })
    }

    /// Read and fingerprint each path on the current rayon pool.
    ///
    /// The returned records keep the order of `paths`; unreadable paths are
    /// dropped and reported as warnings.
    pub fn hash_paths(&self, paths: &[PathBuf]) -> (Vec<FileRecord>, Vec<ScanWarning>) {
        self.hash_paths_timed(paths, Instant::now())
    }

    fn hash_paths_timed(
        &self,
        paths: &[PathBuf],
        start: Instant,
    ) -> (Vec<FileRecord>, Vec<ScanWarning>) {
        let files_found = paths.len() as u64;
        let hashed = AtomicU64::new(0);
        let bytes = AtomicU64::new(0);
        let errors = AtomicU64::new(0);

        let results: Vec<Result<FileRecord, ScanWarning>> = paths
            .par_iter()
            .map(|path| {
                let result = match hash_file(path) {
                    Ok((fingerprint, size)) => {
                        debug!(
                            path = %path.display(),
                            fingerprint = %fingerprint.short(),
                            "hashed"
                        );
                        bytes.fetch_add(size, Ordering::Relaxed);
                        Ok(FileRecord::new(path.clone(), fingerprint, size))
                    }
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "unable to read file, skipping"
                        );
                        errors.fetch_add(1, Ordering::Relaxed);
                        Err(ScanWarning::read_error(path.clone(), &err))
                    }
                };

                let count = hashed.fetch_add(1, Ordering::Relaxed) + 1;
                if count % PROGRESS_INTERVAL == 0 || count == files_found {
                    let _ = self.progress_tx.send(ScanProgress {
                        files_found,
                        files_hashed: count,
                        bytes_hashed: bytes.load(Ordering::Relaxed),
                        current_path: path.clone(),
                        errors_count: errors.load(Ordering::Relaxed),
                        elapsed: start.elapsed(),
                    });
                }

                result
            })
            .collect();

        let mut records = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();
        for result in results {
            match result {
                Ok(record) => records.push(record),
                Err(warning) => warnings.push(warning),
            }
        }
        (records, warnings)
    }

    /// Walk the tree and collect the regular files to hash.
    ///
    /// An unreadable root is fatal; an unreadable directory below it is
    /// skipped with a warning.
    fn collect_files(
        &self,
        config: &ScanConfig,
        root_path: &Path,
        ignore: GlobSet,
    ) -> Result<(Vec<PathBuf>, Vec<ScanWarning>), ScanError> {
        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        // Walked paths descend from the canonical root, so excluded paths
        // must be canonical too for the prefix check to work.
        let excluded = ScanConfig {
            exclude_paths: config
                .exclude_paths
                .iter()
                .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
                .collect(),
            ..config.clone()
        };

        let walker = WalkDir::new(root_path)
            .parallelism(parallelism)
            .sort(true)
            .skip_hidden(!config.include_hidden)
            .follow_links(false)
            .max_depth(config.max_depth.map(|d| d as usize).unwrap_or(usize::MAX))
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|entry| match entry {
                    Ok(e) => !ignore.is_match(e.file_name()) && !excluded.is_excluded(&e.path()),
                    Err(_) => true,
                });
            });

        let mut paths = Vec::new();
        let mut warnings = Vec::new();

        for entry_result in walker {
            let mut entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "unable to read directory entry, skipping"
                    );
                    warnings.push(ScanWarning::new(
                        path,
                        err.to_string(),
                        WarningKind::ReadError,
                    ));
                    continue;
                }
            };

            if let Some(err) = entry.read_children_error.take() {
                let err = io::Error::from(err);
                if entry.depth == 0 {
                    return Err(ScanError::io(root_path, err));
                }
                let path = entry.path();
                warn!(path = %path.display(), error = %err, "unable to read directory, skipping");
                warnings.push(ScanWarning::read_error(path, &err));
                continue;
            }

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if config.min_size > 0 {
                match entry.metadata() {
                    Ok(metadata) if metadata.len() < config.min_size => continue,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "unable to read metadata, skipping"
                        );
                        warnings.push(ScanWarning::new(
                            &path,
                            err.to_string(),
                            WarningKind::MetadataError,
                        ));
                        continue;
                    }
                }
            }

            paths.push(path);
        }

        Ok((paths, warnings))
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile ignore patterns into a single matcher.
fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
            message: format!("bad ignore pattern {pattern:?}: {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScanError::InvalidConfig {
        message: e.to_string(),
    })
}
