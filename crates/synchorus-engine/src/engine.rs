//! The dedupe pipeline: scan, group, select, quarantine.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use synchorus_analyze::{DuplicateIndex, RetentionSelector};
use synchorus_core::{RemovalResult, ScanError};
use synchorus_ops::{Quarantine, QuarantineError, RelocationReport};
use synchorus_scan::{ScanProgress, Scanner};

use crate::config::{DedupeConfig, resolve_path};

/// Errors that abort a dedupe run.
#[derive(Debug, Error)]
pub enum DedupeError {
    /// Autoclean was requested without a holding directory.
    #[error(
        "No holding directory configured; set --holding-dir, SYNCHORUS_HOLDING_DIR or `holding_dir` in the config file"
    )]
    MissingHoldingDir,

    /// The holding directory is the scan root or one of its ancestors.
    #[error("Holding directory {holding} contains the scan root {root}")]
    HoldingDirContainsRoot { holding: PathBuf, root: PathBuf },

    /// The holding directory cannot be used.
    #[error(transparent)]
    HoldingDir(#[from] QuarantineError),

    /// The scan could not run.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Runs the dedupe pipeline with a fixed configuration.
pub struct Deduper {
    config: DedupeConfig,
    scanner: Scanner,
    selector: RetentionSelector,
}

impl Deduper {
    /// Create a new deduper.
    pub fn new(config: DedupeConfig) -> Self {
        Self {
            config,
            scanner: Scanner::new(),
            selector: RetentionSelector::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &DedupeConfig {
        &self.config
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.scanner.subscribe()
    }

    /// Find duplicates under `root` and, when `autoclean` is set, move every
    /// non-retained copy into the holding directory.
    ///
    /// With `autoclean == false` nothing on disk is changed and
    /// `removed_count` is zero. A fatal scan error returns no partial report
    /// and leaves the holding directory uncreated.
    pub fn dedupe(
        &self,
        root: impl AsRef<Path>,
        autoclean: bool,
    ) -> Result<RemovalResult, DedupeError> {
        let root = root.as_ref();

        let quarantine = if autoclean {
            let dir = self
                .config
                .holding_dir
                .as_ref()
                .ok_or(DedupeError::MissingHoldingDir)?;
            let holding = resolve_path(dir);
            let resolved_root = resolve_path(root);
            if resolved_root.starts_with(&holding) {
                return Err(DedupeError::HoldingDirContainsRoot {
                    holding,
                    root: resolved_root,
                });
            }
            let quarantine = Quarantine::new(dir);
            Some(quarantine.with_collision_policy(self.config.collision))
        } else {
            None
        };

        let outcome = self.scanner.scan(&self.config.scan_config(root))?;
        if let Some(quarantine) = &quarantine {
            quarantine.prepare()?;
        }
        let files_scanned = outcome.records.len();

        let groups = DuplicateIndex::group(outcome.records);
        let duplicate_members = DuplicateIndex::flatten(&groups);
        info!(
            groups = groups.len(),
            files = duplicate_members.len(),
            "duplicate check complete"
        );

        let mut result = RemovalResult {
            duplicate_members,
            scan_warnings: outcome.warnings,
            files_scanned,
            ..Default::default()
        };

        if let Some(quarantine) = quarantine {
            let mut report = RelocationReport::default();

            for plan in self.selector.select_all(&groups) {
                if !plan.is_resolved() {
                    result.unresolved.push(plan.group.fingerprint);
                    continue;
                }
                report.merge(quarantine.relocate(plan.discards()));
            }

            if !report.is_success() {
                warn!(
                    failed = report.failures.len(),
                    "some duplicates could not be quarantined"
                );
            }
            info!(
                holding_dir = %quarantine.holding_dir().display(),
                "{}",
                report.summary()
            );

            result.removed_count = report.removed_count();
            result.relocations = report.relocations;
            result.failures = report.failures;
        }

        result.groups = groups;
        Ok(result)
    }
}

/// One-shot convenience wrapper around [`Deduper::dedupe`].
pub fn dedupe(
    config: &DedupeConfig,
    root: impl AsRef<Path>,
    autoclean: bool,
) -> Result<RemovalResult, DedupeError> {
    Deduper::new(config.clone()).dedupe(root, autoclean)
}
