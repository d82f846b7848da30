//! Core types for synchorus.
//!
//! This crate provides the data model shared by every stage of the
//! duplicate cleanup pipeline: content fingerprints, scan records,
//! duplicate groups, cleanup plans and the final removal result, along
//! with the scan configuration and error types.

mod config;
mod error;
mod plan;
mod record;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{FingerprintParseError, ScanError, ScanWarning, WarningKind};
pub use plan::{
    CleanupPlan, DuplicateGroup, Relocation, RelocationFailure, RemovalResult, RetainReason,
    Retention,
};
pub use record::{FileRecord, Fingerprint};
