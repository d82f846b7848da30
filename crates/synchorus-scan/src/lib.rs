//! Directory scanning and content hashing for synchorus.
//!
//! Walks a tree with jwalk, then reads and fingerprints every regular file
//! with BLAKE3 on a rayon pool. Files that cannot be read are skipped with a
//! warning; only an unusable root aborts the scan.
//!
//! # Example
//!
//! ```rust,no_run
//! use synchorus_scan::{ScanConfig, Scanner};
//!
//! let outcome = Scanner::new().scan(&ScanConfig::new("/path/to/scan")).unwrap();
//!
//! for record in &outcome.records {
//!     println!("{} {}", record.fingerprint, record.path.display());
//! }
//! ```

mod hasher;
mod progress;
mod scanner;

pub use hasher::{hash_bytes, hash_file, hash_reader};
pub use progress::ScanProgress;
pub use scanner::{ScanOutcome, Scanner};

// Re-export core types for convenience
pub use synchorus_core::{FileRecord, Fingerprint, ScanConfig, ScanError, ScanWarning, WarningKind};
