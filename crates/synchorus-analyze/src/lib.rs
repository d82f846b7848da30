//! Duplicate grouping and retention selection for synchorus.
//!
//! - [`DuplicateIndex`] buckets scan records by fingerprint and keeps the
//!   buckets with two or more members.
//! - [`RetentionSelector`] turns each group into a [`CleanupPlan`] using the
//!   parenthetical-name heuristic.
//!
//! ```rust,no_run
//! use synchorus_analyze::{DuplicateIndex, RetentionSelector};
//! use synchorus_scan::{ScanConfig, Scanner};
//!
//! let outcome = Scanner::new().scan(&ScanConfig::new("/path/to/scan")).unwrap();
//! let groups = DuplicateIndex::group(outcome.records);
//!
//! for plan in RetentionSelector::new().select_all(&groups) {
//!     if let Some(kept) = plan.retained() {
//!         println!("keep {}", kept.path.display());
//!     }
//! }
//! ```

mod index;
mod retention;

pub use index::DuplicateIndex;
pub use retention::RetentionSelector;

pub use synchorus_core::{CleanupPlan, DuplicateGroup, FileRecord, RetainReason, Retention};
