//! Scan, group, select and quarantine pipeline for synchorus.
//!
//! ```rust,no_run
//! use synchorus_engine::{DedupeConfig, Deduper};
//!
//! let config = DedupeConfig::new().with_holding_dir("/srv/holding");
//! let result = Deduper::new(config).dedupe("/srv/photos", true).unwrap();
//!
//! println!("{} duplicates, {} quarantined", result.duplicate_members.len(), result.removed_count);
//! ```

mod config;
mod engine;

pub use config::{DedupeConfig, DedupeConfigBuilder};
pub use engine::{DedupeError, Deduper, dedupe};

pub use synchorus_core::{FileRecord, RemovalResult};
pub use synchorus_ops::CollisionPolicy;
