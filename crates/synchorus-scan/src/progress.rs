//! Scan progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Regular files found by the walk so far.
    pub files_found: u64,
    /// Files read and hashed so far.
    pub files_hashed: u64,
    /// Total bytes hashed so far.
    pub bytes_hashed: u64,
    /// Most recently hashed path.
    pub current_path: PathBuf,
    /// Number of entries skipped with a warning.
    pub errors_count: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_found: 0,
            files_hashed: 0,
            bytes_hashed: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Hashing throughput in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fraction of found files already hashed (0.0 to 1.0).
    pub fn fraction_done(&self) -> f64 {
        if self.files_found == 0 {
            0.0
        } else {
            self.files_hashed as f64 / self.files_found as f64
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}
