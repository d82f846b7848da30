//! Content fingerprints and per-file scan records.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FingerprintParseError;

/// BLAKE3 digest of a file's full content.
///
/// Serialized as a 64-character lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Length of the hex representation.
    pub const HEX_LEN: usize = 64;

    /// Create a fingerprint from raw digest bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the fingerprint as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Abbreviated hex form for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN {
            return Err(FingerprintParseError::Length { len: s.len() });
        }

        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FingerprintParseError::InvalidHex { value: s.to_string() });
        }

        let mut bytes = [0u8; 32];
        for (i, pair) in s.as_bytes().chunks(2).enumerate() {
            bytes[i] = (hex_value(pair[0]) << 4) | hex_value(pair[1]);
        }
        Ok(Self(bytes))
    }
}

/// Value of a single ASCII hex digit (caller has checked the range).
fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A successfully read and hashed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path the file was found at.
    pub path: PathBuf,
    /// Fingerprint of the file's content.
    pub fingerprint: Fingerprint,
    /// Number of bytes hashed.
    pub size: u64,
}

impl FileRecord {
    /// Create a new file record.
    pub fn new(path: impl Into<PathBuf>, fingerprint: Fingerprint, size: u64) -> Self {
        Self {
            path: path.into(),
            fingerprint,
            size,
        }
    }

    /// Base filename, lossily converted to UTF-8.
    ///
    /// Empty when the path has no final component (e.g. `/`).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether the base filename looks like an auto-renamed copy, i.e.
    /// contains a `(`.
    pub fn is_parenthesized(&self) -> bool {
        self.file_name().contains('(')
    }

    /// Path of this record.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
