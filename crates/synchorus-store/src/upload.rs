//! Uploading local files into an object store.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use synchorus_core::Fingerprint;
use synchorus_scan::hash_bytes;

use crate::bucket::BucketSelector;
use crate::error::StoreError;
use crate::object::{CONTENT_HASH_KEY, Metadata, ObjectStore};

/// One file stored successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    pub path: PathBuf,
    pub bucket: String,
    pub key: String,
    pub fingerprint: Fingerprint,
    pub size: u64,
}

/// One file that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of an upload batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub uploaded: Vec<UploadedObject>,
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    /// Total bytes stored.
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded.iter().map(|o| o.size).sum()
    }

    /// Check if every file was stored.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Object key for `path`: its location relative to `base`, `/`-separated.
pub fn object_key(base: &Path, path: &Path) -> Result<String, StoreError> {
    let invalid = || StoreError::InvalidKey {
        key: path.display().to_string(),
    };

    let relative = path.strip_prefix(base).map_err(|_| invalid())?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str().ok_or_else(invalid)?),
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }
    if segments.is_empty() {
        return Err(invalid());
    }
    Ok(segments.join("/"))
}

/// Stores files in buckets chosen by extension.
pub struct Uploader<S> {
    store: S,
    selector: BucketSelector,
}

impl<S: ObjectStore> Uploader<S> {
    /// Create an uploader using the built-in bucket rules.
    pub fn new(store: S) -> Self {
        Self {
            store,
            selector: BucketSelector::default(),
        }
    }

    /// Use a custom bucket selector.
    pub fn with_selector(mut self, selector: BucketSelector) -> Self {
        self.selector = selector;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload each file under its path relative to `base`.
    ///
    /// A failure for one file is recorded and the rest still upload.
    pub fn upload_files(&self, base: &Path, files: &[PathBuf]) -> UploadReport {
        let mut report = UploadReport::default();

        for path in files {
            match self.upload_one(base, path) {
                Ok(object) => {
                    debug!(
                        path = %path.display(),
                        bucket = %object.bucket,
                        key = %object.key,
                        "uploaded"
                    );
                    report.uploaded.push(object);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "upload failed");
                    report.failures.push(UploadFailure {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failures.len(),
            "upload complete"
        );
        report
    }

    fn upload_one(&self, base: &Path, path: &Path) -> Result<UploadedObject, StoreError> {
        let key = object_key(base, path)?;
        let bucket = self.selector.select(path).to_string();
        let content = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let fingerprint = hash_bytes(&content);
        let size = content.len() as u64;

        let mut metadata = Metadata::new();
        metadata.insert(CONTENT_HASH_KEY.to_string(), fingerprint.to_hex());

        self.store.put_object(&bucket, &key, content, metadata)?;

        Ok(UploadedObject {
            path: path.to_path_buf(),
            bucket,
            key,
            fingerprint,
            size,
        })
    }
}
