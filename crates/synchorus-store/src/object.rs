//! The object store seam and an in-memory backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use synchorus_core::Fingerprint;
use synchorus_scan::hash_bytes;

use crate::error::StoreError;

/// Metadata key holding the fingerprint hex of an object's content.
pub const CONTENT_HASH_KEY: &str = "content-hash";

/// User metadata attached to an object.
pub type Metadata = BTreeMap<String, String>;

/// An object read back from a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub metadata: Metadata,
}

impl StoredObject {
    /// The recorded content hash, if present and well formed.
    pub fn content_hash(&self) -> Option<Fingerprint> {
        self.metadata.get(CONTENT_HASH_KEY)?.parse().ok()
    }

    /// Check the content against its recorded hash.
    pub fn verify(&self) -> Result<Fingerprint, StoreError> {
        let expected = self
            .content_hash()
            .ok_or_else(|| StoreError::MissingContentHash {
                bucket: self.bucket.clone(),
                key: self.key.clone(),
            })?;
        let actual = hash_bytes(&self.content);
        if actual != expected {
            return Err(StoreError::IntegrityMismatch {
                bucket: self.bucket.clone(),
                key: self.key.clone(),
                expected,
                actual,
            });
        }
        Ok(actual)
    }
}

/// A bucketed key/value object store.
///
/// Implementations must be safe to share between threads.
pub trait ObjectStore: Send + Sync {
    /// Store `content` under `bucket`/`key`, replacing any existing object.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Vec<u8>,
        metadata: Metadata,
    ) -> Result<(), StoreError>;

    /// Read the object stored under `bucket`/`key`.
    fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Vec<u8>,
        metadata: Metadata,
    ) -> Result<(), StoreError> {
        (**self).put_object(bucket, key, content, metadata)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        (**self).get_object(bucket, key)
    }
}

/// Reject bucket ids that are empty or would escape a directory.
pub(crate) fn validate_bucket(bucket: &str) -> Result<(), StoreError> {
    let bad = bucket.is_empty()
        || bucket == "."
        || bucket == ".."
        || bucket.contains(['/', '\\']);
    if bad {
        return Err(StoreError::InvalidBucket {
            bucket: bucket.to_string(),
        });
    }
    Ok(())
}

/// Keys are `/`-separated relative paths with no empty, `.` or `..` segments.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Object store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), (Vec<u8>, Metadata)>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .map(|o| o.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    /// Check if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Vec<u8>,
        metadata: Metadata,
    ) -> Result<(), StoreError> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert((bucket.to_string(), key.to_string()), (content, metadata));
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        let (content, metadata) = objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content: content.clone(),
            metadata: metadata.clone(),
        })
    }
}
