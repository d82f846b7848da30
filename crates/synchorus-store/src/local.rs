//! Object store backed by a local directory tree.
//!
//! Layout: `<root>/<bucket>/data/<key>` holds the bytes and
//! `<root>/<bucket>/meta/<key>.json` the metadata.
//!
//! Keys map onto nested paths, so within a bucket no key may be a `/`
//! prefix of another: once `a` is stored, `a/b` is an invalid key and
//! the other way round.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::object::{Metadata, ObjectStore, StoredObject, validate_bucket, validate_key};

const DATA_DIR: &str = "data";
const META_DIR: &str = "meta";

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket).join(DATA_DIR);
        path.extend(key.split('/'));
        path
    }

    fn meta_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket).join(META_DIR);
        path.extend(key.split('/'));
        let mut name = path.into_os_string();
        name.push(".json");
        PathBuf::from(name)
    }

    /// Fail when `key` would nest under a stored object or over a stored prefix.
    fn check_key_free(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let invalid = || StoreError::InvalidKey {
            key: key.to_string(),
        };

        let mut path = self.root.join(bucket).join(DATA_DIR);
        let mut segments = key.split('/').peekable();
        while let Some(segment) = segments.next() {
            path.push(segment);
            let last = segments.peek().is_none();
            match fs::symlink_metadata(&path) {
                Ok(meta) if last && meta.is_dir() => return Err(invalid()),
                Ok(meta) if !last && !meta.is_dir() => return Err(invalid()),
                Ok(_) => {}
                Err(_) => return Ok(()),
            }
        }
        Ok(())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| StoreError::io(path, e))
}

impl ObjectStore for LocalObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Vec<u8>,
        metadata: Metadata,
    ) -> Result<(), StoreError> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        self.check_key_free(bucket, key)?;

        let data = self.data_path(bucket, key);
        let meta = self.meta_path(bucket, key);
        write_file(&data, &content)?;
        write_file(&meta, &serde_json::to_vec_pretty(&metadata)?)?;

        debug!(bucket, key, path = %data.display(), "stored object");
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        validate_bucket(bucket)?;
        validate_key(key)?;

        let data = self.data_path(bucket, key);
        let content = match fs::read(&data) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(StoreError::io(&data, e)),
        };

        let meta = self.meta_path(bucket, key);
        let metadata = match fs::read(&meta) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Metadata::new(),
            Err(e) => return Err(StoreError::io(&meta, e)),
        };

        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let store = LocalObjectStore::new("/store");
        assert_eq!(
            store.data_path("files", "a/b.txt"),
            PathBuf::from("/store/files/data/a/b.txt")
        );
        assert_eq!(
            store.meta_path("files", "a/b.txt"),
            PathBuf::from("/store/files/meta/a/b.txt.json")
        );
    }

    #[test]
    fn test_round_trip_with_metadata() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());
        let mut metadata = Metadata::new();
        metadata.insert("origin".into(), "laptop".into());

        store
            .put_object(
                "videos",
                "trip/day1.mp4",
                b"frames".to_vec(),
                metadata.clone(),
            )
            .unwrap();
        let object = store.get_object("videos", "trip/day1.mp4").unwrap();

        assert_eq!(object.content, b"frames");
        assert_eq!(object.metadata, metadata);
        assert!(temp.path().join("videos/data/trip/day1.mp4").is_file());
        assert!(temp.path().join("videos/meta/trip/day1.mp4.json").is_file());
    }

    #[test]
    fn test_put_replaces() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        store.put_object("files", "k", b"one".to_vec(), Metadata::new()).unwrap();
        store.put_object("files", "k", b"two".to_vec(), Metadata::new()).unwrap();

        assert_eq!(store.get_object("files", "k").unwrap().content, b"two");
    }

    #[test]
    fn test_missing_object() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());
        let err = store.get_object("files", "nope.txt").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_escaping_key_rejected() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path().join("store"));
        let err = store
            .put_object("files", "../outside", b"x".to_vec(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
        assert!(!temp.path().join("outside").exists());
    }

    #[test]
    fn test_nested_key_clash_is_invalid() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        store.put_object("files", "a", b"leaf".to_vec(), Metadata::new()).unwrap();
        let err = store
            .put_object("files", "a/b", b"child".to_vec(), Metadata::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid object key: \"a/b\"");
        assert_eq!(store.get_object("files", "a").unwrap().content, b"leaf");

        store.put_object("files", "x/y", b"child".to_vec(), Metadata::new()).unwrap();
        let err = store
            .put_object("files", "x", b"parent".to_vec(), Metadata::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid object key: \"x\"");
        assert_eq!(store.get_object("files", "x/y").unwrap().content, b"child");
    }
}
