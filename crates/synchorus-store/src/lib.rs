//! Object storage for synchorus.
//!
//! Files are routed to buckets by extension ([`BucketSelector`]) and stored
//! through the [`ObjectStore`] trait with a `content-hash` metadata entry
//! that [`StoredObject::verify`] checks on retrieval.

mod bucket;
mod error;
mod local;
mod object;
mod upload;

pub use bucket::{BucketSelector, DEFAULT_BUCKET, VIDEO_BUCKET, VIDEO_EXTENSIONS};
pub use error::StoreError;
pub use local::LocalObjectStore;
pub use object::{CONTENT_HASH_KEY, MemoryObjectStore, Metadata, ObjectStore, StoredObject};
pub use upload::{UploadFailure, UploadReport, UploadedObject, Uploader, object_key};
