use std::fs;
use std::path::PathBuf;

use synchorus_scan::hash_bytes;
use synchorus_store::{
    BucketSelector, CONTENT_HASH_KEY, LocalObjectStore, MemoryObjectStore, ObjectStore, StoreError,
    Uploader,
};
use tempfile::TempDir;

fn write_tree(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let temp = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for (name, content) in files {
        let path = temp.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        paths.push(path);
    }
    (temp, paths)
}

#[test]
fn test_upload_routes_by_extension() {
    let (temp, paths) = write_tree(&[("clips/run.mp4", "video"), ("notes/todo.txt", "text")]);
    let uploader = Uploader::new(MemoryObjectStore::new());

    let report = uploader.upload_files(temp.path(), &paths);

    assert!(report.is_success());
    assert_eq!(report.uploaded.len(), 2);
    assert_eq!(report.uploaded_bytes(), 9);
    assert_eq!(uploader.store().keys("videos"), vec!["clips/run.mp4"]);
    assert_eq!(uploader.store().keys("files"), vec!["notes/todo.txt"]);
}

#[test]
fn test_upload_attaches_content_hash() {
    let (temp, paths) = write_tree(&[("a.txt", "payload")]);
    let uploader = Uploader::new(MemoryObjectStore::new());

    let report = uploader.upload_files(temp.path(), &paths);
    let object = uploader.store().get_object("files", "a.txt").unwrap();

    assert_eq!(
        object.metadata.get(CONTENT_HASH_KEY),
        Some(&hash_bytes(b"payload").to_hex())
    );
    assert_eq!(report.uploaded[0].fingerprint, hash_bytes(b"payload"));
    assert!(object.verify().is_ok());
}

#[test]
fn test_failures_do_not_stop_batch() {
    let (temp, mut paths) = write_tree(&[("a.txt", "one"), ("b.txt", "two")]);
    paths.insert(1, temp.path().join("vanished.txt"));
    let uploader = Uploader::new(MemoryObjectStore::new());

    let report = uploader.upload_files(temp.path(), &paths);

    assert_eq!(report.uploaded.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, temp.path().join("vanished.txt"));
}

#[test]
fn test_file_outside_base_fails() {
    let (temp, paths) = write_tree(&[("a.txt", "one")]);
    let other = TempDir::new().unwrap();
    let uploader = Uploader::new(MemoryObjectStore::new());

    let report = uploader.upload_files(other.path(), &paths);

    assert!(report.uploaded.is_empty());
    assert_eq!(report.failures.len(), 1);
    drop(temp);
}

#[test]
fn test_local_store_upload_and_fetch() {
    let (temp, paths) = write_tree(&[("shows/ep (1).mkv", "episode"), ("doc.pdf", "pdf")]);
    let store_dir = TempDir::new().unwrap();
    let selector = BucketSelector::new("docs").with_video_bucket("media");
    let uploader = Uploader::new(LocalObjectStore::new(store_dir.path())).with_selector(selector);

    let report = uploader.upload_files(temp.path(), &paths);
    assert!(report.is_success());

    let store = LocalObjectStore::new(store_dir.path());
    let video = store.get_object("media", "shows/ep (1).mkv").unwrap();
    assert_eq!(video.content, b"episode");
    assert_eq!(video.verify().unwrap(), hash_bytes(b"episode"));

    let doc = store.get_object("docs", "doc.pdf").unwrap();
    assert_eq!(doc.content, b"pdf");
}

#[test]
fn test_tampered_local_object_fails_verification() {
    let (temp, paths) = write_tree(&[("a.txt", "original")]);
    let store_dir = TempDir::new().unwrap();
    let uploader = Uploader::new(LocalObjectStore::new(store_dir.path()));
    uploader.upload_files(temp.path(), &paths);

    fs::write(store_dir.path().join("files/data/a.txt"), "tampered").unwrap();

    let object = uploader.store().get_object("files", "a.txt").unwrap();
    assert!(matches!(
        object.verify(),
        Err(StoreError::IntegrityMismatch { .. })
    ));
}
