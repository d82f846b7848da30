use std::fs;
use std::path::Path;

use synchorus_ops::{CollisionPolicy, Quarantine};
use synchorus_scan::{FileRecord, hash_file};
use tempfile::TempDir;

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

fn record(path: &Path) -> FileRecord {
    let (fingerprint, size) = hash_file(path).unwrap();
    FileRecord::new(path, fingerprint, size)
}

/// Two files named `dup.txt` in different subtrees with different content.
fn colliding_tree() -> (TempDir, FileRecord, FileRecord) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("left")).unwrap();
    fs::create_dir_all(root.join("right")).unwrap();
    fs::write(root.join("left/dup.txt"), "left copy").unwrap();
    fs::write(root.join("right/dup.txt"), "right copy").unwrap();

    let left = record(&root.join("left/dup.txt"));
    let right = record(&root.join("right/dup.txt"));
    (temp, left, right)
}

#[test]
fn test_relocation_preserves_content() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a (1).txt");
    fs::write(&source, "keep my bytes").unwrap();
    let original = record(&source);

    let holding = temp.path().join("holding");
    let quarantine = Quarantine::new(&holding);
    quarantine.prepare().unwrap();

    let report = quarantine.relocate(std::slice::from_ref(&original));

    assert_eq!(report.removed_count(), 1);
    assert!(!source.exists());
    let moved = holding.join("a (1).txt");
    assert_eq!(report.relocations[0].to, moved);
    let (fingerprint, size) = hash_file(&moved).unwrap();
    assert_eq!(fingerprint, original.fingerprint);
    assert_eq!(size, original.size);
}

#[test]
fn test_collision_skip_leaves_second_file_in_place() {
    let (temp, left, right) = colliding_tree();
    let holding = temp.path().join("holding");
    let quarantine = Quarantine::new(&holding);
    quarantine.prepare().unwrap();

    let report = quarantine.relocate(&[left.clone(), right.clone()]);

    assert_eq!(report.removed_count(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, right.path);
    assert!(right.path.exists());
    assert_eq!(fs::read_to_string(&right.path).unwrap(), "right copy");
    assert_eq!(read(holding.join("dup.txt")), "left copy");
}

#[test]
fn test_collision_rename_keeps_both() {
    let (temp, left, right) = colliding_tree();
    let holding = temp.path().join("holding");
    let quarantine = Quarantine::new(&holding).with_collision_policy(CollisionPolicy::Rename);
    quarantine.prepare().unwrap();

    let report = quarantine.relocate(&[left, right]);

    assert_eq!(report.removed_count(), 2);
    assert!(report.is_success());
    assert_eq!(read(holding.join("dup.txt")), "left copy");
    assert_eq!(read(holding.join("dup (1).txt")), "right copy");
}

#[test]
fn test_collision_overwrite_replaces_existing() {
    let (temp, left, right) = colliding_tree();
    let holding = temp.path().join("holding");
    let quarantine = Quarantine::new(&holding).with_collision_policy(CollisionPolicy::Overwrite);
    quarantine.prepare().unwrap();

    let report = quarantine.relocate(&[left.clone(), right.clone()]);

    assert_eq!(report.removed_count(), 2);
    assert!(!left.path.exists());
    assert!(!right.path.exists());
    assert_eq!(read(holding.join("dup.txt")), "right copy");
}

#[test]
fn test_directory_in_the_way_is_failure() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("thing");
    fs::write(&source, "file").unwrap();
    let holding = temp.path().join("holding");
    fs::create_dir_all(holding.join("thing")).unwrap();

    let quarantine = Quarantine::new(&holding).with_collision_policy(CollisionPolicy::Overwrite);
    let report = quarantine.relocate(&[record(&source)]);

    assert_eq!(report.removed_count(), 0);
    assert!(source.exists());
}

#[test]
fn test_failures_do_not_stop_batch() {
    let temp = TempDir::new().unwrap();
    let present = temp.path().join("present.txt");
    fs::write(&present, "here").unwrap();
    let ghost = FileRecord::new(
        temp.path().join("ghost.txt"),
        synchorus_scan::hash_bytes(b""),
        0,
    );

    let holding = temp.path().join("holding");
    let quarantine = Quarantine::new(&holding);
    quarantine.prepare().unwrap();

    let report = quarantine.relocate(&[ghost, record(&present)]);

    assert_eq!(report.removed_count(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(holding.join("present.txt").exists());
}
