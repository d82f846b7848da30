//! Full-content BLAKE3 fingerprinting.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake3::Hasher;

use synchorus_core::Fingerprint;

/// Files larger than this are hashed through a memory map.
const MMAP_THRESHOLD: u64 = 128 * 1024;

/// Read buffer for streamed hashing.
const BUFFER_SIZE: usize = 64 * 1024;

/// Fingerprint an in-memory byte slice.
pub fn hash_bytes(bytes: &[u8]) -> Fingerprint {
    Fingerprint::new(*blake3::hash(bytes).as_bytes())
}

/// Fingerprint everything a reader yields, returning the digest and the
/// number of bytes consumed.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<(Fingerprint, u64)> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    let fingerprint = Fingerprint::new(*hasher.finalize().as_bytes());
    Ok((fingerprint, hasher.count()))
}

/// Fingerprint the full content of a file.
pub fn hash_file(path: &Path) -> io::Result<(Fingerprint, u64)> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();

    if file_size > MMAP_THRESHOLD {
        let mut hasher = Hasher::new();
        hasher.update_mmap(path)?;
        let fingerprint = Fingerprint::new(*hasher.finalize().as_bytes());
        Ok((fingerprint, hasher.count()))
    } else {
        hash_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_bytes_is_deterministic() {
        let a = hash_bytes(b"same bytes");
        let b = hash_bytes(b"same bytes");
        let c = hash_bytes(b"other bytes");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn test_known_digest() {
        // BLAKE3 of the empty input.
        assert_eq!(
            hash_bytes(b"").to_hex(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_hash_file_matches_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.txt");
        fs::write(&path, "duplicate content here").unwrap();

        let (fp, size) = hash_file(&path).unwrap();
        assert_eq!(fp, hash_bytes(b"duplicate content here"));
        assert_eq!(size, 22);
    }

    #[test]
    fn test_large_file_uses_full_content() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        let b = temp.path().join("b.bin");

        // Same head and tail, one differing byte in the middle.
        let mut content = vec![7u8; 512 * 1024];
        fs::write(&a, &content).unwrap();
        content[256 * 1024] = 8;
        fs::write(&b, &content).unwrap();

        let (fa, sa) = hash_file(&a).unwrap();
        let (fb, sb) = hash_file(&b).unwrap();
        assert_eq!(sa, 512 * 1024);
        assert_eq!(sa, sb);
        assert_ne!(fa, fb);
        assert_eq!(fb, hash_bytes(&content));
    }

    #[test]
    fn test_hash_missing_file_errors() {
        let temp = TempDir::new().unwrap();
        let err = hash_file(&temp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
