//! SHA-256 hashing helpers.
//!
//! Snapshots are content-addressed by these digests, verification recomputes
//! them, and duplicate detection groups files by them. Digests are rendered
//! as lowercase hex.

use crate::error::{BroomError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Hash a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    to_hex(&hasher.finalize())
}

/// Hash a file's contents, reading in chunks.
pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| {
        BroomError::UserError(format!("failed to open '{}': {}", path.display(), e))
    })?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).map_err(|e| {
            BroomError::UserError(format!("failed to read '{}': {}", path.display(), e))
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(to_hex(&hasher.finalize()))
}

/// Hash a list of (path, checksum) pairs into a single digest.
///
/// Pairs are sorted before hashing so the digest is independent of input
/// order. Used as the manifest-level checksum of a backup entry.
pub fn hash_pairs(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for (path, checksum) in sorted {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(checksum.as_bytes());
        hasher.update(b"\n");
    }
    to_hex(&hasher.finalize())
}

fn to_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_bytes_known_values() {
        assert_eq!(
            hash_bytes(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_file_matches_hash_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.txt");
        std::fs::write(&path, b"hello world").unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"hello world"));
    }

    #[test]
    fn test_hash_file_missing_file_errors() {
        let temp = TempDir::new().unwrap();
        let result = hash_file(temp.path().join("missing.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_hash_pairs_is_order_independent() {
        let a = vec![
            ("src/main.rs".to_string(), "abc".to_string()),
            ("src/lib.rs".to_string(), "def".to_string()),
        ];
        let b = vec![
            ("src/lib.rs".to_string(), "def".to_string()),
            ("src/main.rs".to_string(), "abc".to_string()),
        ];
        assert_eq!(hash_pairs(&a), hash_pairs(&b));
    }

    #[test]
    fn test_hash_pairs_distinguishes_content() {
        let a = vec![("src/main.rs".to_string(), "abc".to_string())];
        let b = vec![("src/main.rs".to_string(), "abd".to_string())];
        assert_ne!(hash_pairs(&a), hash_pairs(&b));
    }

    #[test]
    fn test_hex_is_lowercase_64_chars() {
        let digest = hash_bytes(b"anything");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }
}
