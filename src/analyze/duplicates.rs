//! Duplicate file detection.
//!
//! Files are grouped by size first so only same-sized candidates get
//! hashed, then by SHA-256 of their content. Tiny files are ignored; at
//! the default threshold they are mostly empty mod files and fixtures
//! that are legitimately identical.

use super::DuplicateGroup;
use crate::error::Result;
use crate::fs::WalkedFile;
use crate::hash;
use std::collections::HashMap;

/// Group byte-identical files of at least `min_bytes`.
///
/// Groups come back sorted largest-first; paths within a group are
/// sorted. Files that disappear between walking and hashing are skipped.
pub fn find_duplicate_groups(
    files: &[WalkedFile],
    min_bytes: u64,
) -> Result<Vec<DuplicateGroup>> {
    let mut by_size: HashMap<u64, Vec<&WalkedFile>> = HashMap::new();
    for file in files {
        if file.size >= min_bytes {
            by_size.entry(file.size).or_default().push(file);
        }
    }

    let mut groups = Vec::new();

    for (size, candidates) in by_size {
        if candidates.len() < 2 {
            continue;
        }

        let mut by_hash: HashMap<String, Vec<String>> = HashMap::new();
        for file in candidates {
            let Ok(checksum) = hash::hash_file(&file.path) else {
                continue;
            };
            by_hash.entry(checksum).or_default().push(file.rel_str());
        }

        for (checksum, mut paths) in by_hash {
            if paths.len() < 2 {
                continue;
            }
            paths.sort();
            groups.push(DuplicateGroup {
                checksum,
                size,
                files: paths,
            });
        }
    }

    groups.sort_by(|a, b| b.size.cmp(&a.size).then(a.checksum.cmp(&b.checksum)));
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn walked(root: &Path, rel: &str, content: &str) -> WalkedFile {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        WalkedFile {
            path,
            rel: rel.into(),
            size: content.len() as u64,
        }
    }

    #[test]
    fn test_identical_files_grouped() {
        let temp = TempDir::new().unwrap();
        let content = "shared content that is long enough to clear the size floor\n";
        let files = vec![
            walked(temp.path(), "a.txt", content),
            walked(temp.path(), "sub/b.txt", content),
            walked(temp.path(), "c.txt", "different content, also long enough to be hashed\n"),
        ];

        let groups = find_duplicate_groups(&files, 16).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files, vec!["a.txt", "sub/b.txt"]);
        assert_eq!(groups[0].size, content.len() as u64);
        assert_eq!(groups[0].checksum.len(), 64);
    }

    #[test]
    fn test_same_size_different_content() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            walked(temp.path(), "a.txt", "aaaaaaaaaaaaaaaaaaaaaaaa\n"),
            walked(temp.path(), "b.txt", "bbbbbbbbbbbbbbbbbbbbbbbb\n"),
        ];

        let groups = find_duplicate_groups(&files, 16).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_small_files_ignored() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            walked(temp.path(), "a.rs", "tiny\n"),
            walked(temp.path(), "b.rs", "tiny\n"),
        ];

        let groups = find_duplicate_groups(&files, 64).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_groups_sorted_largest_first() {
        let temp = TempDir::new().unwrap();
        let big = "large shared content ".repeat(10);
        let small = "small shared content\n";
        let files = vec![
            walked(temp.path(), "big1.txt", &big),
            walked(temp.path(), "big2.txt", &big),
            walked(temp.path(), "small1.txt", small),
            walked(temp.path(), "small2.txt", small),
        ];

        let groups = find_duplicate_groups(&files, 8).unwrap();

        assert_eq!(groups.len(), 2);
        assert!(groups[0].size > groups[1].size);
    }

    #[test]
    fn test_vanished_file_skipped() {
        let temp = TempDir::new().unwrap();
        let content = "content long enough to be considered for hashing\n";
        let present = walked(temp.path(), "here.txt", content);
        let mut gone = walked(temp.path(), "gone.txt", content);
        fs::remove_file(&gone.path).unwrap();
        gone.size = content.len() as u64;

        let groups = find_duplicate_groups(&[present, gone], 8).unwrap();
        assert!(groups.is_empty());
    }
}
