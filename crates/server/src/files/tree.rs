//! Directory listing, flat or recursive.
//!
//! Listing is best-effort: an entry that cannot be described is reported as
//! skipped instead of failing the whole listing, so the result is a snapshot
//! of whatever could be read at the time.

use std::fs;
use std::path::{Path, PathBuf};

use protocol::{FilesystemEntry, FilesystemTree};
use walkdir::WalkDir;

use super::error::FileError;
use super::inspect::{kind_of, mtime_secs, ObjectKind};
use super::resolver::{ResolvedPath, ServeRoot};

/// Why an entry was left out of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry could not be read or stat'ed (it may have vanished).
    Unreadable(String),
    /// A symlink whose target lies outside the served root.
    OutsideRoot,
    /// The relative path cannot be expressed as UTF-8.
    InvalidName,
    /// Neither a file nor a directory (device, socket, ...).
    Unsupported,
}

/// An entry that was left out of a listing.
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    /// Absolute path of the entry, when known.
    pub path: Option<PathBuf>,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Result of examining one walked entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// The entry belongs in the listing.
    Listed(FilesystemEntry),
    /// The entry was skipped.
    Skipped(SkippedEntry),
}

/// A listing together with the entries that had to be skipped.
#[derive(Debug, Default)]
pub struct TreeListing {
    /// Entries in traversal order.
    pub tree: FilesystemTree,
    /// Entries that could not be listed.
    pub skipped: Vec<SkippedEntry>,
}

/// List a directory below the served root.
///
/// With `recursive` every descendant is listed, otherwise only immediate
/// children. Paths are relative to the root (not to `dir`) and use `/`.
/// Symlinks are reported by their target's kind but never descended into.
pub fn list(
    root: &ServeRoot,
    dir: &ResolvedPath,
    recursive: bool,
) -> Result<TreeListing, FileError> {
    let metadata = fs::metadata(dir.as_path()).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(dir.requested().to_string())
        } else {
            FileError::Io(e)
        }
    })?;
    if !metadata.is_dir() {
        return Err(FileError::invalid_type(
            dir.requested(),
            "path is not a directory",
        ));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(dir.as_path())
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false);

    let mut listing = TreeListing::default();

    for walked in walker {
        let outcome = match walked {
            Ok(entry) => describe_entry(root, entry.path(), entry.path_is_symlink()),
            Err(e) => EntryOutcome::Skipped(SkippedEntry {
                path: e.path().map(Path::to_path_buf),
                reason: SkipReason::Unreadable(e.to_string()),
            }),
        };

        match outcome {
            EntryOutcome::Listed(entry) => listing.tree.entries.push(entry),
            EntryOutcome::Skipped(skipped) => {
                tracing::debug!(path = ?skipped.path, reason = ?skipped.reason, "Skipping entry");
                listing.skipped.push(skipped);
            }
        }
    }

    Ok(listing)
}

/// Describe a single walked path.
pub fn describe_entry(root: &ServeRoot, path: &Path, is_symlink: bool) -> EntryOutcome {
    let skip = |reason| {
        EntryOutcome::Skipped(SkippedEntry {
            path: Some(path.to_path_buf()),
            reason,
        })
    };

    if is_symlink {
        match fs::canonicalize(path) {
            Ok(target) if !root.contains(&target) => return skip(SkipReason::OutsideRoot),
            Ok(_) => {}
            Err(e) => return skip(SkipReason::Unreadable(e.to_string())),
        }
    }

    let Some(relative) = root.relative_path(path) else {
        return skip(SkipReason::InvalidName);
    };

    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => return skip(SkipReason::Unreadable(e.to_string())),
    };

    let (is_directory, size) = match kind_of(&metadata) {
        ObjectKind::File => (false, metadata.len()),
        ObjectKind::Directory => (true, 0),
        ObjectKind::Absent | ObjectKind::Other => return skip(SkipReason::Unsupported),
    };

    EntryOutcome::Listed(FilesystemEntry {
        path: relative,
        is_directory,
        size,
        mtime: mtime_secs(&metadata),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ServeRoot) {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub/deep")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), "hello").unwrap();
        fs::write(temp_dir.path().join("sub/b.txt"), "bye").unwrap();
        fs::write(temp_dir.path().join("sub/deep/c.txt"), "deeper").unwrap();
        let root = ServeRoot::new(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    fn paths(listing: &TreeListing) -> HashSet<String> {
        listing.tree.entries.iter().map(|e| e.path.clone()).collect()
    }

    #[test]
    fn test_list_immediate_children() {
        let (_temp_dir, root) = setup();

        let listing = list(&root, &root.resolve("").unwrap(), false).unwrap();

        let expected: HashSet<String> = ["a.txt", "sub"].iter().map(|s| s.to_string()).collect();
        assert_eq!(paths(&listing), expected);
        assert!(listing.skipped.is_empty());

        let a = listing.tree.find("a.txt").unwrap();
        assert!(!a.is_directory);
        assert_eq!(a.size, 5);

        let sub = listing.tree.find("sub").unwrap();
        assert!(sub.is_directory);
        assert_eq!(sub.size, 0);
    }

    #[test]
    fn test_list_recursive() {
        let (_temp_dir, root) = setup();

        let listing = list(&root, &root.resolve("").unwrap(), true).unwrap();

        let expected: HashSet<String> = ["a.txt", "sub", "sub/b.txt", "sub/deep", "sub/deep/c.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(paths(&listing), expected);
        assert_eq!(listing.tree.find("sub/deep/c.txt").unwrap().size, 6);
    }

    #[test]
    fn test_list_subdirectory_paths_relative_to_root() {
        let (_temp_dir, root) = setup();

        let listing = list(&root, &root.resolve("sub").unwrap(), false).unwrap();

        let expected: HashSet<String> = ["sub/b.txt", "sub/deep"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(paths(&listing), expected);
        assert!(listing.tree.entries.iter().all(|e| !e.path.contains('\\')));
    }

    #[test]
    fn test_list_empty_directory() {
        let (temp_dir, root) = setup();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();

        let listing = list(&root, &root.resolve("empty").unwrap(), true).unwrap();
        assert!(listing.tree.is_empty());
    }

    #[test]
    fn test_list_missing_directory() {
        let (_temp_dir, root) = setup();

        let result = list(&root, &root.resolve("nope").unwrap(), false);
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }

    #[test]
    fn test_list_file_is_invalid_type() {
        let (_temp_dir, root) = setup();

        let result = list(&root, &root.resolve("a.txt").unwrap(), false);
        assert!(matches!(result, Err(FileError::InvalidType { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_skips_symlink_outside_root() {
        use std::os::unix::fs::symlink;

        let (temp_dir, root) = setup();
        let other_dir = TempDir::new().unwrap();
        fs::write(other_dir.path().join("secret.txt"), "Secret").unwrap();
        symlink(
            other_dir.path().join("secret.txt"),
            temp_dir.path().join("sneaky"),
        )
        .unwrap();

        let listing = list(&root, &root.resolve("").unwrap(), false).unwrap();

        assert!(listing.tree.find("sneaky").is_none());
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].reason, SkipReason::OutsideRoot);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_skips_dangling_symlink() {
        use std::os::unix::fs::symlink;

        let (temp_dir, root) = setup();
        symlink(temp_dir.path().join("gone"), temp_dir.path().join("dangling")).unwrap();

        let listing = list(&root, &root.resolve("").unwrap(), false).unwrap();

        assert!(listing.tree.find("dangling").is_none());
        assert!(matches!(
            listing.skipped[0].reason,
            SkipReason::Unreadable(_)
        ));
        assert_eq!(listing.tree.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_symlinked_directory_not_descended() {
        use std::os::unix::fs::symlink;

        let (temp_dir, root) = setup();
        symlink(temp_dir.path().join("sub"), temp_dir.path().join("alias")).unwrap();

        let listing = list(&root, &root.resolve("").unwrap(), true).unwrap();

        let alias = listing.tree.find("alias").unwrap();
        assert!(alias.is_directory);
        assert!(listing.tree.find("alias/b.txt").is_none());
    }

    #[test]
    fn test_describe_entry_reports_vanished_entry() {
        let (_temp_dir, root) = setup();

        let outcome = describe_entry(&root, &root.path().join("vanished.txt"), false);
        assert!(matches!(
            outcome,
            EntryOutcome::Skipped(SkippedEntry {
                reason: SkipReason::Unreadable(_),
                ..
            })
        ));
    }
}
