//! Metadata lookup for a single resolved path.

use std::fs::{self, Metadata};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use protocol::{EntryInfo, EntryKind};

use super::resolver::ResolvedPath;

/// Seconds since the Unix epoch of the modification time, or 0.
pub(crate) fn mtime_secs(metadata: &Metadata) -> i64 {
    metadata.modified().map(unix_secs).unwrap_or(0)
}

/// Convert a `SystemTime` to Unix seconds, 0 if before the epoch.
pub fn unix_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// What a resolved path points at, following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Nothing there (or it cannot be stat'ed).
    Absent,
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Device, socket, FIFO and the like.
    Other,
}

impl ObjectKind {
    /// The kind reported to clients; unsupported objects look absent.
    pub fn entry_kind(self) -> EntryKind {
        match self {
            Self::File => EntryKind::File,
            Self::Directory => EntryKind::Directory,
            Self::Absent | Self::Other => EntryKind::NotFound,
        }
    }
}

pub(crate) fn kind_of(metadata: &Metadata) -> ObjectKind {
    if metadata.is_file() {
        ObjectKind::File
    } else if metadata.is_dir() {
        ObjectKind::Directory
    } else {
        ObjectKind::Other
    }
}

/// Kind of the object at a resolved path.
pub fn probe(path: &ResolvedPath) -> ObjectKind {
    match fs::metadata(path.as_path()) {
        Ok(metadata) => kind_of(&metadata),
        Err(e) => {
            log_stat_failure(path, &e);
            ObjectKind::Absent
        }
    }
}

/// Describe the object at a resolved path.
///
/// Never fails: absent paths and unsupported object types are reported as
/// [`EntryKind::NotFound`], and an unreadable modification time becomes 0.
pub fn inspect(path: &ResolvedPath) -> EntryInfo {
    let metadata = match fs::metadata(path.as_path()) {
        Ok(m) => m,
        Err(e) => {
            log_stat_failure(path, &e);
            return EntryInfo::not_found(path.requested());
        }
    };

    match kind_of(&metadata) {
        ObjectKind::File => EntryInfo {
            path: path.requested().to_string(),
            kind: EntryKind::File,
            size: metadata.len(),
            mtime: mtime_secs(&metadata),
        },
        ObjectKind::Directory => EntryInfo {
            path: path.requested().to_string(),
            kind: EntryKind::Directory,
            size: 0,
            mtime: mtime_secs(&metadata),
        },
        ObjectKind::Absent | ObjectKind::Other => EntryInfo::not_found(path.requested()),
    }
}

fn log_stat_failure(path: &ResolvedPath, error: &io::Error) {
    if error.kind() != io::ErrorKind::NotFound {
        tracing::debug!(requested = %path.requested(), error = %error, "Cannot stat path");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::ServeRoot;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ServeRoot) {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), "hello").unwrap();
        fs::write(temp_dir.path().join("empty.bin"), "").unwrap();
        let root = ServeRoot::new(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_inspect_file() {
        let (_temp_dir, root) = setup();

        let info = inspect(&root.resolve("a.txt").unwrap());
        assert_eq!(info.path, "a.txt");
        assert_eq!(info.kind, EntryKind::File);
        assert_eq!(info.size, 5);
        assert!(info.mtime > 0);
    }

    #[test]
    fn test_inspect_empty_file() {
        let (_temp_dir, root) = setup();

        let info = inspect(&root.resolve("empty.bin").unwrap());
        assert_eq!(info.kind, EntryKind::File);
        assert_eq!(info.size, 0);
    }

    #[test]
    fn test_inspect_directory() {
        let (_temp_dir, root) = setup();

        let info = inspect(&root.resolve("sub").unwrap());
        assert_eq!(info.kind, EntryKind::Directory);
        assert_eq!(info.size, 0);
        assert!(info.mtime > 0);
    }

    #[test]
    fn test_inspect_root() {
        let (_temp_dir, root) = setup();

        let info = inspect(&root.resolve("").unwrap());
        assert_eq!(info.kind, EntryKind::Directory);
        assert_eq!(info.path, "");
    }

    #[test]
    fn test_inspect_missing() {
        let (_temp_dir, root) = setup();

        let info = inspect(&root.resolve("missing.txt").unwrap());
        assert_eq!(info, EntryInfo::not_found("missing.txt"));
    }

    #[test]
    fn test_inspect_below_a_file() {
        let (_temp_dir, root) = setup();

        let info = inspect(&root.resolve("a.txt/child").unwrap());
        assert_eq!(info.kind, EntryKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_inspect_socket_is_not_found() {
        use std::os::unix::net::UnixListener;

        let (temp_dir, root) = setup();
        let _listener = UnixListener::bind(temp_dir.path().join("sock")).unwrap();

        let info = inspect(&root.resolve("sock").unwrap());
        assert_eq!(info.kind, EntryKind::NotFound);
        assert_eq!(info.size, 0);
        assert_eq!(info.mtime, 0);
    }

    #[test]
    fn test_probe() {
        let (_temp_dir, root) = setup();

        assert_eq!(probe(&root.resolve("a.txt").unwrap()), ObjectKind::File);
        assert_eq!(probe(&root.resolve("sub").unwrap()), ObjectKind::Directory);
        assert_eq!(probe(&root.resolve("nope").unwrap()), ObjectKind::Absent);
        assert_eq!(ObjectKind::Other.entry_kind(), EntryKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_socket_is_other() {
        use std::os::unix::net::UnixListener;

        let (temp_dir, root) = setup();
        let _listener = UnixListener::bind(temp_dir.path().join("sock")).unwrap();

        assert_eq!(probe(&root.resolve("sock").unwrap()), ObjectKind::Other);
    }

    #[test]
    fn test_unix_secs() {
        let time = UNIX_EPOCH + Duration::from_secs(1704067200);
        assert_eq!(unix_secs(time), 1704067200);
        assert_eq!(unix_secs(UNIX_EPOCH - Duration::from_secs(10)), 0);
    }
}
