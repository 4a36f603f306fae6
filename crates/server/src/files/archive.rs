//! ZIP archive construction for directory downloads.
//!
//! The whole archive is assembled in memory and handed back as one buffer.
//! Unlike listings, archives are all-or-nothing: any file that cannot be
//! read aborts construction.

use std::fs::{self, File};
use std::io::{self, Cursor};

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::FileError;
use super::resolver::{relative_slash_path, ResolvedPath, ServeRoot};

/// Extension used for archive downloads.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// A finished archive.
#[derive(Debug)]
pub struct ArchiveSummary {
    /// Encoded ZIP bytes.
    pub bytes: Vec<u8>,
    /// Number of file entries written.
    pub file_count: usize,
}

/// Archive every regular file below `dir`.
///
/// Entry names are relative to `dir` itself and use `/`. Directories are
/// not stored as entries. Symlinks are followed only when their target is
/// inside the served root; dangling links and links leaving the root are
/// left out. `cancel` is checked before
/// each file so an abandoned download stops reading promptly.
pub fn build_archive(
    root: &ServeRoot,
    dir: &ResolvedPath,
    cancel: &CancellationToken,
) -> Result<ArchiveSummary, FileError> {
    let metadata = fs::metadata(dir.as_path()).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
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

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut file_count = 0;

    for walked in WalkDir::new(dir.as_path()).min_depth(1).follow_links(false) {
        if cancel.is_cancelled() {
            return Err(FileError::Cancelled);
        }

        let entry = walked.map_err(io::Error::from)?;
        let path = entry.path();

        if entry.path_is_symlink() {
            match fs::canonicalize(path) {
                Ok(target) if !root.contains(&target) => {
                    tracing::warn!(path = ?path, "Leaving symlink outside root out of archive");
                    continue;
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(path = ?path, "Leaving dangling symlink out of archive");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            continue;
        }

        let name = relative_slash_path(dir.as_path(), path).ok_or_else(|| {
            FileError::Internal(format!("cannot name archive entry {}", path.display()))
        })?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(metadata.len() >= u64::from(u32::MAX));
        #[cfg(unix)]
        let options = {
            use std::os::unix::fs::PermissionsExt;
            options.unix_permissions(metadata.permissions().mode())
        };

        writer.start_file(name, options)?;
        let mut file = File::open(path)?;
        io::copy(&mut file, &mut writer)?;
        file_count += 1;
    }

    let bytes = writer.finish()?.into_inner();

    Ok(ArchiveSummary { bytes, file_count })
}

/// Download file name for an archived directory.
pub fn archive_name(dir: &ResolvedPath) -> String {
    let stem = dir.file_name().unwrap_or_else(|| "archive".to_string());
    format!("{stem}.{ARCHIVE_EXTENSION}")
}
