//! Root directory and client path resolution.
//!
//! [`ServeRoot`] is the single directory the server exposes. Every client
//! path goes through [`ServeRoot::resolve`], which canonicalizes it before
//! checking containment, so `..` components and symlinks cannot be used to
//! reach anything outside the root.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use super::error::FileError;

/// Errors raised while establishing the served root at startup.
#[derive(Debug, Error)]
pub enum RootError {
    /// The root directory does not exist.
    #[error("Directory does not exist: {0}")]
    Missing(PathBuf),

    /// The root path is not a directory.
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// IO error.
    #[error("Cannot access {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
}

/// The directory tree exposed by the server.
///
/// Holds the canonical absolute path of the root. Immutable once built and
/// shared read-only between requests.
#[derive(Debug, Clone)]
pub struct ServeRoot {
    root: PathBuf,
}

/// A client path that has been canonicalized and proven to lie inside the root.
///
/// Only [`ServeRoot::resolve`] constructs these. The target may not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    requested: String,
}

impl ResolvedPath {
    /// The canonical absolute path.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// The path as the client sent it.
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Final component of the canonical path, if any.
    pub fn file_name(&self) -> Option<String> {
        self.absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

impl ServeRoot {
    /// Establish the served root.
    ///
    /// The path is canonicalized and must name an existing directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, RootError> {
        let path = path.as_ref();
        let root = fs::canonicalize(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                RootError::Missing(path.to_path_buf())
            } else {
                RootError::Io(path.to_path_buf(), e)
            }
        })?;

        let metadata = fs::metadata(&root).map_err(|e| RootError::Io(root.clone(), e))?;
        if !metadata.is_dir() {
            return Err(RootError::NotADirectory(root));
        }

        Ok(Self { root })
    }

    /// The canonical absolute root path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether an absolute, canonical path lies inside the root.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
    }

    /// Resolve a client-supplied path against the root.
    ///
    /// Leading separators are stripped so absolute-looking paths are treated
    /// as root-relative. The joined path is canonicalized (existing prefixes
    /// through the filesystem, any missing tail lexically) and must end up
    /// at or below the root, otherwise [`FileError::Forbidden`] is returned.
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath, FileError> {
        let cleaned = requested.trim_start_matches(std::path::is_separator);
        let joined = self.root.join(cleaned);
        let absolute = canonicalize_lenient(&joined);

        if !self.contains(&absolute) {
            tracing::warn!(requested = %requested, "Rejected path outside root directory");
            return Err(FileError::Forbidden);
        }

        Ok(ResolvedPath {
            absolute,
            requested: requested.to_string(),
        })
    }

    /// Express a path below the root as a `/`-separated relative string.
    ///
    /// Returns `None` if the path is not below the root or is not valid UTF-8.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        relative_slash_path(&self.root, path)
    }
}

/// Express `path` relative to `base` using `/` separators on every platform.
pub(crate) fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Canonicalize a path whose tail may not exist.
///
/// Components are resolved one at a time through the filesystem so symlinks
/// are followed. Once a component cannot be resolved the remainder is
/// applied lexically; a later `..` that climbs back into existing territory
/// switches back to filesystem resolution.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    let mut missing = false;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
                if missing && fs::symlink_metadata(&resolved).is_ok() {
                    missing = false;
                }
            }
            Component::Normal(name) => {
                resolved.push(name);
                if !missing {
                    match fs::canonicalize(&resolved) {
                        Ok(real) => resolved = real,
                        Err(_) => missing = true,
                    }
                }
            }
        }
    }

    resolved
}
