//! Wire message definitions for the file server.
//!
//! Every response body of the HTTP API is one of the types in this module,
//! serialized as JSON. Clients can use the same types to decode responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Route of the entry metadata endpoint.
pub const ENTRY_INFO_PATH: &str = "/api/entry_info";

/// Route of the download endpoint.
pub const DOWNLOAD_PATH: &str = "/api/download";

/// Route of the directory listing endpoint.
pub const FILESYSTEM_TREE_PATH: &str = "/api/filesystem_tree";

/// Kind of a filesystem object as reported by the entry info endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Absent, or an object type that is not served (device, socket, ...).
    NotFound,
}

impl EntryKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::NotFound => "not_found",
        }
    }
}

/// Metadata for a single requested path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// The path as the client supplied it.
    pub path: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (0 unless the entry is a file).
    #[serde(default)]
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds, 0 if unavailable).
    #[serde(default)]
    pub mtime: i64,
}

impl EntryInfo {
    /// Entry info for a path that does not exist.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::NotFound,
            size: 0,
            mtime: 0,
        }
    }

    /// Decode from a JSON response body.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A single entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemEntry {
    /// Path relative to the served root, always `/`-separated.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds, 0 if unavailable).
    pub mtime: i64,
}

/// A directory listing in traversal order.
///
/// The order is whatever the underlying directory walk produced; it is not
/// sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemTree {
    /// Listed entries.
    pub entries: Vec<FilesystemEntry>,
}

impl FilesystemTree {
    /// Look up an entry by its root-relative path.
    pub fn find(&self, path: &str) -> Option<&FilesystemEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode from a JSON response body.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Description of the running service, returned from `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Absolute path of the served root directory.
    pub root_directory: String,
    /// Endpoint name to usage string.
    pub endpoints: BTreeMap<String, String>,
}

impl ServiceInfo {
    /// Build the service description for the given root.
    pub fn new(name: &str, version: &str, root_directory: impl Into<String>) -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "entry_info".to_string(),
            format!("GET {ENTRY_INFO_PATH}?path=<path>"),
        );
        endpoints.insert(
            "download".to_string(),
            format!("GET {DOWNLOAD_PATH}?path=<path>&compress=<bool>"),
        );
        endpoints.insert(
            "filesystem_tree".to_string(),
            format!("GET {FILESYSTEM_TREE_PATH}?path=<path>&recursive=<bool>"),
        );

        Self {
            name: name.to_string(),
            version: version.to_string(),
            root_directory: root_directory.into(),
            endpoints,
        }
    }
}

/// Body of every non-success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short human-readable description.
    pub detail: String,
}

impl ErrorBody {
    /// Create an error body.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
