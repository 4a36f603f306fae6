//! # File Server Protocol Library
//!
//! Wire types for the read-only file server HTTP API.
//!
//! ## Overview
//!
//! - **Entry metadata**: [`EntryInfo`] and [`EntryKind`] for `GET /api/entry_info`
//! - **Listings**: [`FilesystemTree`] and [`FilesystemEntry`] for `GET /api/filesystem_tree`
//! - **Service description**: [`ServiceInfo`] for `GET /`
//! - **Errors**: [`ErrorBody`] for every non-success response
//!
//! Downloads (`GET /api/download`) return raw bytes and have no message type.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{EntryInfo, EntryKind};
//!
//! let info = EntryInfo::from_json(br#"{"path":"a.txt","type":"file","size":5,"mtime":0}"#).unwrap();
//! assert_eq!(info.kind, EntryKind::File);
//! assert_eq!(info.size, 5);
//! ```

pub mod error;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use messages::{
    EntryInfo, EntryKind, ErrorBody, FilesystemEntry, FilesystemTree, ServiceInfo,
    DOWNLOAD_PATH, ENTRY_INFO_PATH, FILESYSTEM_TREE_PATH,
};
