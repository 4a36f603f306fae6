//! Read-only file operations below the served root.
//!
//! This module provides:
//! - Path resolution with containment checks
//! - Metadata lookup for a single path
//! - Flat and recursive directory listings
//! - In-memory ZIP archives of directories
//! - Chunked streaming of single files
//!
//! # Security
//!
//! Every client path goes through [`ServeRoot::resolve`] first. Paths are
//! canonicalized before the containment check, so `..` components and
//! symlinks cannot reach outside the root. Listings and archives also leave
//! out symlinks whose targets lie outside the root.

pub mod archive;
pub mod error;
pub mod inspect;
pub mod resolver;
pub mod stream;
pub mod tree;

pub use archive::{archive_name, build_archive, ArchiveSummary, ARCHIVE_EXTENSION};
pub use error::FileError;
pub use inspect::{inspect, probe, ObjectKind};
pub use resolver::{ResolvedPath, RootError, ServeRoot};
pub use stream::{FileStream, DEFAULT_CHUNK_SIZE};
pub use tree::{list, EntryOutcome, SkipReason, SkippedEntry, TreeListing};
