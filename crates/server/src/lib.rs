//! # File Server Library
//!
//! A read-only HTTP server exposing one directory tree to remote clients.
//!
//! ## Overview
//!
//! - **Service info** (`GET /`): name, version, served root and endpoint usage
//! - **Entry info** (`GET /api/entry_info`): metadata for a single path
//! - **Download** (`GET /api/download`): a file's bytes, or a directory as a ZIP
//! - **Filesystem tree** (`GET /api/filesystem_tree`): flat or recursive listing
//!
//! Every client path is resolved against the served root and rejected if it
//! ends up outside it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   HttpServer                     │
//! ├──────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────┐  │
//! │  │                  Router                    │  │
//! │  └────────────────────────────────────────────┘  │
//! │  ┌──────────┐ ┌─────────┐ ┌────────┐ ┌────────┐  │
//! │  │ Resolver │ │ Inspect │ │  Tree  │ │Archive │  │
//! │  └──────────┘ └─────────┘ └────────┘ └────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use server::{build_router, AppState, HttpServer, ServeRoot, DEFAULT_CHUNK_SIZE};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let root = ServeRoot::new("/srv/files")?;
//!     let router = build_router(AppState::new(root, DEFAULT_CHUNK_SIZE));
//!
//!     let server = HttpServer::bind("127.0.0.1:8080".parse()?).await?;
//!     server.serve(router, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod files;
pub mod logging;
pub mod router;
pub mod server;

pub use config::{Config, ConfigError};
pub use files::{FileError, ResolvedPath, RootError, ServeRoot, DEFAULT_CHUNK_SIZE};
pub use router::{build_router, AppState, RouterError, SERVICE_NAME};
pub use server::{shutdown_signal, HttpServer};
