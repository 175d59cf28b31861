//! Infrastructure layer - external adapters (database, filesystem, service).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod archive_service;
pub mod config;
pub mod snapshot;
pub mod store;

pub use archive_service::ArchiveService;
pub use config::{ensure_config_exists, load_config, render_config};
pub use snapshot::{read_snapshot, write_snapshot, Snapshot};
pub use store::{init_database, SqliteStore, TableCounts};
