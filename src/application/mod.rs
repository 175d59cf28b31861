//! Application layer - use cases and orchestration.
//!
//! This layer resolves export windows, extracts chats from the service and
//! persists the results.

pub mod boundary;
pub mod export;
pub mod extractor;
pub mod formatter;
pub mod mapper;
pub mod observer;
pub mod persistence;
pub mod progress;

pub use export::{export, ExportRequest};
pub use formatter::{format_extraction_stats, format_table_counts};
pub use observer::TracingLog;
pub use persistence::{PersistenceOrchestrator, SaveSummary};
pub use progress::{with_progress, NoProgress, ProgressSink, TerminalProgress};
