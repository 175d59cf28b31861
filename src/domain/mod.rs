//! Domain layer - core types and ports.
//!
//! This layer contains validated records, error types and the traits the
//! application talks to, without any external dependencies (DB, IO, etc.).

pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use dates::DateRange;
pub use error::{AppError, EntityRef, FailureKind, Result};
pub use models::{ExtractionStats, Message, Participant, Reaction};
pub use service::{ChatService, RawMessage, RawProfile, RawReaction, SessionProvider};
