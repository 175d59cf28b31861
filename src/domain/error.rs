//! Domain-level error types for chat-archiver.
//!
//! All errors are typed with `thiserror`. The first four variants are the
//! export failure taxonomy; the rest cover configuration, files and storage
//! setup around the pipeline.

use std::fmt;

use thiserror::Error;

/// Identity of a persisted entity, carried by write failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Message { chat_id: i64, msg_id: i64 },
    Reaction { chat_id: i64, msg_id: i64, user_id: i64 },
    Participant { chat_id: i64, user_id: i64 },
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message { chat_id, msg_id } => {
                write!(f, "message {msg_id} in chat {chat_id}")
            }
            Self::Reaction {
                chat_id,
                msg_id,
                user_id,
            } => write!(
                f,
                "reaction of user {user_id} on message {msg_id} in chat {chat_id}"
            ),
            Self::Participant { chat_id, user_id } => {
                write!(f, "user {user_id} in chat {chat_id}")
            }
        }
    }
}

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Connection,
    NotFound,
    Write,
    Other,
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// A domain object failed its invariants at construction.
    #[error("Invalid {entity}: {message}")]
    Validation {
        entity: &'static str,
        message: String,
    },

    /// Session with the remote service is unavailable.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Profile lookup for a user id found nothing.
    #[error("User {user_id} not found")]
    NotFound { user_id: i64 },

    /// The store rejected an upsert.
    #[error("Failed to write {entity}: {source}")]
    Write {
        entity: EntityRef,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to open or prepare the database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed service item or snapshot.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a validation error for the named entity.
    pub fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            entity,
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a write error for a rejected upsert.
    pub fn write(entity: EntityRef, err: rusqlite::Error) -> Self {
        Self::Write {
            entity,
            source: Box::new(err),
        }
    }

    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Validation { .. } => FailureKind::Validation,
            Self::Connection { .. } => FailureKind::Connection,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Write { .. } => FailureKind::Write,
            _ => FailureKind::Other,
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
