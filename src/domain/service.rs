//! Ports to the remote messaging service.
//!
//! The service answers with loosely shaped items; every field that may be
//! absent is an `Option` here, and only the extractor maps them into
//! validated domain records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::Result;

/// One reaction in a message's recent-reactions list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReaction {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Absent for custom (non-emoji) reactions.
    #[serde(default)]
    pub emoticon: Option<String>,
}

/// A history item as returned by the service.
///
/// Service events (joins, pins, title changes) come through as items with no
/// text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub from_id: Option<i64>,
    #[serde(default)]
    pub reply_to_msg_id: Option<i64>,
    #[serde(default)]
    pub recent_reactions: Vec<RawReaction>,
}

impl RawMessage {
    /// Whether the item carries content rather than a service event.
    #[must_use]
    pub fn is_content(&self) -> bool {
        self.id.is_some_and(|id| id != 0)
            && self.text.as_deref().is_some_and(|t| !t.is_empty())
            && self.date.is_some()
    }
}

/// Profile attributes of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfile {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Session lifecycle of the remote service.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Opens the session.
    async fn connect(&self) -> Result<()>;

    /// Closes the session. Closing a closed session is a no-op.
    async fn disconnect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;
}

/// Read API of the remote service. Every call fails with `Connection` when
/// the session is not open.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Newest message dated at or before `date`.
    async fn message_at_or_before(
        &self,
        chat_id: i64,
        date: DateTime<Utc>,
    ) -> Result<Option<RawMessage>>;

    /// Oldest message with an id strictly greater than `msg_id`.
    async fn message_after(&self, chat_id: i64, msg_id: i64) -> Result<Option<RawMessage>>;

    /// All items with `min_id <= id <= max_id`; a `0` bound is unbounded.
    async fn messages_in_range(
        &self,
        chat_id: i64,
        min_id: i64,
        max_id: i64,
    ) -> Result<Vec<RawMessage>>;

    /// Profile lookup, failing with `NotFound` for unknown or deleted users.
    async fn resolve_user(&self, user_id: i64) -> Result<RawProfile>;
}
