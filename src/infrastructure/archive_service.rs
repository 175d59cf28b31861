//! In-memory chat service over captured API data.
//!
//! Replays a capture file (`{"chat_id": ..., "messages": [...], "users": [...]}`)
//! with the same lookup semantics as the live service, so an export can be
//! rerun offline against a fixed history. A capture holds one chat; queries
//! for any other chat are rejected.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{
    AppError, ChatService, RawMessage, RawProfile, Result, SessionProvider,
};

#[derive(Debug, Deserialize)]
struct Capture {
    chat_id: i64,
    #[serde(default)]
    messages: Vec<RawMessage>,
    #[serde(default)]
    users: Vec<RawProfile>,
}

/// Chat service backed by an id-ordered message history.
#[derive(Debug, Default)]
pub struct ArchiveService {
    chat_id: i64,
    /// Items with an id, keyed by it. Items without an id are kept aside
    /// and only surface through unbounded range queries.
    messages: BTreeMap<i64, RawMessage>,
    unnumbered: Vec<RawMessage>,
    users: HashMap<i64, RawProfile>,
    connected: AtomicBool,
}

impl ArchiveService {
    /// Builds a service for `chat_id` from raw items and profiles.
    #[must_use]
    pub fn new(chat_id: i64, messages: Vec<RawMessage>, users: Vec<RawProfile>) -> Self {
        let mut by_id = BTreeMap::new();
        let mut unnumbered = Vec::new();

        for msg in messages {
            match msg.id {
                Some(id) => {
                    by_id.insert(id, msg);
                }
                None => unnumbered.push(msg),
            }
        }

        Self {
            chat_id,
            messages: by_id,
            unnumbered,
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            connected: AtomicBool::new(false),
        }
    }

    /// Loads a capture file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid capture.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
        let capture: Capture = serde_json::from_slice(&content).map_err(AppError::json_parse)?;

        tracing::debug!(
            chat_id = capture.chat_id,
            messages = capture.messages.len(),
            users = capture.users.len(),
            "Loaded capture"
        );

        Ok(Self::new(capture.chat_id, capture.messages, capture.users))
    }

    /// Chat the capture was taken from.
    #[must_use]
    pub const fn chat_id(&self) -> i64 {
        self.chat_id
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::connection("session is not connected"))
        }
    }

    fn ensure_chat(&self, chat_id: i64) -> Result<()> {
        if chat_id == self.chat_id {
            Ok(())
        } else {
            Err(AppError::InvalidData {
                message: format!("capture holds chat {}, not chat {chat_id}", self.chat_id),
            })
        }
    }
}

#[async_trait]
impl SessionProvider for ArchiveService {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatService for ArchiveService {
    async fn message_at_or_before(
        &self,
        chat_id: i64,
        date: DateTime<Utc>,
    ) -> Result<Option<RawMessage>> {
        self.ensure_connected()?;
        self.ensure_chat(chat_id)?;

        Ok(self
            .messages
            .values()
            .rev()
            .find(|m| m.date.is_some_and(|d| d <= date))
            .cloned())
    }

    async fn message_after(&self, chat_id: i64, msg_id: i64) -> Result<Option<RawMessage>> {
        self.ensure_connected()?;
        self.ensure_chat(chat_id)?;

        let Some(next) = msg_id.checked_add(1) else {
            return Ok(None);
        };

        Ok(self.messages.range(next..).next().map(|(_, m)| m.clone()))
    }

    async fn messages_in_range(
        &self,
        chat_id: i64,
        min_id: i64,
        max_id: i64,
    ) -> Result<Vec<RawMessage>> {
        self.ensure_connected()?;
        self.ensure_chat(chat_id)?;

        let upper = if max_id == 0 { i64::MAX } else { max_id };
        if min_id > upper {
            return Ok(Vec::new());
        }

        let mut out: Vec<RawMessage> = self
            .messages
            .range(min_id..=upper)
            .map(|(_, m)| m.clone())
            .collect();

        if min_id == 0 && max_id == 0 {
            out.extend(self.unnumbered.iter().cloned());
        }

        Ok(out)
    }

    async fn resolve_user(&self, user_id: i64) -> Result<RawProfile> {
        self.ensure_connected()?;

        self.users
            .get(&user_id)
            .cloned()
            .ok_or(AppError::NotFound { user_id })
    }
}
