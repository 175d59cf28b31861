//! JSON snapshots of extracted data.
//!
//! A snapshot lets a later run persist the same messages and users without
//! talking to the service again. Reading one re-validates every record.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AppError, Message, Participant, Result};

/// Extracted data of one chat at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub chat_id: i64,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub participants: Vec<Participant>,
}

impl Snapshot {
    /// Creates a snapshot stamped with the current time.
    #[must_use]
    pub fn new(chat_id: i64, messages: Vec<Message>, participants: Vec<Participant>) -> Self {
        Self {
            chat_id,
            created_at: Utc::now(),
            messages,
            participants,
        }
    }

    /// File name for this snapshot.
    #[must_use]
    pub fn file_name(&self, session_name: &str) -> String {
        format!(
            "{session_name}_{}_{}.json",
            self.chat_id,
            self.created_at.format("%Y-%m-%d_%H-%M-%S")
        )
    }
}

/// Writes a snapshot into `dir`, creating it if needed.
///
/// # Errors
/// Returns error if the directory or file cannot be written.
pub fn write_snapshot(dir: &Path, session_name: &str, snapshot: &Snapshot) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create {}", dir.display()), e))?;

    let path = dir.join(snapshot.file_name(session_name));
    let content = serde_json::to_vec_pretty(snapshot).map_err(AppError::json_parse)?;

    fs::write(&path, content)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(
        path = %path.display(),
        messages = snapshot.messages.len(),
        users = snapshot.participants.len(),
        "Snapshot saved"
    );

    Ok(path)
}

/// Reads a snapshot back.
///
/// # Errors
/// Returns `JsonParse` for malformed files, including records that fail
/// validation.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = fs::read(path)
        .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;

    let snapshot: Snapshot = serde_json::from_slice(&content).map_err(AppError::json_parse)?;

    if let Some(stray) = snapshot
        .messages
        .iter()
        .map(Message::chat_id)
        .chain(snapshot.participants.iter().map(Participant::chat_id))
        .find(|id| *id != snapshot.chat_id)
    {
        return Err(AppError::InvalidData {
            message: format!(
                "snapshot for chat {} contains a record of chat {stray}",
                snapshot.chat_id
            ),
        });
    }

    Ok(snapshot)
}
