//! Domain models for archived chat data.
//!
//! Every record is validated when it is built, including when it is read back
//! from a snapshot, so a partially valid instance can never exist.

use std::collections::HashSet;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// A reaction left by one user on one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReactionRecord")]
pub struct Reaction {
    chat_id: i64,
    msg_id: i64,
    user_id: i64,
    date: DateTime<Local>,
    emoticon: String,
}

impl Reaction {
    /// Builds a validated reaction.
    ///
    /// # Errors
    /// Returns `Validation` if an id is not positive or the emoticon is empty.
    pub fn new(
        chat_id: i64,
        msg_id: i64,
        user_id: i64,
        date: DateTime<Local>,
        emoticon: impl Into<String>,
    ) -> Result<Self> {
        let emoticon = emoticon.into();

        if msg_id <= 0 {
            return Err(AppError::validation("reaction", format!("msg id {msg_id}")));
        }
        if user_id <= 0 {
            return Err(AppError::validation("reaction", format!("user id {user_id}")));
        }
        if emoticon.is_empty() {
            return Err(AppError::validation("reaction", "empty emoticon"));
        }

        Ok(Self {
            chat_id,
            msg_id,
            user_id,
            date,
            emoticon,
        })
    }

    #[must_use]
    pub const fn chat_id(&self) -> i64 {
        self.chat_id
    }

    #[must_use]
    pub const fn msg_id(&self) -> i64 {
        self.msg_id
    }

    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    #[must_use]
    pub fn emoticon(&self) -> &str {
        &self.emoticon
    }
}

#[derive(Deserialize)]
struct ReactionRecord {
    chat_id: i64,
    msg_id: i64,
    user_id: i64,
    date: DateTime<Local>,
    emoticon: String,
}

impl TryFrom<ReactionRecord> for Reaction {
    type Error = AppError;

    fn try_from(r: ReactionRecord) -> Result<Self> {
        Self::new(r.chat_id, r.msg_id, r.user_id, r.date, r.emoticon)
    }
}

/// A text message in a chat, owning its reactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageRecord")]
pub struct Message {
    chat_id: i64,
    user_id: i64,
    msg_id: i64,
    text: String,
    date: DateTime<Local>,
    reply_to_msg_id: Option<i64>,
    reactions: Vec<Reaction>,
}

impl Message {
    /// Builds a validated message.
    ///
    /// # Errors
    /// Returns `Validation` if an id is not positive, the text is empty, a
    /// reaction belongs to a different message, or a user reacted twice.
    pub fn new(
        chat_id: i64,
        user_id: i64,
        msg_id: i64,
        text: impl Into<String>,
        date: DateTime<Local>,
        reply_to_msg_id: Option<i64>,
        reactions: Vec<Reaction>,
    ) -> Result<Self> {
        let text = text.into();

        if msg_id <= 0 {
            return Err(AppError::validation("message", format!("msg id {msg_id}")));
        }
        if user_id <= 0 {
            return Err(AppError::validation("message", format!("user id {user_id}")));
        }
        if text.is_empty() {
            return Err(AppError::validation("message", "empty text"));
        }
        if let Some(reply_to) = reply_to_msg_id {
            if reply_to <= 0 {
                return Err(AppError::validation(
                    "message",
                    format!("reply-to msg id {reply_to}"),
                ));
            }
        }
        if let Some(stray) = reactions
            .iter()
            .find(|r| r.chat_id != chat_id || r.msg_id != msg_id)
        {
            return Err(AppError::validation(
                "message",
                format!(
                    "reaction for message {} in chat {} attached to message {msg_id}",
                    stray.msg_id, stray.chat_id
                ),
            ));
        }
        let mut reactors = HashSet::with_capacity(reactions.len());
        if let Some(dup) = reactions.iter().find(|r| !reactors.insert(r.user_id)) {
            return Err(AppError::validation(
                "message",
                format!("user {} reacted twice to message {msg_id}", dup.user_id),
            ));
        }

        Ok(Self {
            chat_id,
            user_id,
            msg_id,
            text,
            date,
            reply_to_msg_id,
            reactions,
        })
    }

    #[must_use]
    pub const fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Id of the author.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    #[must_use]
    pub const fn msg_id(&self) -> i64 {
        self.msg_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn date(&self) -> DateTime<Local> {
        self.date
    }

    #[must_use]
    pub const fn reply_to_msg_id(&self) -> Option<i64> {
        self.reply_to_msg_id
    }

    #[must_use]
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }
}

#[derive(Deserialize)]
struct MessageRecord {
    chat_id: i64,
    user_id: i64,
    msg_id: i64,
    text: String,
    date: DateTime<Local>,
    #[serde(default)]
    reply_to_msg_id: Option<i64>,
    #[serde(default)]
    reactions: Vec<Reaction>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = AppError;

    fn try_from(r: MessageRecord) -> Result<Self> {
        Self::new(
            r.chat_id,
            r.user_id,
            r.msg_id,
            r.text,
            r.date,
            r.reply_to_msg_id,
            r.reactions,
        )
    }
}

/// A user referenced by a message or reaction in one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ParticipantRecord")]
pub struct Participant {
    chat_id: i64,
    user_id: i64,
    user_name: String,
    first_name: String,
    last_name: String,
}

impl Participant {
    /// Builds a validated participant. Names may be empty, the handle may not.
    ///
    /// # Errors
    /// Returns `Validation` if the user id is not positive or the handle is empty.
    pub fn new(
        chat_id: i64,
        user_id: i64,
        user_name: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self> {
        let user_name = user_name.into();

        if user_id <= 0 {
            return Err(AppError::validation("user", format!("user id {user_id}")));
        }
        if user_name.is_empty() {
            return Err(AppError::validation("user", "empty user name"));
        }

        Ok(Self {
            chat_id,
            user_id,
            user_name,
            first_name: first_name.into(),
            last_name: last_name.into(),
        })
    }

    #[must_use]
    pub const fn chat_id(&self) -> i64 {
        self.chat_id
    }

    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}

#[derive(Deserialize)]
struct ParticipantRecord {
    chat_id: i64,
    user_id: i64,
    user_name: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

impl TryFrom<ParticipantRecord> for Participant {
    type Error = AppError;

    fn try_from(r: ParticipantRecord) -> Result<Self> {
        Self::new(r.chat_id, r.user_id, r.user_name, r.first_name, r.last_name)
    }
}

/// Summary statistics for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Raw items returned by the service, anchors included.
    pub fetched: usize,
    /// Items accepted as messages.
    pub accepted: usize,
    /// Non-content items skipped (joins, pins, ...).
    pub skipped: usize,
    /// Reactions across accepted messages.
    pub reactions: usize,
    /// Participant ids resolved to a profile.
    pub participants_resolved: usize,
    /// Participant ids the service could not resolve.
    pub participants_missing: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_message_rejects_bad_fields() {
        assert!(Message::new(1, 5, 0, "hi", at(0), None, vec![]).is_err());
        assert!(Message::new(1, 0, 10, "hi", at(0), None, vec![]).is_err());
        assert!(Message::new(1, 5, 10, "", at(0), None, vec![]).is_err());
        assert!(Message::new(1, 5, 10, "hi", at(0), Some(0), vec![]).is_err());
        assert!(Message::new(1, 5, 10, "hi", at(0), Some(9), vec![]).is_ok());
    }

    #[test]
    fn test_message_rejects_foreign_reaction() {
        let reaction = Reaction::new(1, 11, 7, at(0), "👍").unwrap();
        let err = Message::new(1, 5, 10, "hi", at(0), None, vec![reaction]).unwrap_err();
        assert!(matches!(err, AppError::Validation { entity: "message", .. }));
    }

    #[test]
    fn test_message_rejects_duplicate_reactor() {
        let first = Reaction::new(1, 10, 7, at(0), "👍").unwrap();
        let second = Reaction::new(1, 10, 7, at(5), "🔥").unwrap();

        let err = Message::new(1, 5, 10, "hi", at(0), None, vec![first, second]).unwrap_err();
        assert!(matches!(err, AppError::Validation { entity: "message", .. }));
    }

    #[test]
    fn test_reaction_validation() {
        assert!(Reaction::new(1, 10, 0, at(0), "👍").is_err());
        assert!(Reaction::new(1, 10, 7, at(0), "").is_err());
        assert!(Reaction::new(1, 0, 7, at(0), "👍").is_err());
    }

    #[test]
    fn test_participant_validation() {
        assert!(Participant::new(1, 7, "", "Ann", "").is_err());
        assert!(Participant::new(1, -7, "ann", "Ann", "").is_err());

        let p = Participant::new(1, 7, "ann", "", "").unwrap();
        assert_eq!(p.first_name(), "");
        assert_eq!(p.user_name(), "ann");
    }

    #[test]
    fn test_deserialize_revalidates() {
        let json = r#"{"chat_id":1,"user_id":5,"msg_id":10,"text":"","date":"2024-05-01T10:00:00+00:00"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());

        let json = r#"{"chat_id":1,"user_id":7,"user_name":"ann"}"#;
        let p: Participant = serde_json::from_str(json).unwrap();
        assert_eq!(p.last_name(), "");
    }

    #[test]
    fn test_serde_keeps_reactions() {
        let reaction = Reaction::new(1, 10, 7, at(100), "🔥").unwrap();
        let msg = Message::new(1, 5, 10, "hi", at(50), Some(3), vec![reaction]).unwrap();

        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();

        assert_eq!(back, msg);
        assert_eq!(back.reactions()[0].emoticon(), "🔥");
    }
}
