//! Mapping from raw service items to domain records.
//!
//! Only the fields the archive needs are read; anything missing becomes a
//! validation failure in the domain constructors.

use chrono::Local;

use crate::domain::{
    AppError, Message, Participant, RawMessage, RawProfile, RawReaction, Reaction, Result,
};

/// Maps one reaction of message `msg_id`.
///
/// # Errors
/// Returns `Validation` if the reaction lacks a user, a date or an emoticon.
pub fn map_reaction(chat_id: i64, msg_id: i64, raw: &RawReaction) -> Result<Reaction> {
    let date = raw
        .date
        .ok_or_else(|| AppError::validation("reaction", format!("no date on message {msg_id}")))?;

    Reaction::new(
        chat_id,
        msg_id,
        raw.user_id.unwrap_or_default(),
        date.with_timezone(&Local),
        raw.emoticon.clone().unwrap_or_default(),
    )
}

/// Maps a content item into a message with its reactions.
///
/// A user listed more than once keeps one reaction, the last one listed, in
/// the position of their first.
///
/// # Errors
/// Returns `Validation` if the item or any of its reactions is malformed.
pub fn map_message(chat_id: i64, raw: &RawMessage) -> Result<Message> {
    let msg_id = raw.id.unwrap_or_default();
    let date = raw
        .date
        .ok_or_else(|| AppError::validation("message", format!("no date on message {msg_id}")))?;

    let mut reactions: Vec<Reaction> = Vec::with_capacity(raw.recent_reactions.len());
    for r in &raw.recent_reactions {
        let reaction = map_reaction(chat_id, msg_id, r)?;
        match reactions
            .iter_mut()
            .find(|seen| seen.user_id() == reaction.user_id())
        {
            Some(seen) => *seen = reaction,
            None => reactions.push(reaction),
        }
    }

    Message::new(
        chat_id,
        raw.from_id.unwrap_or_default(),
        msg_id,
        raw.text.clone().unwrap_or_default(),
        date.with_timezone(&Local),
        raw.reply_to_msg_id,
        reactions,
    )
}

/// Maps a resolved profile. Missing names become empty strings.
///
/// # Errors
/// Returns `Validation` if the profile has no username.
pub fn map_participant(chat_id: i64, raw: RawProfile) -> Result<Participant> {
    Participant::new(
        chat_id,
        raw.id,
        raw.username.unwrap_or_default(),
        raw.first_name.unwrap_or_default(),
        raw.last_name.unwrap_or_default(),
    )
}
