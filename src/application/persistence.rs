//! Persistence of extracted chats.
//!
//! Writes are individual upserts in a fixed order: each message followed by
//! its reactions, then all participants. The first failing write ends the
//! save; rows written before it stay committed, so a failed save must be
//! treated as partially applied.

use std::fmt;

use crate::domain::{AppError, Message, Participant, Result};
use crate::infrastructure::SqliteStore;

use super::observer::ExportLog;
use super::progress::ProgressSink;

/// Counts of rows written by a successful save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub messages: usize,
    pub reactions: usize,
    pub participants: usize,
}

impl fmt::Display for SaveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Saved {} messages, {} reactions and {} users",
            self.messages, self.reactions, self.participants
        )
    }
}

/// Writes messages, reactions and participants to the store.
pub struct PersistenceOrchestrator<'a> {
    store: &'a SqliteStore,
    log: &'a dyn ExportLog,
    progress: &'a dyn ProgressSink,
}

impl<'a> PersistenceOrchestrator<'a> {
    #[must_use]
    pub fn new(
        store: &'a SqliteStore,
        log: &'a dyn ExportLog,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            store,
            log,
            progress,
        }
    }

    /// Saves messages with their reactions, then participants.
    ///
    /// # Errors
    /// Returns the first `Write` failure. Participants are not attempted if
    /// any message or reaction fails.
    pub fn save(&self, messages: &[Message], participants: &[Participant]) -> Result<SaveSummary> {
        let mut summary = SaveSummary::default();

        self.phase("Saving messages", messages.len(), || {
            for msg in messages {
                self.store.upsert_message(msg).inspect_err(|e| self.report(e))?;

                for reaction in msg.reactions() {
                    self.store
                        .upsert_reaction(reaction)
                        .inspect_err(|e| self.report(e))?;
                    summary.reactions += 1;
                }

                summary.messages += 1;
                self.progress.tick("Saving messages");
            }
            Ok(())
        })?;

        self.phase("Saving users", participants.len(), || {
            for user in participants {
                self.store
                    .upsert_participant(user)
                    .inspect_err(|e| self.report(e))?;

                summary.participants += 1;
                self.progress.tick("Saving users");
            }
            Ok(())
        })?;

        tracing::info!(
            messages = summary.messages,
            reactions = summary.reactions,
            users = summary.participants,
            "Save completed"
        );

        Ok(summary)
    }

    fn phase(&self, label: &str, total: usize, body: impl FnOnce() -> Result<()>) -> Result<()> {
        self.progress.start(label, Some(total));
        let outcome = body();
        self.progress.finish(label, outcome.is_ok());
        outcome
    }

    fn report(&self, err: &AppError) {
        if let AppError::Write { entity, .. } = err {
            self.log.write_failed(*entity, err);
        }
    }
}
