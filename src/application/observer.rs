//! Injected event log for export and save runs.
//!
//! Components report recoverable misses and fatal write failures here rather
//! than through the global subscriber alone, so the context they carry can
//! be asserted on.

use crate::domain::{AppError, EntityRef};

/// Receiver of failure context from the pipeline.
pub trait ExportLog: Send + Sync {
    /// A participant id could not be resolved and was dropped.
    fn participant_skipped(&self, chat_id: i64, user_id: i64, cause: &AppError);

    /// An upsert failed; the save stops after this.
    fn write_failed(&self, entity: EntityRef, cause: &AppError);

    /// Non-content items were skipped during a scan.
    fn messages_skipped(&self, chat_id: i64, count: usize);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ExportLog for TracingLog {
    fn participant_skipped(&self, chat_id: i64, user_id: i64, cause: &AppError) {
        tracing::warn!(chat_id, user_id, error = %cause, "Participant dropped");
    }

    fn write_failed(&self, entity: EntityRef, cause: &AppError) {
        tracing::error!(%entity, error = %cause, "Write failed, aborting save");
    }

    fn messages_skipped(&self, chat_id: i64, count: usize) {
        if count > 0 {
            tracing::debug!(chat_id, count, "Skipped non-content items");
        }
    }
}

#[cfg(test)]
pub use recording::{LogEvent, RecordingLog};

#[cfg(test)]
mod recording {
    use std::sync::Mutex;

    use super::ExportLog;
    use crate::domain::{AppError, EntityRef, FailureKind};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LogEvent {
        ParticipantSkipped { user_id: i64, kind: FailureKind },
        WriteFailed { entity: EntityRef },
        MessagesSkipped { count: usize },
    }

    /// Collects events in memory.
    #[derive(Debug, Default)]
    pub struct RecordingLog {
        events: Mutex<Vec<LogEvent>>,
    }

    impl RecordingLog {
        pub fn events(&self) -> Vec<LogEvent> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: LogEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ExportLog for RecordingLog {
        fn participant_skipped(&self, _chat_id: i64, user_id: i64, cause: &AppError) {
            self.push(LogEvent::ParticipantSkipped {
                user_id,
                kind: cause.kind(),
            });
        }

        fn write_failed(&self, entity: EntityRef, _cause: &AppError) {
            self.push(LogEvent::WriteFailed { entity });
        }

        fn messages_skipped(&self, _chat_id: i64, count: usize) {
            self.push(LogEvent::MessagesSkipped { count });
        }
    }
}
