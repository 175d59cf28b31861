//! Message extraction service.
//!
//! Scans a resolved window, keeps content items as messages, and resolves
//! every author and reactor seen during the scan to a participant.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{
    AppError, ChatService, ExtractionStats, Message, Participant, RawMessage, Result,
    SessionProvider,
};

use super::boundary::MessageWindow;
use super::mapper::{map_message, map_participant};
use super::observer::ExportLog;

/// Messages and participants extracted from one chat.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub chat_id: i64,
    /// Ascending by message id.
    pub messages: Vec<Message>,
    /// One entry per resolvable user id; treat as a set.
    pub participants: Vec<Participant>,
    pub stats: ExtractionStats,
}

/// Extracts one chat over an open session.
pub struct MessageExtractor<'a> {
    session: &'a dyn SessionProvider,
    service: &'a dyn ChatService,
    log: &'a dyn ExportLog,
}

impl<'a> MessageExtractor<'a> {
    #[must_use]
    pub fn new(
        session: &'a dyn SessionProvider,
        service: &'a dyn ChatService,
        log: &'a dyn ExportLog,
    ) -> Self {
        Self {
            session,
            service,
            log,
        }
    }

    /// Extracts all messages in `window` plus its anchors.
    ///
    /// # Errors
    /// Returns `Connection` if the session is not open or drops mid-scan,
    /// and `Validation` if a content item or one of its reactions is
    /// malformed. Unresolvable participants are dropped, not errors.
    pub async fn extract(&self, chat_id: i64, window: &MessageWindow) -> Result<Extraction> {
        if !self.session.is_connected() {
            return Err(AppError::connection("session is not connected"));
        }

        let Some((min_id, max_id)) = window.bounds() else {
            tracing::info!(chat_id, "Window is empty, nothing to extract");
            return Ok(Extraction {
                chat_id,
                ..Default::default()
            });
        };

        let fetched = self
            .service
            .messages_in_range(chat_id, min_id, max_id)
            .await?;

        let mut stats = ExtractionStats {
            fetched: fetched.len() + window.anchors().len(),
            ..Default::default()
        };

        let items = merge_by_id(window, fetched, &mut stats);

        let mut messages = Vec::with_capacity(items.len());
        let mut user_ids = BTreeSet::new();

        for raw in items.values() {
            if !raw.is_content() {
                stats.skipped += 1;
                continue;
            }

            let msg = map_message(chat_id, raw)?;

            user_ids.insert(msg.user_id());
            for reaction in msg.reactions() {
                user_ids.insert(reaction.user_id());
            }

            stats.reactions += msg.reactions().len();
            messages.push(msg);
        }

        stats.accepted = messages.len();
        self.log.messages_skipped(chat_id, stats.skipped);

        let participants = self.resolve_participants(chat_id, &user_ids, &mut stats).await?;

        tracing::info!(
            chat_id,
            messages = stats.accepted,
            reactions = stats.reactions,
            users = stats.participants_resolved,
            "Extraction finished"
        );

        Ok(Extraction {
            chat_id,
            messages,
            participants,
            stats,
        })
    }

    /// Looks up each id in turn; misses and unusable profiles are dropped.
    async fn resolve_participants(
        &self,
        chat_id: i64,
        user_ids: &BTreeSet<i64>,
        stats: &mut ExtractionStats,
    ) -> Result<Vec<Participant>> {
        let mut participants = Vec::with_capacity(user_ids.len());

        for &user_id in user_ids {
            let resolved = self
                .service
                .resolve_user(user_id)
                .await
                .and_then(|profile| map_participant(chat_id, profile));

            match resolved {
                Ok(participant) => participants.push(participant),
                Err(e @ (AppError::NotFound { .. } | AppError::Validation { .. })) => {
                    stats.participants_missing += 1;
                    self.log.participant_skipped(chat_id, user_id, &e);
                }
                Err(e) => return Err(e),
            }
        }

        stats.participants_resolved = participants.len();
        Ok(participants)
    }
}

/// Merges range results with the window anchors, one item per id.
///
/// Range items outside the window bounds are dropped; anchors always stay.
fn merge_by_id(
    window: &MessageWindow,
    fetched: Vec<RawMessage>,
    stats: &mut ExtractionStats,
) -> BTreeMap<i64, RawMessage> {
    let mut items = BTreeMap::new();

    for raw in fetched {
        match raw.id {
            Some(id) if id != 0 && window.contains(id) => {
                items.entry(id).or_insert(raw);
            }
            Some(id) if id != 0 => {
                tracing::debug!(msg_id = id, "Dropping item outside window");
            }
            _ => stats.skipped += 1,
        }
    }

    for anchor in window.anchors() {
        if let Some(id) = anchor.id {
            items.entry(id).or_insert_with(|| anchor.clone());
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observer::{LogEvent, RecordingLog};
    use crate::application::boundary::BoundaryResolver;
    use crate::domain::{FailureKind, RawProfile, RawReaction};
    use crate::infrastructure::ArchiveService;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn raw(id: i64, author: i64, reactors: &[i64]) -> RawMessage {
        RawMessage {
            id: Some(id),
            date: Some(at(id * 100)),
            text: Some(format!("m{id}")),
            from_id: Some(author),
            reply_to_msg_id: None,
            recent_reactions: reactors
                .iter()
                .map(|&u| RawReaction {
                    user_id: Some(u),
                    date: Some(at(id * 100 + 1)),
                    emoticon: Some("👍".into()),
                })
                .collect(),
        }
    }

    fn pin(id: i64) -> RawMessage {
        RawMessage {
            id: Some(id),
            date: Some(at(id * 100)),
            from_id: Some(1),
            ..Default::default()
        }
    }

    fn profile(id: i64) -> RawProfile {
        RawProfile {
            id,
            username: Some(format!("user{id}")),
            first_name: Some("First".into()),
            last_name: None,
        }
    }

    async fn connected(messages: Vec<RawMessage>, users: Vec<RawProfile>) -> ArchiveService {
        let svc = ArchiveService::new(1, messages, users);
        svc.connect().await.unwrap();
        svc
    }

    #[tokio::test]
    async fn test_requires_connected_session() {
        let svc = ArchiveService::new(1, vec![raw(1, 1, &[])], vec![profile(1)]);
        let log = RecordingLog::default();

        let err = MessageExtractor::new(&svc, &svc, &log)
            .extract(1, &MessageWindow::all())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Connection);
    }

    #[tokio::test]
    async fn test_skips_non_content_items() {
        let svc = connected(
            vec![raw(1, 1, &[]), pin(2), raw(3, 1, &[])],
            vec![profile(1)],
        )
        .await;
        let log = RecordingLog::default();

        let out = MessageExtractor::new(&svc, &svc, &log)
            .extract(1, &MessageWindow::all())
            .await
            .unwrap();

        let ids: Vec<_> = out.messages.iter().map(Message::msg_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(out.stats.skipped, 1);
        assert!(log.events().contains(&LogEvent::MessagesSkipped { count: 1 }));
    }

    #[tokio::test]
    async fn test_participants_are_deduplicated() {
        let svc = connected(
            vec![
                raw(1, 1, &[2, 3]),
                raw(2, 2, &[1]),
                raw(3, 1, &[2, 3]),
                raw(4, 3, &[]),
            ],
            vec![profile(1), profile(2), profile(3)],
        )
        .await;
        let log = RecordingLog::default();

        let out = MessageExtractor::new(&svc, &svc, &log)
            .extract(1, &MessageWindow::all())
            .await
            .unwrap();

        let mut ids: Vec<_> = out.participants.iter().map(Participant::user_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(out.stats.reactions, 5);
    }

    #[tokio::test]
    async fn test_unresolvable_participant_is_dropped() {
        let svc = connected(
            vec![raw(1, 1, &[2]), raw(2, 3, &[])],
            vec![profile(1), profile(3)],
        )
        .await;
        let log = RecordingLog::default();

        let out = MessageExtractor::new(&svc, &svc, &log)
            .extract(1, &MessageWindow::all())
            .await
            .unwrap();

        assert_eq!(out.messages.len(), 2);
        assert_eq!(out.participants.len(), 2);
        assert_eq!(out.stats.participants_missing, 1);
        assert!(log.events().contains(&LogEvent::ParticipantSkipped {
            user_id: 2,
            kind: FailureKind::NotFound,
        }));
    }

    #[tokio::test]
    async fn test_malformed_reaction_aborts() {
        let mut bad = raw(2, 1, &[2]);
        bad.recent_reactions[0].emoticon = None;
        let svc = connected(vec![raw(1, 1, &[]), bad], vec![profile(1), profile(2)]).await;
        let log = RecordingLog::default();

        let err = MessageExtractor::new(&svc, &svc, &log)
            .extract(1, &MessageWindow::all())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Validation);
    }

    #[tokio::test]
    async fn test_window_containment_with_anchors() {
        let messages: Vec<_> = (1..=8).map(|id| raw(id, 1, &[])).collect();
        let svc = connected(messages, vec![profile(1)]).await;
        let log = RecordingLog::default();

        let window = BoundaryResolver::new(&svc)
            .resolve(1, Some(at(250)), Some(at(650)))
            .await
            .unwrap();
        assert_eq!(window.bounds(), Some((3, 6)));

        let out = MessageExtractor::new(&svc, &svc, &log)
            .extract(1, &window)
            .await
            .unwrap();

        let ids: Vec<_> = out.messages.iter().map(Message::msg_id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
        assert_eq!(out.stats.fetched, 6);
    }

    #[tokio::test]
    async fn test_empty_window_yields_nothing() {
        let svc = connected(vec![raw(1, 1, &[])], vec![profile(1)]).await;
        let log = RecordingLog::default();

        let out = MessageExtractor::new(&svc, &svc, &log)
            .extract(1, &MessageWindow::Empty)
            .await
            .unwrap();

        assert!(out.messages.is_empty());
        assert!(out.participants.is_empty());
    }

    #[tokio::test]
    async fn test_runs_are_deterministic() {
        let svc = connected(
            vec![raw(1, 1, &[2]), raw(2, 2, &[1, 3]), pin(3), raw(4, 3, &[])],
            vec![profile(1), profile(2), profile(3)],
        )
        .await;
        let log = RecordingLog::default();
        let extractor = MessageExtractor::new(&svc, &svc, &log);

        let first = extractor.extract(1, &MessageWindow::all()).await.unwrap();
        let second = extractor.extract(1, &MessageWindow::all()).await.unwrap();

        assert_eq!(first.messages, second.messages);
        assert_eq!(first.participants, second.participants);
        assert_eq!(first.stats, second.stats);
    }

    /// Leaves both window edges out of range results, as the live service's
    /// exclusive bounds do, and leaks one item from past the window.
    struct EdgeSkippingService {
        inner: ArchiveService,
        stray: RawMessage,
    }

    #[async_trait]
    impl ChatService for EdgeSkippingService {
        async fn message_at_or_before(
            &self,
            chat_id: i64,
            date: DateTime<Utc>,
        ) -> Result<Option<RawMessage>> {
            self.inner.message_at_or_before(chat_id, date).await
        }

        async fn message_after(&self, chat_id: i64, msg_id: i64) -> Result<Option<RawMessage>> {
            self.inner.message_after(chat_id, msg_id).await
        }

        async fn messages_in_range(
            &self,
            chat_id: i64,
            min_id: i64,
            max_id: i64,
        ) -> Result<Vec<RawMessage>> {
            let mut out: Vec<_> = self
                .inner
                .messages_in_range(chat_id, min_id, max_id)
                .await?
                .into_iter()
                .filter(|m| m.id != Some(min_id) && m.id != Some(max_id))
                .collect();
            out.push(self.stray.clone());
            Ok(out)
        }

        async fn resolve_user(&self, user_id: i64) -> Result<RawProfile> {
            self.inner.resolve_user(user_id).await
        }
    }

    async fn edge_skipping() -> EdgeSkippingService {
        let messages: Vec<_> = (1..=8).map(|id| raw(id, 1, &[])).collect();
        EdgeSkippingService {
            inner: connected(messages, vec![profile(1)]).await,
            stray: raw(8, 1, &[]),
        }
    }

    #[tokio::test]
    async fn test_anchors_fill_edges_missed_by_range() {
        let svc = edge_skipping().await;
        let log = RecordingLog::default();

        let window = BoundaryResolver::new(&svc)
            .resolve(1, Some(at(250)), Some(at(650)))
            .await
            .unwrap();
        assert_eq!(window.bounds(), Some((3, 6)));

        let out = MessageExtractor::new(&svc.inner, &svc, &log)
            .extract(1, &window)
            .await
            .unwrap();

        let ids: Vec<_> = out.messages.iter().map(Message::msg_id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
        assert_eq!(out.stats.fetched, 5);
    }

    #[tokio::test]
    async fn test_range_items_outside_window_are_dropped() {
        let svc = edge_skipping().await;
        let log = RecordingLog::default();
        let window = MessageWindow::Range {
            min_id: 3,
            max_id: 6,
            anchors: Vec::new(),
        };

        let out = MessageExtractor::new(&svc.inner, &svc, &log)
            .extract(1, &window)
            .await
            .unwrap();

        let ids: Vec<_> = out.messages.iter().map(Message::msg_id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert_eq!(out.stats.skipped, 0);
    }
}
