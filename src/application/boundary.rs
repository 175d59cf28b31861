//! Date range to message-id window resolution.
//!
//! The service can only answer "newest message at or before a date", so the
//! lower bound takes a second lookup: the message found may predate the
//! start, in which case the next message after it is the first one inside.
//! Both messages found while resolving are kept as anchors and merged into
//! the extraction, since range queries can miss them at the edges.

use chrono::{DateTime, Utc};

use crate::domain::{AppError, ChatService, RawMessage, Result};

/// Inclusive message-id window. A bound of `0` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageWindow {
    /// Nothing in the chat falls in the requested dates.
    Empty,
    Range {
        min_id: i64,
        max_id: i64,
        anchors: Vec<RawMessage>,
    },
}

impl MessageWindow {
    /// The unbounded window.
    #[must_use]
    pub const fn all() -> Self {
        Self::Range {
            min_id: 0,
            max_id: 0,
            anchors: Vec::new(),
        }
    }

    /// `(min_id, max_id)`, or `None` for an empty window.
    #[must_use]
    pub const fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Empty => None,
            Self::Range { min_id, max_id, .. } => Some((*min_id, *max_id)),
        }
    }

    #[must_use]
    pub fn anchors(&self) -> &[RawMessage] {
        match self {
            Self::Empty => &[],
            Self::Range { anchors, .. } => anchors,
        }
    }

    /// Whether `msg_id` lies inside the bounds.
    #[must_use]
    pub const fn contains(&self, msg_id: i64) -> bool {
        match self {
            Self::Empty => false,
            Self::Range { min_id, max_id, .. } => {
                msg_id >= *min_id && (*max_id == 0 || msg_id <= *max_id)
            }
        }
    }
}

/// Resolves optional dates to a [`MessageWindow`].
pub struct BoundaryResolver<'a> {
    service: &'a dyn ChatService,
}

impl<'a> BoundaryResolver<'a> {
    #[must_use]
    pub fn new(service: &'a dyn ChatService) -> Self {
        Self { service }
    }

    /// Resolves `[start, end]` for `chat_id`.
    ///
    /// A date with no message at or before it, a start after the last
    /// message, or a start past the end all give [`MessageWindow::Empty`].
    ///
    /// # Errors
    /// Returns `Connection` if the service is unreachable, or `InvalidData`
    /// if a lookup returns a message without an id.
    pub async fn resolve(
        &self,
        chat_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<MessageWindow> {
        if start.is_none() && end.is_none() {
            return Ok(MessageWindow::all());
        }

        let mut anchors = Vec::new();

        let min_id = match start {
            None => 0,
            Some(start) => match self.first_at_or_after(chat_id, start).await? {
                Some(first) => {
                    let id = anchor_id(&first)?;
                    anchors.push(first);
                    id
                }
                None => {
                    tracing::debug!(chat_id, %start, "No message on or after start");
                    return Ok(MessageWindow::Empty);
                }
            },
        };

        let max_id = match end {
            None => 0,
            Some(end) => match self.service.message_at_or_before(chat_id, end).await? {
                Some(last) => {
                    let id = anchor_id(&last)?;
                    anchors.push(last);
                    id
                }
                None => {
                    tracing::debug!(chat_id, %end, "No message on or before end");
                    return Ok(MessageWindow::Empty);
                }
            },
        };

        if max_id != 0 && min_id > max_id {
            tracing::debug!(chat_id, min_id, max_id, "Start falls after end");
            return Ok(MessageWindow::Empty);
        }

        tracing::debug!(chat_id, min_id, max_id, "Window resolved");

        Ok(MessageWindow::Range {
            min_id,
            max_id,
            anchors,
        })
    }

    /// Two-step lookup of the first message dated at or after `start`.
    async fn first_at_or_after(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
    ) -> Result<Option<RawMessage>> {
        let Some(anchor) = self.service.message_at_or_before(chat_id, start).await? else {
            return Ok(None);
        };

        if anchor.date.is_some_and(|d| d >= start) {
            return Ok(Some(anchor));
        }

        let id = anchor_id(&anchor)?;
        self.service.message_after(chat_id, id).await
    }
}

fn anchor_id(msg: &RawMessage) -> Result<i64> {
    msg.id.filter(|id| *id > 0).ok_or_else(|| AppError::InvalidData {
        message: "boundary lookup returned a message without an id".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionProvider;
    use crate::infrastructure::ArchiveService;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn raw(id: i64, secs: i64) -> RawMessage {
        RawMessage {
            id: Some(id),
            date: Some(at(secs)),
            text: Some(format!("m{id}")),
            from_id: Some(1),
            ..Default::default()
        }
    }

    async fn connected(messages: Vec<RawMessage>) -> ArchiveService {
        let svc = ArchiveService::new(1, messages, vec![]);
        svc.connect().await.unwrap();
        svc
    }

    #[tokio::test]
    async fn test_no_dates_is_unbounded() {
        let svc = connected(vec![raw(1, 10)]).await;
        let window = BoundaryResolver::new(&svc).resolve(1, None, None).await.unwrap();

        assert_eq!(window.bounds(), Some((0, 0)));
        assert!(window.anchors().is_empty());
    }

    #[tokio::test]
    async fn test_start_refines_past_earlier_anchor() {
        let svc = connected(vec![raw(5, 100), raw(6, 200), raw(7, 300)]).await;
        let window = BoundaryResolver::new(&svc)
            .resolve(1, Some(at(150)), None)
            .await
            .unwrap();

        assert_eq!(window.bounds(), Some((6, 0)));
        assert_eq!(window.anchors()[0].id, Some(6));
    }

    #[tokio::test]
    async fn test_start_on_exact_message() {
        let svc = connected(vec![raw(5, 100), raw(6, 200)]).await;
        let window = BoundaryResolver::new(&svc)
            .resolve(1, Some(at(200)), None)
            .await
            .unwrap();

        assert_eq!(window.bounds(), Some((6, 0)));
    }

    #[tokio::test]
    async fn test_both_bounds() {
        let svc = connected(vec![raw(5, 100), raw(6, 200), raw(7, 300), raw(8, 400)]).await;
        let window = BoundaryResolver::new(&svc)
            .resolve(1, Some(at(150)), Some(at(350)))
            .await
            .unwrap();

        assert_eq!(window.bounds(), Some((6, 7)));
        assert_eq!(window.anchors().len(), 2);
        assert!(window.contains(7));
        assert!(!window.contains(8));
    }

    #[tokio::test]
    async fn test_empty_conversation() {
        let svc = connected(vec![]).await;
        let resolver = BoundaryResolver::new(&svc);

        assert_eq!(
            resolver.resolve(1, Some(at(100)), None).await.unwrap(),
            MessageWindow::Empty
        );
        assert_eq!(
            resolver.resolve(1, None, Some(at(100))).await.unwrap(),
            MessageWindow::Empty
        );
        assert_eq!(resolver.resolve(1, None, None).await.unwrap().bounds(), Some((0, 0)));
    }

    #[tokio::test]
    async fn test_single_message_conversation() {
        let svc = connected(vec![raw(9, 100)]).await;
        let resolver = BoundaryResolver::new(&svc);

        // date precedes every message
        assert_eq!(
            resolver.resolve(1, Some(at(50)), None).await.unwrap(),
            MessageWindow::Empty
        );
        // start after the only message
        assert_eq!(
            resolver.resolve(1, Some(at(150)), None).await.unwrap(),
            MessageWindow::Empty
        );

        let window = resolver
            .resolve(1, Some(at(100)), Some(at(500)))
            .await
            .unwrap();
        assert_eq!(window.bounds(), Some((9, 9)));
    }

    #[tokio::test]
    async fn test_start_after_end_is_empty() {
        let svc = connected(vec![raw(5, 100), raw(6, 200), raw(7, 300)]).await;
        let window = BoundaryResolver::new(&svc)
            .resolve(1, Some(at(250)), Some(at(150)))
            .await
            .unwrap();

        assert_eq!(window, MessageWindow::Empty);
    }

    #[tokio::test]
    async fn test_disconnected_fails() {
        let svc = ArchiveService::new(1, vec![raw(1, 10)], vec![]);
        let err = BoundaryResolver::new(&svc)
            .resolve(1, Some(at(5)), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Connection { .. }));
    }
}
