//! Export use case: session, window, extraction.

use chrono::{DateTime, Utc};

use crate::domain::{AppError, ChatService, Result, SessionProvider};

use super::boundary::BoundaryResolver;
use super::extractor::{Extraction, MessageExtractor};
use super::observer::ExportLog;

/// What to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub chat_id: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Connects, extracts the requested window and disconnects.
///
/// The session is closed whether or not extraction succeeds; on failure no
/// partial data is returned.
///
/// # Errors
/// Returns `Connection` if the session cannot be opened, or any error from
/// resolution or extraction.
pub async fn export<S>(service: &S, log: &dyn ExportLog, request: &ExportRequest) -> Result<Extraction>
where
    S: SessionProvider + ChatService,
{
    tracing::info!(chat_id = request.chat_id, "Export started");

    service.connect().await.map_err(|e| match e {
        AppError::Connection { .. } => e,
        other => AppError::connection(other.to_string()),
    })?;

    let outcome = run(service, log, request).await;

    if let Err(e) = service.disconnect().await {
        tracing::warn!(error = %e, "Failed to close session");
    }

    match &outcome {
        Ok(extraction) => tracing::info!(
            chat_id = request.chat_id,
            messages = extraction.messages.len(),
            "Export finished"
        ),
        Err(e) => tracing::error!(chat_id = request.chat_id, error = %e, "Export failed"),
    }

    outcome
}

async fn run<S>(service: &S, log: &dyn ExportLog, request: &ExportRequest) -> Result<Extraction>
where
    S: SessionProvider + ChatService,
{
    let window = BoundaryResolver::new(service)
        .resolve(request.chat_id, request.start_date, request.end_date)
        .await?;

    MessageExtractor::new(service, service, log)
        .extract(request.chat_id, &window)
        .await
}
