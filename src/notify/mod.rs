//! Outbound change notifications. Delivery is best-effort: the catalog logs and
//! discards every notifier error.

mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rejected by notification backend: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Added,
    Updated,
}

/// A summary was added or its file replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEvent {
    pub kind: EventKind,
    pub summary_name: String,
    pub course_id: u64,
    /// Set for `Updated` events
    pub commit_description: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &SummaryEvent) -> Result<(), NotifyError>;
}

/// Notifier used when no chat backend is configured: records the event in the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &SummaryEvent) -> Result<(), NotifyError> {
        tracing::info!(
            kind = ?event.kind,
            summary = %event.summary_name,
            course_id = event.course_id,
            "Summary event"
        );
        Ok(())
    }
}
