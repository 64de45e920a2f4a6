//! The catalog core: keeps summary rows, their version logs and their backing
//! files consistent across every mutation.
//!
//! - `documents`: summary lifecycle (create, update, delete, download) and the
//!   course cascade
//! - `courses`: course reference data
//! - `identity`: authors and credential verification

mod courses;
mod documents;
mod identity;

pub use courses::CascadeReport;
pub use documents::{RecentChange, SummaryDetail, SummaryDraft, Upload, INITIAL_COMMIT_MESSAGE};
pub use identity::AuthorFields;

use std::sync::Arc;

use thiserror::Error;

use crate::auth::{HashError, PasswordHasher};
use crate::content::{ContentError, ContentRoot};
use crate::notify::{Notifier, SummaryEvent};
use crate::storage::{Database, DatabaseError, PurgeStats};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage failure: {0}")]
    Storage(ContentError),
    #[error("Persistence failure: {0}")]
    Persistence(DatabaseError),
    #[error("Credential hashing failed: {0}")]
    Hashing(#[from] HashError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    pub(crate) fn not_found(entity: &str, id: u64) -> Self {
        CatalogError::NotFound(format!("{entity} {id}"))
    }
}

impl From<DatabaseError> for CatalogError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::MissingReference { entity, id } => CatalogError::not_found(entity, id),
            DatabaseError::EmailTaken(email) => {
                CatalogError::Conflict(format!("email '{email}' is already in use"))
            }
            DatabaseError::CourseInUse { .. } => CatalogError::Conflict(e.to_string()),
            other => CatalogError::Persistence(other),
        }
    }
}

impl From<ContentError> for CatalogError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::InvalidName(name) => {
                CatalogError::InvalidInput(format!("unusable file name '{name}'"))
            }
            ContentError::NotFound(name) => CatalogError::NotFound(format!("file {name}")),
            other => CatalogError::Storage(other),
        }
    }
}

/// Reject blank required text fields before any side effect happens.
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Entry point for every catalog operation.
pub struct Catalog {
    db: Database,
    content: ContentRoot,
    notifier: Arc<dyn Notifier>,
    hasher: PasswordHasher,
}

impl Catalog {
    pub fn new(
        db: Database,
        content: ContentRoot,
        notifier: Arc<dyn Notifier>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            db,
            content,
            notifier,
            hasher,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn content(&self) -> &ContentRoot {
        &self.content
    }

    /// Hand an event to the notifier without waiting for it. Failures are logged.
    fn notify(&self, event: SummaryEvent) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&event).await {
                tracing::warn!(
                    kind = ?event.kind,
                    summary = %event.summary_name,
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        });
    }

    /// Remove every stored file and every row - for testing only
    pub async fn purge(&self) -> Result<PurgeStats> {
        for summary in self.db.list_summaries(Default::default())? {
            if let Err(e) = self.content.remove(&summary.filename).await {
                tracing::warn!(stored_name = %summary.filename, error = %e, "Failed to remove file during purge");
            }
        }
        Ok(self.db.purge_all()?)
    }
}
