use std::path::PathBuf;

use bytes::Bytes;

use super::{require_text, Catalog, CatalogError, Result};
use crate::auth::AuthContext;
use crate::notify::{EventKind, SummaryEvent};
use crate::storage::models::{Commit, NewSummary, Summary, SummaryFilter};

/// Message of the commit recorded when a summary is first created.
pub const INITIAL_COMMIT_MESSAGE: &str = "Summary added to the catalog.";

/// An uploaded file as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied name, only used as a hint for the stored name
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct SummaryDraft {
    pub name: String,
    pub description: String,
    pub author_id: u64,
    pub course_id: u64,
}

/// A summary with its version log, newest commit first.
#[derive(Debug, Clone)]
pub struct SummaryDetail {
    pub summary: Summary,
    pub commits: Vec<Commit>,
}

/// A commit joined with the summary it belongs to.
#[derive(Debug, Clone)]
pub struct RecentChange {
    pub commit: Commit,
    pub summary: Summary,
}

impl Catalog {
    // ========================================================================
    // Summary lifecycle
    // ========================================================================

    /// Create a summary, its backing file and its first commit.
    ///
    /// References are checked before the file is written. If the row and commit
    /// cannot be written, the stored file is removed again.
    pub async fn create_summary(
        &self,
        ctx: &AuthContext,
        draft: SummaryDraft,
        upload: Upload,
    ) -> Result<Summary> {
        require_text("name", &draft.name)?;
        if self.db.get_author(draft.author_id)?.is_none() {
            return Err(CatalogError::not_found("author", draft.author_id));
        }
        if !self.db.course_exists(draft.course_id)? {
            return Err(CatalogError::not_found("course", draft.course_id));
        }

        let summary = self.store_and_insert(draft, upload).await?;

        tracing::debug!(
            summary_id = summary.id,
            stored_name = %summary.filename,
            actor = ctx.author_id(),
            "Created summary"
        );

        self.notify(SummaryEvent {
            kind: EventKind::Added,
            summary_name: summary.name.clone(),
            course_id: summary.course_id,
            commit_description: None,
        });

        Ok(summary)
    }

    /// Replace a summary's file and record the change as a new commit.
    ///
    /// The old file is only removed once the row and commit are written; if that
    /// write fails the new file is discarded and the summary keeps its old one.
    pub async fn update_summary(
        &self,
        ctx: &AuthContext,
        id: u64,
        description: &str,
        upload: Upload,
    ) -> Result<Summary> {
        require_text("description", description)?;
        let existing = self
            .db
            .get_summary(id)?
            .ok_or_else(|| CatalogError::not_found("summary", id))?;

        let (summary, commit) = self.replace_and_revise(&existing, description, upload).await?;

        tracing::debug!(
            summary_id = id,
            commit_id = commit.id,
            stored_name = %summary.filename,
            actor = ctx.author_id(),
            "Updated summary"
        );

        self.notify(SummaryEvent {
            kind: EventKind::Updated,
            summary_name: summary.name.clone(),
            course_id: summary.course_id,
            commit_description: Some(commit.description),
        });

        Ok(summary)
    }

    /// Write the file, then the row and first commit. The file is removed again
    /// if the row cannot be written, e.g. because the course went away meanwhile.
    async fn store_and_insert(&self, draft: SummaryDraft, upload: Upload) -> Result<Summary> {
        let filename = self.content.store(&upload.file_name, upload.data).await?;

        let new = NewSummary {
            name: draft.name,
            description: draft.description,
            author_id: draft.author_id,
            course_id: draft.course_id,
            filename,
        };
        match self.db.insert_summary(&new, INITIAL_COMMIT_MESSAGE) {
            Ok((summary, _)) => Ok(summary),
            Err(e) => {
                if let Err(cleanup) = self.content.remove(&new.filename).await {
                    tracing::warn!(stored_name = %new.filename, error = %cleanup, "Failed to remove orphaned file");
                }
                Err(e.into())
            }
        }
    }

    /// Store the new file and point `existing` at it with a new commit. The
    /// replacement is finished only after the row is written, aborted otherwise.
    async fn replace_and_revise(
        &self,
        existing: &Summary,
        description: &str,
        upload: Upload,
    ) -> Result<(Summary, Commit)> {
        let replacement = self
            .content
            .replace(&existing.filename, &upload.file_name, upload.data)
            .await?;

        match self
            .db
            .revise_summary(existing.id, replacement.stored_name(), description)
        {
            Ok(Some(revised)) => {
                replacement.finish().await;
                Ok(revised)
            }
            Ok(None) => {
                replacement.abort().await;
                Err(CatalogError::not_found("summary", existing.id))
            }
            Err(e) => {
                replacement.abort().await;
                Err(e.into())
            }
        }
    }

    /// Delete a summary with its commits and backing file.
    pub async fn delete_summary(&self, ctx: &AuthContext, id: u64) -> Result<()> {
        let summary = self
            .db
            .get_summary(id)?
            .ok_or_else(|| CatalogError::not_found("summary", id))?;

        self.remove_summary(&summary).await?;
        tracing::debug!(summary_id = id, actor = ctx.author_id(), "Deleted summary");
        Ok(())
    }

    /// The one teardown path for a summary, shared by direct and course deletes.
    ///
    /// Commits go first, then the file (best-effort), then the row. A crash in
    /// between leaves a row that a repeated delete finishes off.
    pub(super) async fn remove_summary(&self, summary: &Summary) -> Result<()> {
        let commits = self.db.delete_commits_for(summary.id)?;

        if let Err(e) = self.content.remove(&summary.filename).await {
            tracing::warn!(
                summary_id = summary.id,
                stored_name = %summary.filename,
                error = %e,
                "Failed to remove summary file"
            );
        }

        self.db.delete_summary_row(summary.id)?;
        tracing::debug!(summary_id = summary.id, commits, "Removed summary");
        Ok(())
    }

    /// Delete every summary of a course, then the course itself.
    ///
    /// Not atomic across summaries; each one is removed through
    /// `remove_summary`, so a partially completed cascade can simply be re-run.
    pub(super) async fn cascade_delete_for_course(&self, course_id: u64) -> Result<u64> {
        const MAX_PASSES: usize = 3;

        let mut removed = 0;
        for _ in 0..MAX_PASSES {
            for summary in self.db.list_summaries(SummaryFilter::course(course_id))? {
                self.remove_summary(&summary).await?;
                removed += 1;
            }

            match self.db.delete_course(course_id) {
                Ok(_) => return Ok(removed),
                // A summary was added while we were sweeping; go again.
                Err(crate::storage::DatabaseError::CourseInUse { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(CatalogError::Conflict(format!(
            "course {course_id} kept receiving summaries while being deleted"
        )))
    }

    /// Resolve the file to stream, then count the download.
    ///
    /// A missing file is `NotFound` and is not counted. A failed increment is
    /// logged and does not block the download.
    pub async fn record_download(&self, id: u64) -> Result<PathBuf> {
        let summary = self
            .db
            .get_summary(id)?
            .ok_or_else(|| CatalogError::not_found("summary", id))?;

        let path = self.content.resolve(&summary.filename).await?;

        if let Err(e) = self.db.increment_downloads(id) {
            tracing::warn!(summary_id = id, error = %e, "Failed to count download");
        }

        Ok(path)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_summary(&self, id: u64) -> Result<SummaryDetail> {
        let summary = self
            .db
            .get_summary(id)?
            .ok_or_else(|| CatalogError::not_found("summary", id))?;
        let commits = self.db.list_commits(id, None)?;
        Ok(SummaryDetail { summary, commits })
    }

    pub fn list_all_summaries(&self) -> Result<Vec<Summary>> {
        Ok(self.db.list_summaries(SummaryFilter::default())?)
    }

    pub fn list_summaries_by_course(&self, course_id: u64) -> Result<Vec<Summary>> {
        if !self.db.course_exists(course_id)? {
            return Err(CatalogError::not_found("course", course_id));
        }
        Ok(self.db.list_summaries(SummaryFilter::course(course_id))?)
    }

    pub fn list_summaries_by_author(&self, author_id: u64) -> Result<Vec<Summary>> {
        if self.db.get_author(author_id)?.is_none() {
            return Err(CatalogError::not_found("author", author_id));
        }
        Ok(self.db.list_summaries(SummaryFilter::author(author_id))?)
    }

    /// Any combination of course/author filters; unknown ids yield an empty list.
    pub fn list_summaries(&self, filter: SummaryFilter) -> Result<Vec<Summary>> {
        Ok(self.db.list_summaries(filter)?)
    }

    /// Commits of one summary, newest first.
    pub fn list_commits(&self, summary_id: u64, limit: Option<usize>) -> Result<Vec<Commit>> {
        if self.db.get_summary(summary_id)?.is_none() {
            return Err(CatalogError::not_found("summary", summary_id));
        }
        Ok(self.db.list_commits(summary_id, limit)?)
    }

    /// The latest changes across the catalog, newest first.
    pub fn list_recent_commits(&self, limit: usize) -> Result<Vec<RecentChange>> {
        let mut changes = Vec::new();
        for commit in self.db.recent_commits(limit)? {
            if let Some(summary) = self.db.get_summary(commit.summary_id)? {
                changes.push(RecentChange { commit, summary });
            }
        }
        Ok(changes)
    }
}
