use chrono::Utc;
use redb::{ReadableTable, WriteTransaction};

use super::db::{children, load, next_id, store, Database, DatabaseError};
use super::models::Commit;
use super::tables::*;

/// Append a commit inside an open write transaction. The caller guarantees the
/// summary row exists (or is being inserted by the same transaction).
pub(super) fn append_in(
    write_txn: &WriteTransaction,
    summary_id: u64,
    description: &str,
) -> Result<Commit, DatabaseError> {
    let id = next_id(write_txn, "commits")?;
    let commit = Commit {
        id,
        description: description.to_string(),
        created_at: Utc::now(),
        summary_id,
    };

    let mut table = write_txn.open_table(COMMITS)?;
    store(&mut table, id, &commit)?;
    write_txn
        .open_multimap_table(SUMMARY_COMMITS)?
        .insert(summary_id, id)?;
    Ok(commit)
}

/// Remove every commit of a summary inside an open write transaction.
pub(super) fn delete_all_in(
    write_txn: &WriteTransaction,
    summary_id: u64,
) -> Result<u64, DatabaseError> {
    let mut index = write_txn.open_multimap_table(SUMMARY_COMMITS)?;
    let ids = children(&index, summary_id)?;
    let mut table = write_txn.open_table(COMMITS)?;
    for id in &ids {
        table.remove(*id)?;
        index.remove(summary_id, *id)?;
    }
    Ok(ids.len() as u64)
}

impl Database {
    // ========================================================================
    // Version log operations
    // ========================================================================

    /// Append a commit to an existing summary.
    pub fn append_commit(&self, summary_id: u64, description: &str) -> Result<Commit, DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let summaries = write_txn.open_table(SUMMARIES)?;
            if summaries.get(summary_id)?.is_none() {
                return Err(DatabaseError::MissingReference {
                    entity: "summary",
                    id: summary_id,
                });
            }
        }
        let commit = append_in(&write_txn, summary_id, description)?;
        write_txn.commit()?;
        Ok(commit)
    }

    /// Commits of one summary, newest first.
    pub fn list_commits(
        &self,
        summary_id: u64,
        limit: Option<usize>,
    ) -> Result<Vec<Commit>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_multimap_table(SUMMARY_COMMITS)?;
        let table = read_txn.open_table(COMMITS)?;

        let ids = children(&index, summary_id)?;
        let mut commits = Vec::with_capacity(ids.len());
        for id in ids.into_iter().rev().take(limit.unwrap_or(usize::MAX)) {
            if let Some(commit) = load(&table, id)? {
                commits.push(commit);
            }
        }
        Ok(commits)
    }

    /// The latest commits across every summary, newest first.
    pub fn recent_commits(&self, limit: usize) -> Result<Vec<Commit>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COMMITS)?;

        let mut commits = Vec::new();
        for result in table.iter()?.rev().take(limit) {
            let (_, value) = result?;
            commits.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(commits)
    }

    /// Remove every commit of a summary. Only the summary delete path calls this.
    pub fn delete_commits_for(&self, summary_id: u64) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = delete_all_in(&write_txn, summary_id)?;
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn count_all_commits(&self) -> Result<u64, DatabaseError> {
        use redb::ReadableTableMetadata;

        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COMMITS)?;
        Ok(table.len()?)
    }
}
