use std::collections::BTreeSet;

use chrono::Utc;
use redb::ReadableTable;

use super::commits::{append_in, delete_all_in};
use super::db::{children, load, load_all, next_id, store, Database, DatabaseError};
use super::models::{Commit, NewSummary, Summary, SummaryFilter};
use super::tables::*;

impl Database {
    // ========================================================================
    // Summary operations
    // ========================================================================

    /// Insert a summary row together with its first commit in one transaction.
    /// Fails with `MissingReference` if the author or course is gone.
    pub fn insert_summary(
        &self,
        new: &NewSummary,
        initial_commit: &str,
    ) -> Result<(Summary, Commit), DatabaseError> {
        debug_assert!(!new.filename.is_empty(), "summary filename must not be empty");

        let write_txn = self.begin_write()?;
        let created = {
            let authors = write_txn.open_table(AUTHORS)?;
            if authors.get(new.author_id)?.is_none() {
                return Err(DatabaseError::MissingReference {
                    entity: "author",
                    id: new.author_id,
                });
            }
            let courses = write_txn.open_table(COURSES)?;
            if courses.get(new.course_id)?.is_none() {
                return Err(DatabaseError::MissingReference {
                    entity: "course",
                    id: new.course_id,
                });
            }

            let id = next_id(&write_txn, "summaries")?;
            let summary = Summary {
                id,
                name: new.name.clone(),
                description: new.description.clone(),
                author_id: new.author_id,
                course_id: new.course_id,
                downloads: 0,
                filename: new.filename.clone(),
                created_at: Utc::now(),
            };

            let mut table = write_txn.open_table(SUMMARIES)?;
            store(&mut table, id, &summary)?;
            write_txn
                .open_multimap_table(COURSE_SUMMARIES)?
                .insert(summary.course_id, id)?;
            write_txn
                .open_multimap_table(AUTHOR_SUMMARIES)?
                .insert(summary.author_id, id)?;

            let commit = append_in(&write_txn, id, initial_commit)?;
            (summary, commit)
        };
        write_txn.commit()?;
        Ok(created)
    }

    pub fn get_summary(&self, id: u64) -> Result<Option<Summary>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SUMMARIES)?;
        load(&table, id)
    }

    /// List summaries matching the filter, most recently changed first.
    pub fn list_summaries(&self, filter: SummaryFilter) -> Result<Vec<Summary>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SUMMARIES)?;

        let by_course = match filter.course_id {
            Some(course_id) => {
                let index = read_txn.open_multimap_table(COURSE_SUMMARIES)?;
                Some(children(&index, course_id)?.into_iter().collect::<BTreeSet<_>>())
            }
            None => None,
        };
        let by_author = match filter.author_id {
            Some(author_id) => {
                let index = read_txn.open_multimap_table(AUTHOR_SUMMARIES)?;
                Some(children(&index, author_id)?.into_iter().collect::<BTreeSet<_>>())
            }
            None => None,
        };

        let summaries: Vec<Summary> = match (by_course, by_author) {
            (None, None) => load_all(&table)?,
            (Some(ids), None) | (None, Some(ids)) => load_ids(&table, ids)?,
            (Some(course_ids), Some(author_ids)) => {
                load_ids(&table, course_ids.intersection(&author_ids).copied())?
            }
        };

        let commits = read_txn.open_multimap_table(SUMMARY_COMMITS)?;
        let mut ranked = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let latest = children(&commits, summary.id)?.last().copied();
            ranked.push((latest, summary));
        }
        ranked.sort_by(|(a_latest, a), (b_latest, b)| {
            b_latest.cmp(a_latest).then_with(|| b.id.cmp(&a.id))
        });

        Ok(ranked.into_iter().map(|(_, summary)| summary).collect())
    }

    /// Point a summary at a new stored file and append the commit describing the
    /// change, in one transaction. Returns `None` if the summary does not exist.
    pub fn revise_summary(
        &self,
        id: u64,
        filename: &str,
        description: &str,
    ) -> Result<Option<(Summary, Commit)>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let revised = {
            let mut table = write_txn.open_table(SUMMARIES)?;
            let existing: Option<Summary> = load(&table, id)?;
            match existing {
                Some(mut summary) => {
                    summary.filename = filename.to_string();
                    store(&mut table, id, &summary)?;
                    drop(table);
                    let commit = append_in(&write_txn, id, description)?;
                    Some((summary, commit))
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(revised)
    }

    /// Bump the download counter by one. Returns the new count, or `None` if the
    /// summary does not exist.
    pub fn increment_downloads(&self, id: u64) -> Result<Option<u64>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let count = {
            let mut table = write_txn.open_table(SUMMARIES)?;
            let existing: Option<Summary> = load(&table, id)?;
            match existing {
                Some(mut summary) => {
                    summary.downloads = summary.downloads.saturating_add(1);
                    store(&mut table, id, &summary)?;
                    Some(summary.downloads)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(count)
    }

    /// Delete a summary row and its index entries. Commits still indexed under
    /// the summary are swept in the same transaction so none can outlive it.
    pub fn delete_summary_row(&self, id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let existing: Option<Summary> = {
                let table = write_txn.open_table(SUMMARIES)?;
                load(&table, id)?
            };
            match existing {
                Some(summary) => {
                    delete_all_in(&write_txn, id)?;
                    write_txn
                        .open_multimap_table(COURSE_SUMMARIES)?
                        .remove(summary.course_id, id)?;
                    write_txn
                        .open_multimap_table(AUTHOR_SUMMARIES)?
                        .remove(summary.author_id, id)?;
                    write_txn.open_table(SUMMARIES)?.remove(id)?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}

fn load_ids<R>(table: &R, ids: impl IntoIterator<Item = u64>) -> Result<Vec<Summary>, DatabaseError>
where
    R: ReadableTable<u64, &'static [u8]>,
{
    let mut summaries = Vec::new();
    for id in ids {
        if let Some(summary) = load(table, id)? {
            summaries.push(summary);
        }
    }
    Ok(summaries)
}
