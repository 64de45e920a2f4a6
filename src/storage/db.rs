use redb::{
    Database as RedbDatabase, ReadTransaction, ReadableMultimapTable, ReadableTable,
    ReadableTableMetadata, Table, WriteTransaction,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("{entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: u64 },
    #[error("email '{0}' is already in use")]
    EmailTaken(String),
    #[error("course {course_id} is still referenced by {summaries} summaries")]
    CourseInUse { course_id: u64, summaries: usize },
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

/// Statistics from a purge operation
#[derive(Debug, Default)]
pub struct PurgeStats {
    pub authors: u64,
    pub courses: u64,
    pub summaries: u64,
    pub commits: u64,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("summary-catalog.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        create_tables(&write_txn)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Purge all data - for testing only
    pub fn purge_all(&self) -> Result<PurgeStats, DatabaseError> {
        let write_txn = self.begin_write()?;
        let stats = PurgeStats {
            authors: write_txn.open_table(AUTHORS)?.len()?,
            courses: write_txn.open_table(COURSES)?.len()?,
            summaries: write_txn.open_table(SUMMARIES)?.len()?,
            commits: write_txn.open_table(COMMITS)?.len()?,
        };

        write_txn.delete_table(AUTHORS)?;
        write_txn.delete_table(AUTHOR_EMAILS)?;
        write_txn.delete_table(COURSES)?;
        write_txn.delete_table(SUMMARIES)?;
        write_txn.delete_table(COMMITS)?;
        write_txn.delete_table(SEQUENCES)?;
        write_txn.delete_multimap_table(COURSE_SUMMARIES)?;
        write_txn.delete_multimap_table(AUTHOR_SUMMARIES)?;
        write_txn.delete_multimap_table(SUMMARY_COMMITS)?;
        create_tables(&write_txn)?;

        write_txn.commit()?;
        Ok(stats)
    }
}

fn create_tables(write_txn: &WriteTransaction) -> Result<(), DatabaseError> {
    let _ = write_txn.open_table(AUTHORS)?;
    let _ = write_txn.open_table(AUTHOR_EMAILS)?;
    let _ = write_txn.open_table(COURSES)?;
    let _ = write_txn.open_table(SUMMARIES)?;
    let _ = write_txn.open_table(COMMITS)?;
    let _ = write_txn.open_table(SEQUENCES)?;
    let _ = write_txn.open_multimap_table(COURSE_SUMMARIES)?;
    let _ = write_txn.open_multimap_table(AUTHOR_SUMMARIES)?;
    let _ = write_txn.open_multimap_table(SUMMARY_COMMITS)?;
    Ok(())
}

// ============================================================================
// Row helpers shared by the per-entity modules
// ============================================================================

/// Allocate the next id for a row table. Ids start at 1 and are never reused.
pub(super) fn next_id(write_txn: &WriteTransaction, sequence: &str) -> Result<u64, DatabaseError> {
    let mut table = write_txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

pub(super) fn load<T, R>(table: &R, id: u64) -> Result<Option<T>, DatabaseError>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
        None => Ok(None),
    }
}

pub(super) fn load_all<T, R>(table: &R) -> Result<Vec<T>, DatabaseError>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    let mut rows = Vec::new();
    for result in table.iter()? {
        let (_, value) = result?;
        rows.push(rmp_serde::from_slice(value.value())?);
    }
    Ok(rows)
}

pub(super) fn store<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    row: &T,
) -> Result<(), DatabaseError> {
    let data = rmp_serde::to_vec_named(row)?;
    table.insert(id, data.as_slice())?;
    Ok(())
}

/// Child ids of a parent in a multimap index, ascending.
pub(super) fn children<R>(index: &R, parent: u64) -> Result<Vec<u64>, DatabaseError>
where
    R: ReadableMultimapTable<u64, u64>,
{
    let mut ids = Vec::new();
    for value in index.get(parent)? {
        ids.push(value?.value());
    }
    Ok(ids)
}
