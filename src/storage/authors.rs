use redb::{ReadableTable, ReadableTableMetadata};

use super::db::{load, load_all, next_id, store, Database, DatabaseError};
use super::models::{Author, AuthorRow};
use super::tables::*;

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Database {
    // ========================================================================
    // Author operations
    // ========================================================================

    /// Insert a new author. Fails with `EmailTaken` if the login handle is in use.
    pub fn insert_author(&self, row: &AuthorRow) -> Result<Author, DatabaseError> {
        let key = normalize_email(&row.email);
        let write_txn = self.begin_write()?;
        let author = {
            let mut emails = write_txn.open_table(AUTHOR_EMAILS)?;
            if emails.get(key.as_str())?.is_some() {
                return Err(DatabaseError::EmailTaken(row.email.clone()));
            }

            let id = next_id(&write_txn, "authors")?;
            let author = Author {
                id,
                name: row.name.clone(),
                surname: row.surname.clone(),
                email: row.email.trim().to_string(),
                password_hash: row.password_hash.clone(),
            };

            let mut table = write_txn.open_table(AUTHORS)?;
            store(&mut table, id, &author)?;
            emails.insert(key.as_str(), id)?;
            author
        };
        write_txn.commit()?;
        Ok(author)
    }

    pub fn get_author(&self, id: u64) -> Result<Option<Author>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(AUTHORS)?;
        load(&table, id)
    }

    /// Resolve a login handle to its author.
    pub fn find_author_by_email(&self, email: &str) -> Result<Option<Author>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let emails = read_txn.open_table(AUTHOR_EMAILS)?;
        let id = match emails.get(normalize_email(email).as_str())? {
            Some(id) => id.value(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(AUTHORS)?;
        load(&table, id)
    }

    pub fn list_authors(&self) -> Result<Vec<Author>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(AUTHORS)?;
        load_all(&table)
    }

    pub fn count_authors(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(AUTHORS)?;
        Ok(table.len()?)
    }

    /// Overwrite every mutable author column, keeping the email index in step.
    /// Returns `None` if the author does not exist.
    pub fn update_author(&self, id: u64, row: &AuthorRow) -> Result<Option<Author>, DatabaseError> {
        let new_key = normalize_email(&row.email);
        let write_txn = self.begin_write()?;

        let existing: Option<Author> = {
            let table = write_txn.open_table(AUTHORS)?;
            load(&table, id)?
        };

        let updated = match existing {
            Some(mut author) => {
                let old_key = normalize_email(&author.email);
                if old_key != new_key {
                    let mut emails = write_txn.open_table(AUTHOR_EMAILS)?;
                    let holder = emails.get(new_key.as_str())?.map(|v| v.value());
                    if holder.is_some_and(|holder| holder != id) {
                        return Err(DatabaseError::EmailTaken(row.email.clone()));
                    }
                    emails.remove(old_key.as_str())?;
                    emails.insert(new_key.as_str(), id)?;
                }

                author.name = row.name.clone();
                author.surname = row.surname.clone();
                author.email = row.email.trim().to_string();
                author.password_hash = row.password_hash.clone();

                let mut table = write_txn.open_table(AUTHORS)?;
                store(&mut table, id, &author)?;
                Some(author)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }
}
