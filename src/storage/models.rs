use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An author: the identity that owns summaries and administers the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub name: String,
    pub surname: String,
    pub email: String,
    /// Opaque encoded hash, see `crate::auth::PasswordHasher`.
    pub password_hash: String,
}

/// Mutable author columns. The password is already hashed at this layer.
#[derive(Debug, Clone)]
pub struct AuthorRow {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
}

/// A course offering that groups summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub name: String,
    pub instructor: String,
    pub branch: String,
    pub year: i32,
    pub semester: u8,
}

/// Mutable course columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseFields {
    pub name: String,
    pub instructor: String,
    pub branch: String,
    pub year: i32,
    pub semester: u8,
}

/// A catalogued document: metadata plus exactly one backing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub author_id: u64,
    pub course_id: u64,
    pub downloads: u64,
    /// Stored name relative to the content root
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// Columns supplied when a summary row is first inserted.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub name: String,
    pub description: String,
    pub author_id: u64,
    pub course_id: u64,
    pub filename: String,
}

/// An immutable entry in a summary's version log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: u64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub summary_id: u64,
}

/// Optional owner filters for summary listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryFilter {
    pub course_id: Option<u64>,
    pub author_id: Option<u64>,
}

impl SummaryFilter {
    pub fn course(course_id: u64) -> Self {
        Self {
            course_id: Some(course_id),
            author_id: None,
        }
    }

    pub fn author(author_id: u64) -> Self {
        Self {
            course_id: None,
            author_id: Some(author_id),
        }
    }
}
