use redb::{MultimapTableDefinition, TableDefinition};

/// Author rows: id -> Author (msgpack)
pub const AUTHORS: TableDefinition<u64, &[u8]> = TableDefinition::new("authors");

/// Login index: normalized email -> author id
pub const AUTHOR_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("author_emails");

/// Course rows: id -> Course (msgpack)
pub const COURSES: TableDefinition<u64, &[u8]> = TableDefinition::new("courses");

/// Summary rows: id -> Summary (msgpack)
pub const SUMMARIES: TableDefinition<u64, &[u8]> = TableDefinition::new("summaries");

/// Commit rows: id -> Commit (msgpack). Ids are allocated in write order.
pub const COMMITS: TableDefinition<u64, &[u8]> = TableDefinition::new("commits");

/// course id -> summary ids
pub const COURSE_SUMMARIES: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("course_summaries");

/// author id -> summary ids
pub const AUTHOR_SUMMARIES: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("author_summaries");

/// summary id -> commit ids (ascending, so the last value is the newest commit)
pub const SUMMARY_COMMITS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("summary_commits");

/// Id sequences: row table name -> last allocated id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");
