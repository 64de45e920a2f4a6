mod authors;
mod commits;
mod courses;
pub mod db;
pub mod models;
mod summaries;
mod tables;

pub use authors::normalize_email;
pub use db::{Database, DatabaseError, PurgeStats};
pub use tables::*;
