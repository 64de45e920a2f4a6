//! File lifecycle on the content root: one stored file per summary.

pub mod names;
mod root;

pub use root::{ContentRoot, Replacement};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    #[error("Could not find a free name for: {0}")]
    NameExhausted(String),
}
