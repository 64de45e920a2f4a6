//! summary-catalog - A shared catalog of course summaries
//!
//! This crate keeps three things consistent for every document:
//! - The summary record, stored in a redb embedded database (ACID, crash-safe)
//! - Its append-only version log of commits
//! - Its backing file under a flat content root
//!
//! Course and summary deletes cascade so that no commit or file outlives its
//! owner. A REST API with multipart upload support sits on top.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod content;
pub mod notify;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use catalog::Catalog;
use config::Config;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
}
