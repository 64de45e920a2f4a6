//! Shared test helpers for summary-catalog unit tests.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::auth::{AuthContext, PasswordHasher};
use crate::catalog::Catalog;
use crate::config::{AuthConfig, Config, NodeConfig, NotifierConfig, StorageConfig};
use crate::content::ContentRoot;
use crate::notify::{Notifier, NotifyError, SummaryEvent};
use crate::storage::models::{Course, CourseFields};
use crate::storage::Database;
use crate::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Forwards every event into a channel the test can drain.
pub struct RecordingNotifier {
    events: mpsc::UnboundedSender<SummaryEvent>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &SummaryEvent) -> Result<(), NotifyError> {
        let _ = self.events.send(event.clone());
        Ok(())
    }
}

/// Create a test AppState with a temporary database and content root.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    test_state_with_events(temp_dir).0
}

/// Like `test_state`, also returning the stream of notifier events.
pub fn test_state_with_events(
    temp_dir: &tempfile::TempDir,
) -> (Arc<AppState>, mpsc::UnboundedReceiver<SummaryEvent>) {
    let data_dir = temp_dir.path().join("data");
    let content_dir = temp_dir.path().join("uploads");

    let config = Config {
        auth: AuthConfig {
            password_hash_iterations: 1_000,
            ..AuthConfig::default()
        },
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        notifier: NotifierConfig::default(),
        storage: StorageConfig {
            content_root: content_dir.to_string_lossy().to_string(),
        },
        test_mode: true,
        max_upload_size: 1024 * 1024, // 1MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let content = ContentRoot::new(&content_dir).expect("Failed to create test content root");
    let (tx, rx) = mpsc::unbounded_channel();
    let hasher = PasswordHasher::new(NonZeroU32::new(1_000).expect("non-zero"));
    let catalog = Catalog::new(db, content, Arc::new(RecordingNotifier { events: tx }), hasher);

    (Arc::new(AppState { config, catalog }), rx)
}

/// Seed the admin author and return its authenticated context.
pub async fn seed_admin(state: &AppState) -> AuthContext {
    state
        .catalog
        .ensure_bootstrap_author(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("Failed to seed admin");
    state
        .catalog
        .authenticate(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("Failed to authenticate")
        .expect("Admin credentials rejected")
}

pub fn course_fields(name: &str) -> CourseFields {
    CourseFields {
        name: name.to_string(),
        instructor: "Grace Hopper".to_string(),
        branch: "Computer Science".to_string(),
        year: 2024,
        semester: 1,
    }
}

pub fn seed_course(state: &AppState, ctx: &AuthContext, name: &str) -> Course {
    state
        .catalog
        .create_course(ctx, course_fields(name))
        .expect("Failed to create course")
}
