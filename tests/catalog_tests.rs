use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use summary_catalog::auth::{AuthContext, PasswordHasher};
use summary_catalog::catalog::{
    AuthorFields, Catalog, CatalogError, SummaryDraft, Upload, INITIAL_COMMIT_MESSAGE,
};
use summary_catalog::content::ContentRoot;
use summary_catalog::notify::{EventKind, Notifier, NotifyError, SummaryEvent};
use summary_catalog::storage::models::CourseFields;
use summary_catalog::storage::Database;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "hunter2";

struct ChannelNotifier(mpsc::UnboundedSender<SummaryEvent>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, event: &SummaryEvent) -> Result<(), NotifyError> {
        let _ = self.0.send(event.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _event: &SummaryEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected("chat is down".to_string()))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    catalog: Catalog,
    ctx: AuthContext,
    events: mpsc::UnboundedReceiver<SummaryEvent>,
}

fn build(dir: &tempfile::TempDir, notifier: Arc<dyn Notifier>) -> Catalog {
    let db = Database::open(dir.path().join("data")).unwrap();
    let content = ContentRoot::new(dir.path().join("uploads")).unwrap();
    let hasher = PasswordHasher::new(NonZeroU32::new(1_000).unwrap());
    Catalog::new(db, content, notifier, hasher)
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let (tx, events) = mpsc::unbounded_channel();
    let catalog = build(&dir, Arc::new(ChannelNotifier(tx)));

    catalog
        .ensure_bootstrap_author(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();
    let ctx = catalog
        .authenticate(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap()
        .expect("admin credentials accepted");

    Fixture {
        _dir: dir,
        catalog,
        ctx,
        events,
    }
}

fn course(year: i32, semester: u8) -> CourseFields {
    CourseFields {
        name: "Operating Systems".to_string(),
        instructor: "Andrew Tanenbaum".to_string(),
        branch: "Computer Science".to_string(),
        year,
        semester,
    }
}

fn upload(name: &str, data: &'static [u8]) -> Upload {
    Upload {
        file_name: name.to_string(),
        data: Bytes::from_static(data),
    }
}

fn draft(name: &str, author_id: u64, course_id: u64) -> SummaryDraft {
    SummaryDraft {
        name: name.to_string(),
        description: "intro".to_string(),
        author_id,
        course_id,
    }
}

fn stored_files(catalog: &Catalog) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(catalog.content().path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SummaryEvent>) -> SummaryEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("notification delivered in time")
        .expect("notifier channel open")
}

#[tokio::test]
async fn test_summary_lifecycle_scenario() {
    let f = fixture().await;
    let c1 = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let a1 = f.ctx.author_id();

    let s1 = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", a1, c1.id), upload("a.pdf", b"first"))
        .await
        .unwrap();
    assert_eq!(s1.downloads, 0);
    assert_eq!(s1.filename, "a.pdf");
    let detail = f.catalog.get_summary(s1.id).unwrap();
    assert_eq!(detail.commits.len(), 1);
    assert_eq!(detail.commits[0].description, INITIAL_COMMIT_MESSAGE);

    let updated = f
        .catalog
        .update_summary(&f.ctx, s1.id, "fix typo", upload("b.pdf", b"second"))
        .await
        .unwrap();
    assert_eq!(updated.filename, "b.pdf");
    let detail = f.catalog.get_summary(s1.id).unwrap();
    assert_eq!(detail.commits.len(), 2);
    assert_eq!(detail.commits[0].description, "fix typo");
    assert!(f.catalog.content().exists("b.pdf").await);
    assert!(!f.catalog.content().exists("a.pdf").await);

    f.catalog.delete_summary(&f.ctx, s1.id).await.unwrap();
    assert_eq!(f.catalog.database().list_commits(s1.id, None).unwrap().len(), 0);
    assert!(stored_files(&f.catalog).is_empty());

    assert!(!f.catalog.verify_login("bad@x.com", "anything").await.unwrap());
}

#[tokio::test]
async fn test_verify_login_checks_password() {
    let f = fixture().await;
    assert!(f.catalog.verify_login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap());
    assert!(f.catalog.verify_login("ADMIN@example.com", ADMIN_PASSWORD).await.unwrap());
    assert!(!f.catalog.verify_login(ADMIN_EMAIL, "wrong").await.unwrap());
}

#[tokio::test]
async fn test_bootstrap_only_seeds_empty_catalog() {
    let f = fixture().await;
    let again = f
        .catalog
        .ensure_bootstrap_author("other@example.com", "pw")
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(f.catalog.list_authors().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_with_unknown_course_has_no_side_effects() {
    let f = fixture().await;

    let err = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), 99), upload("a.pdf", b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert!(stored_files(&f.catalog).is_empty());
    assert!(f.catalog.list_all_summaries().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_traversal_filename() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();

    let err = f
        .catalog
        .create_summary(
            &f.ctx,
            draft("Notes", f.ctx.author_id(), c.id),
            upload("../../etc/passwd", b"x"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));
    assert!(f.catalog.list_all_summaries().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_empty_name() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();

    let err = f
        .catalog
        .create_summary(&f.ctx, draft("  ", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));
    assert!(stored_files(&f.catalog).is_empty());
}

#[tokio::test]
async fn test_same_filename_twice_gets_distinct_files() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let author = f.ctx.author_id();

    let first = f
        .catalog
        .create_summary(&f.ctx, draft("One", author, c.id), upload("notes.pdf", b"1"))
        .await
        .unwrap();
    let second = f
        .catalog
        .create_summary(&f.ctx, draft("Two", author, c.id), upload("notes.pdf", b"2"))
        .await
        .unwrap();
    assert_ne!(first.filename, second.filename);

    // Deleting one must leave the other's file intact.
    f.catalog.delete_summary(&f.ctx, first.id).await.unwrap();
    assert!(f.catalog.content().exists(&second.filename).await);
}

#[tokio::test]
async fn test_update_requires_description() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let s = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();

    let err = f
        .catalog
        .update_summary(&f.ctx, s.id, "", upload("b.pdf", b"y"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));
    assert_eq!(stored_files(&f.catalog), vec!["a.pdf".to_string()]);
    assert_eq!(f.catalog.get_summary(s.id).unwrap().commits.len(), 1);
}

#[tokio::test]
async fn test_update_missing_summary_is_not_found() {
    let f = fixture().await;
    let err = f
        .catalog
        .update_summary(&f.ctx, 12, "change", upload("b.pdf", b"y"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert!(stored_files(&f.catalog).is_empty());
}

#[tokio::test]
async fn test_repeated_delete_is_not_found() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let s = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();

    f.catalog.delete_summary(&f.ctx, s.id).await.unwrap();
    let err = f.catalog.delete_summary(&f.ctx, s.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_survives_missing_file() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let s = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();
    std::fs::remove_file(f.catalog.content().path().join(&s.filename)).unwrap();

    f.catalog.delete_summary(&f.ctx, s.id).await.unwrap();
    assert!(f.catalog.list_all_summaries().unwrap().is_empty());
}

#[tokio::test]
async fn test_course_delete_cascades() {
    let f = fixture().await;
    let doomed = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let kept = f.catalog.create_course(&f.ctx, course(2024, 2)).unwrap();
    let author = f.ctx.author_id();

    for i in 0..3 {
        let s = f
            .catalog
            .create_summary(
                &f.ctx,
                draft(&format!("Doomed {i}"), author, doomed.id),
                upload(&format!("doomed-{i}.pdf"), b"x"),
            )
            .await
            .unwrap();
        f.catalog
            .update_summary(&f.ctx, s.id, "second pass", upload(&format!("doomed-{i}-v2.pdf"), b"y"))
            .await
            .unwrap();
    }
    let survivor = f
        .catalog
        .create_summary(&f.ctx, draft("Kept", author, kept.id), upload("kept.pdf", b"k"))
        .await
        .unwrap();

    let report = f.catalog.delete_course(&f.ctx, doomed.id).await.unwrap();
    assert_eq!(report.summaries_deleted, 3);

    assert!(matches!(
        f.catalog.get_course(doomed.id),
        Err(CatalogError::NotFound(_))
    ));
    assert!(matches!(
        f.catalog.list_summaries_by_course(doomed.id),
        Err(CatalogError::NotFound(_))
    ));
    assert_eq!(stored_files(&f.catalog), vec![survivor.filename.clone()]);
    // Only the survivor's initial commit is left.
    assert_eq!(f.catalog.database().count_all_commits().unwrap(), 1);
}

#[tokio::test]
async fn test_delete_unknown_course_is_not_found() {
    let f = fixture().await;
    let err = f.catalog.delete_course(&f.ctx, 5).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn test_record_download_counts_each_call() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let s = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();

    for _ in 0..5 {
        let path = f.catalog.record_download(s.id).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"x");
    }
    assert_eq!(f.catalog.get_summary(s.id).unwrap().summary.downloads, 5);

    let err = f.catalog.record_download(s.id + 1).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn test_missing_file_download_is_not_counted() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let s = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();
    std::fs::remove_file(f.catalog.content().path().join(&s.filename)).unwrap();

    let err = f.catalog.record_download(s.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert_eq!(f.catalog.get_summary(s.id).unwrap().summary.downloads, 0);
}

#[tokio::test]
async fn test_recent_changes_with_unbounded_limit() {
    let f = fixture().await;
    assert!(f.catalog.list_recent_commits(usize::MAX).unwrap().is_empty());

    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let s = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();
    f.catalog
        .update_summary(&f.ctx, s.id, "fix typo", upload("a.pdf", b"y"))
        .await
        .unwrap();

    let recent = f.catalog.list_recent_commits(usize::MAX).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].commit.description, "fix typo");
    assert_eq!(recent[1].commit.description, INITIAL_COMMIT_MESSAGE);
}

#[tokio::test]
async fn test_listing_by_author_and_recent_changes() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let other = f
        .catalog
        .create_author(
            &f.ctx,
            AuthorFields {
                name: "Grace".to_string(),
                surname: "Hopper".to_string(),
                email: "grace@example.com".to_string(),
                password: "cobol".to_string(),
            },
        )
        .await
        .unwrap();

    let mine = f
        .catalog
        .create_summary(&f.ctx, draft("Mine", f.ctx.author_id(), c.id), upload("mine.pdf", b"m"))
        .await
        .unwrap();
    let theirs = f
        .catalog
        .create_summary(&f.ctx, draft("Theirs", other.id, c.id), upload("theirs.pdf", b"t"))
        .await
        .unwrap();
    f.catalog
        .update_summary(&f.ctx, mine.id, "expanded", upload("mine.pdf", b"m2"))
        .await
        .unwrap();

    let by_other = f.catalog.list_summaries_by_author(other.id).unwrap();
    assert_eq!(by_other.len(), 1);
    assert_eq!(by_other[0].id, theirs.id);

    assert!(matches!(
        f.catalog.list_summaries_by_author(999),
        Err(CatalogError::NotFound(_))
    ));

    let recent = f.catalog.list_recent_commits(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].commit.description, "expanded");
    assert_eq!(recent[0].summary.id, mine.id);
    assert_eq!(recent[1].summary.id, theirs.id);

    let by_course = f.catalog.list_summaries_by_course(c.id).unwrap();
    assert_eq!(by_course[0].id, mine.id);
}

#[tokio::test]
async fn test_author_email_conflicts() {
    let f = fixture().await;
    let fields = |email: &str| AuthorFields {
        name: "Grace".to_string(),
        surname: "Hopper".to_string(),
        email: email.to_string(),
        password: "cobol".to_string(),
    };

    let err = f.catalog.create_author(&f.ctx, fields("Admin@Example.com")).await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let grace = f.catalog.create_author(&f.ctx, fields("grace@example.com")).await.unwrap();
    let err = f
        .catalog
        .update_author(&f.ctx, grace.id, fields(ADMIN_EMAIL))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let err = f.catalog.create_author(&f.ctx, fields("not-an-email")).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));
}

#[tokio::test]
async fn test_update_author_replaces_password() {
    let f = fixture().await;
    let fields = AuthorFields {
        name: "Catalog".to_string(),
        surname: "Administrator".to_string(),
        email: ADMIN_EMAIL.to_string(),
        password: "new secret".to_string(),
    };
    f.catalog
        .update_author(&f.ctx, f.ctx.author_id(), fields)
        .await
        .unwrap();

    assert!(!f.catalog.verify_login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap());
    assert!(f.catalog.verify_login(ADMIN_EMAIL, "new secret").await.unwrap());
}

#[tokio::test]
async fn test_course_validation() {
    let f = fixture().await;
    let err = f.catalog.create_course(&f.ctx, course(2024, 0)).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));

    let mut blank = course(2024, 1);
    blank.instructor = " ".to_string();
    let err = f.catalog.create_course(&f.ctx, blank).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));

    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let mut renamed = course(2025, 2);
    renamed.name = "Distributed Systems".to_string();
    let updated = f.catalog.update_course(&f.ctx, c.id, renamed).unwrap();
    assert_eq!(updated.name, "Distributed Systems");
    assert_eq!(updated.year, 2025);
}

#[tokio::test]
async fn test_notifications_follow_create_and_update() {
    let mut f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    let s = f
        .catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();

    let added = next_event(&mut f.events).await;
    assert_eq!(added.kind, EventKind::Added);
    assert_eq!(added.summary_name, "Notes");
    assert_eq!(added.course_id, c.id);
    assert_eq!(added.commit_description, None);

    f.catalog
        .update_summary(&f.ctx, s.id, "fix typo", upload("b.pdf", b"y"))
        .await
        .unwrap();
    let updated = next_event(&mut f.events).await;
    assert_eq!(updated.kind, EventKind::Updated);
    assert_eq!(updated.commit_description.as_deref(), Some("fix typo"));
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_create() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = build(&dir, Arc::new(FailingNotifier));
    catalog
        .ensure_bootstrap_author(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();
    let ctx = catalog
        .authenticate(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap()
        .unwrap();
    let c = catalog.create_course(&ctx, course(2024, 1)).unwrap();

    let s = catalog
        .create_summary(&ctx, draft("Notes", ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();
    // Let the spawned delivery run and fail.
    tokio::task::yield_now().await;
    assert!(catalog.get_summary(s.id).is_ok());
}

#[tokio::test]
async fn test_purge_clears_rows_and_files() {
    let f = fixture().await;
    let c = f.catalog.create_course(&f.ctx, course(2024, 1)).unwrap();
    f.catalog
        .create_summary(&f.ctx, draft("Notes", f.ctx.author_id(), c.id), upload("a.pdf", b"x"))
        .await
        .unwrap();

    let stats = f.catalog.purge().await.unwrap();
    assert_eq!(stats.summaries, 1);
    assert_eq!(stats.commits, 1);
    assert!(stored_files(&f.catalog).is_empty());
    assert!(f.catalog.list_courses().unwrap().is_empty());
}
