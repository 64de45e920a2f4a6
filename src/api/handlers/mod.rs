mod admin;
mod authors;
mod courses;
mod session;
mod summaries;

pub use admin::{admin_purge, health};
pub use authors::{create_author, list_author_summaries, list_authors, update_author};
pub use courses::{
    create_course, delete_course, get_course, list_course_summaries, list_courses, update_course,
};
pub use session::login;
pub use summaries::{
    create_summary, delete_summary, download_summary, get_summary, list_summaries,
    recent_commits, update_summary,
};
