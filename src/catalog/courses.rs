use serde::Serialize;

use super::{require_text, Catalog, CatalogError, Result};
use crate::auth::AuthContext;
use crate::storage::models::{Course, CourseFields};

/// Outcome of a course delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub summaries_deleted: u64,
}

fn validate(fields: &CourseFields) -> Result<()> {
    require_text("name", &fields.name)?;
    require_text("instructor", &fields.instructor)?;
    require_text("branch", &fields.branch)?;
    if fields.semester == 0 {
        return Err(CatalogError::InvalidInput(
            "semester must be at least 1".to_string(),
        ));
    }
    Ok(())
}

impl Catalog {
    // ========================================================================
    // Courses
    // ========================================================================

    pub fn create_course(&self, ctx: &AuthContext, fields: CourseFields) -> Result<Course> {
        validate(&fields)?;
        let course = self.db.insert_course(&fields)?;
        tracing::debug!(course_id = course.id, actor = ctx.author_id(), "Created course");
        Ok(course)
    }

    pub fn update_course(&self, ctx: &AuthContext, id: u64, fields: CourseFields) -> Result<Course> {
        validate(&fields)?;
        let course = self
            .db
            .update_course(id, &fields)?
            .ok_or_else(|| CatalogError::not_found("course", id))?;
        tracing::debug!(course_id = id, actor = ctx.author_id(), "Updated course");
        Ok(course)
    }

    /// Delete a course and, through the summary lifecycle, everything filed under it.
    pub async fn delete_course(&self, ctx: &AuthContext, id: u64) -> Result<CascadeReport> {
        if !self.db.course_exists(id)? {
            return Err(CatalogError::not_found("course", id));
        }

        let summaries_deleted = self.cascade_delete_for_course(id).await?;
        tracing::debug!(
            course_id = id,
            summaries_deleted,
            actor = ctx.author_id(),
            "Deleted course"
        );
        Ok(CascadeReport { summaries_deleted })
    }

    pub fn get_course(&self, id: u64) -> Result<Course> {
        self.db
            .get_course(id)?
            .ok_or_else(|| CatalogError::not_found("course", id))
    }

    pub fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.db.list_courses()?)
    }
}
