use super::db::{children, load, load_all, next_id, store, Database, DatabaseError};
use super::models::{Course, CourseFields};
use super::tables::*;

impl Database {
    // ========================================================================
    // Course operations
    // ========================================================================

    pub fn insert_course(&self, fields: &CourseFields) -> Result<Course, DatabaseError> {
        let write_txn = self.begin_write()?;
        let course = {
            let id = next_id(&write_txn, "courses")?;
            let course = Course {
                id,
                name: fields.name.clone(),
                instructor: fields.instructor.clone(),
                branch: fields.branch.clone(),
                year: fields.year,
                semester: fields.semester,
            };
            let mut table = write_txn.open_table(COURSES)?;
            store(&mut table, id, &course)?;
            course
        };
        write_txn.commit()?;
        Ok(course)
    }

    pub fn get_course(&self, id: u64) -> Result<Option<Course>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COURSES)?;
        load(&table, id)
    }

    /// All courses ordered by year, semester and name
    pub fn list_courses(&self) -> Result<Vec<Course>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COURSES)?;
        let mut courses: Vec<Course> = load_all(&table)?;
        courses.sort_by(|a, b| {
            (a.year, a.semester, &a.name, a.id).cmp(&(b.year, b.semester, &b.name, b.id))
        });
        Ok(courses)
    }

    /// Overwrite every mutable course column. Returns `None` if the course does not exist.
    pub fn update_course(
        &self,
        id: u64,
        fields: &CourseFields,
    ) -> Result<Option<Course>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(COURSES)?;
            let existing: Option<Course> = load(&table, id)?;
            match existing {
                Some(mut course) => {
                    course.name = fields.name.clone();
                    course.instructor = fields.instructor.clone();
                    course.branch = fields.branch.clone();
                    course.year = fields.year;
                    course.semester = fields.semester;
                    store(&mut table, id, &course)?;
                    Some(course)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Delete a course row. Refuses with `CourseInUse` while any summary still
    /// references it; summaries must be removed through the document lifecycle first.
    pub fn delete_course(&self, id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let index = write_txn.open_multimap_table(COURSE_SUMMARIES)?;
            let remaining = children(&index, id)?;
            if !remaining.is_empty() {
                return Err(DatabaseError::CourseInUse {
                    course_id: id,
                    summaries: remaining.len(),
                });
            }

            let mut table = write_txn.open_table(COURSES)?;
            let removed = table.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    pub fn course_exists(&self, id: u64) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(COURSES)?;
        Ok(table.get(id)?.is_some())
    }
}
