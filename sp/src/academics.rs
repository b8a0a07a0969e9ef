//! Academic planner: courses and their assignments
//!
//! Both collections live in one JSON document next to the task store.
//! Deleting a course deletes its assignments.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{RecordId, resolve_prefix};
use crate::store::{StoreError, read_document, write_document};

pub type CourseId = RecordId;
pub type AssignmentId = RecordId;

/// Credits given to a course when none are specified
pub const DEFAULT_CREDITS: u32 = 3;

#[derive(Debug, Error)]
pub enum AcademicsError {
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("Ambiguous id '{prefix}' matches {count} records")]
    Ambiguous { prefix: String, count: usize },

    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    /// Catalogue code, e.g. CS101
    pub code: String,
    pub credits: u32,
    #[serde(default)]
    pub professor: String,
    /// Free-form meeting times, e.g. "Mon, Wed 10:00-11:00"
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub completed: bool,
}

impl Course {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: CourseId::generate(),
            name: name.into(),
            code: code.into(),
            credits: DEFAULT_CREDITS,
            professor: String::new(),
            schedule: String::new(),
            location: String::new(),
            completed: false,
        }
    }
}

/// Field updates for a course; `None` and blank strings leave the field as is
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<u32>,
    pub professor: Option<String>,
    pub schedule: Option<String>,
    pub location: Option<String>,
}

impl CoursePatch {
    fn apply(self, course: &mut Course) {
        let set = |field: &mut String, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        };
        set(&mut course.name, self.name);
        set(&mut course.code, self.code);
        set(&mut course.professor, self.professor);
        set(&mut course.schedule, self.schedule);
        set(&mut course.location, self.location);
        if let Some(credits) = self.credits.filter(|c| *c > 0) {
            course.credits = credits;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub course_id: CourseId,
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl Assignment {
    pub fn new(course_id: CourseId, title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            id: AssignmentId::generate(),
            course_id,
            title: title.into(),
            due_date,
            description: String::new(),
            completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Credit totals across all courses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreditSummary {
    pub total: u32,
    pub completed: u32,
}

/// Courses and assignments, with the operations over them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcademicPlanner {
    #[serde(default)]
    courses: Vec<Course>,
    #[serde(default)]
    assignments: Vec<Assignment>,
}

impl AcademicPlanner {
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn course(&self, id: &CourseId) -> Result<&Course, AcademicsError> {
        self.courses
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| AcademicsError::CourseNotFound(id.to_string()))
    }

    /// Add a course; name and code are required
    pub fn add_course(&mut self, course: Course) -> Result<Course, AcademicsError> {
        if course.name.trim().is_empty() {
            return Err(AcademicsError::MissingField("course name"));
        }
        if course.code.trim().is_empty() {
            return Err(AcademicsError::MissingField("course code"));
        }
        debug!(code = %course.code, "add_course: called");
        self.courses.push(course.clone());
        Ok(course)
    }

    pub fn update_course(&mut self, id: &CourseId, patch: CoursePatch) -> Result<Course, AcademicsError> {
        let course = self.course_mut(id)?;
        patch.apply(course);
        Ok(course.clone())
    }

    pub fn toggle_course(&mut self, id: &CourseId) -> Result<Course, AcademicsError> {
        let course = self.course_mut(id)?;
        course.completed = !course.completed;
        Ok(course.clone())
    }

    /// Remove a course and every assignment that belongs to it
    ///
    /// Returns the course and the number of assignments removed with it.
    pub fn delete_course(&mut self, id: &CourseId) -> Result<(Course, usize), AcademicsError> {
        let index = self
            .courses
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| AcademicsError::CourseNotFound(id.to_string()))?;
        let course = self.courses.remove(index);

        let before = self.assignments.len();
        self.assignments.retain(|a| &a.course_id != id);
        let removed = before - self.assignments.len();
        info!(code = %course.code, removed, "Deleted course");
        Ok((course, removed))
    }

    /// Add an assignment to an existing course; the title is required
    pub fn add_assignment(&mut self, assignment: Assignment) -> Result<Assignment, AcademicsError> {
        if assignment.title.trim().is_empty() {
            return Err(AcademicsError::MissingField("assignment title"));
        }
        self.course(&assignment.course_id)?;
        self.assignments.push(assignment.clone());
        Ok(assignment)
    }

    pub fn toggle_assignment(&mut self, id: &AssignmentId) -> Result<Assignment, AcademicsError> {
        let assignment = self
            .assignments
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| AcademicsError::AssignmentNotFound(id.to_string()))?;
        assignment.completed = !assignment.completed;
        Ok(assignment.clone())
    }

    pub fn delete_assignment(&mut self, id: &AssignmentId) -> Result<Assignment, AcademicsError> {
        let index = self
            .assignments
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| AcademicsError::AssignmentNotFound(id.to_string()))?;
        Ok(self.assignments.remove(index))
    }

    /// Find a course by id, unique id prefix, or course code (case-insensitive)
    pub fn resolve_course(&self, key: &str) -> Result<CourseId, AcademicsError> {
        if let Some(course) = self.courses.iter().find(|c| c.code.eq_ignore_ascii_case(key.trim())) {
            return Ok(course.id.clone());
        }
        match resolve_prefix(self.courses.iter().map(|c| &c.id), key) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(AcademicsError::CourseNotFound(key.trim().to_string())),
            Err(count) => Err(AcademicsError::Ambiguous {
                prefix: key.trim().to_string(),
                count,
            }),
        }
    }

    pub fn resolve_assignment(&self, prefix: &str) -> Result<AssignmentId, AcademicsError> {
        match resolve_prefix(self.assignments.iter().map(|a| &a.id), prefix) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(AcademicsError::AssignmentNotFound(prefix.trim().to_string())),
            Err(count) => Err(AcademicsError::Ambiguous {
                prefix: prefix.trim().to_string(),
                count,
            }),
        }
    }

    /// Incomplete assignments, earliest due date first
    pub fn upcoming_assignments(&self) -> Vec<&Assignment> {
        let mut upcoming: Vec<&Assignment> = self.assignments.iter().filter(|a| !a.completed).collect();
        upcoming.sort_by_key(|a| a.due_date);
        upcoming
    }

    pub fn credit_summary(&self) -> CreditSummary {
        self.courses.iter().fold(CreditSummary::default(), |mut sum, c| {
            sum.total += c.credits;
            if c.completed {
                sum.completed += c.credits;
            }
            sum
        })
    }

    fn course_mut(&mut self, id: &CourseId) -> Result<&mut Course, AcademicsError> {
        self.courses
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| AcademicsError::CourseNotFound(id.to_string()))
    }
}

/// Academic planner persisted as one JSON document
#[derive(Debug)]
pub struct JsonAcademicStore {
    path: PathBuf,
    planner: AcademicPlanner,
}

impl JsonAcademicStore {
    /// Open the document at `path`; a missing or empty file is an empty planner
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AcademicsError> {
        let path = path.as_ref().to_path_buf();
        let planner: AcademicPlanner = read_document(&path)?;
        debug!(?path, courses = planner.courses.len(), "Opened academic planner");
        Ok(Self { path, planner })
    }

    pub fn planner(&self) -> &AcademicPlanner {
        &self.planner
    }

    /// Run a mutation and write the document if it succeeds
    pub fn apply<T>(
        &mut self,
        change: impl FnOnce(&mut AcademicPlanner) -> Result<T, AcademicsError>,
    ) -> Result<T, AcademicsError> {
        let result = change(&mut self.planner)?;
        write_document(&self.path, &self.planner)?;
        Ok(result)
    }
}
