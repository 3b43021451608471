//! Backing store contract.
//!
//! Every method is one synchronous round trip. Implementations are only ever
//! called through [`Datastore`](super::Datastore), which holds the process-wide
//! lock for the whole call.

use thiserror::Error;

use super::models::{Building, Course, Department, Major, Meeting, Role, School, Section, User};

/// Failures reported by a store backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached, or has been closed.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// An integrity rule was violated (duplicate key, dangling reference).
    #[error("constraint violation: {reason}")]
    Constraint { reason: String },

    /// Any other backend failure.
    #[error("store error: {reason}")]
    Backend { reason: String },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn constraint(reason: impl Into<String>) -> Self {
        Self::Constraint {
            reason: reason.into(),
        }
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The persistent datastore behind the domain managers.
///
/// `add_*` and `modify_*` return `Ok(false)` when no row was written
/// (the key already exists, or there is no row to modify).
pub trait Store: Send + Sync {
    // Schools
    fn does_school_exist(&self, id: u32) -> StoreResult<bool>;
    fn get_school(&self, id: u32) -> StoreResult<Option<School>>;
    fn get_schools(&self) -> StoreResult<Vec<School>>;
    fn add_school(&self, school: &School) -> StoreResult<bool>;
    fn modify_school(&self, school: &School) -> StoreResult<bool>;

    // Departments
    fn does_department_exist(&self, id: u32) -> StoreResult<bool>;
    fn get_department(&self, id: u32) -> StoreResult<Option<Department>>;
    fn get_departments_by_school(&self, school_id: u32) -> StoreResult<Vec<Department>>;
    fn add_department(&self, department: &Department) -> StoreResult<bool>;
    fn modify_department(&self, department: &Department) -> StoreResult<bool>;

    // Majors
    fn does_major_exist(&self, id: u32) -> StoreResult<bool>;
    fn get_major(&self, id: u32) -> StoreResult<Option<Major>>;
    fn get_majors_by_department(&self, department_id: u32) -> StoreResult<Vec<Major>>;
    fn add_major(&self, major: &Major) -> StoreResult<bool>;
    fn modify_major(&self, major: &Major) -> StoreResult<bool>;

    // Buildings
    fn does_building_exist(&self, id: u32) -> StoreResult<bool>;
    fn get_building(&self, id: u32) -> StoreResult<Option<Building>>;
    fn get_buildings(&self) -> StoreResult<Vec<Building>>;
    fn add_building(&self, building: &Building) -> StoreResult<bool>;
    fn modify_building(&self, building: &Building) -> StoreResult<bool>;

    // Courses
    fn does_course_exist(&self, id: u32) -> StoreResult<bool>;
    fn get_course(&self, id: u32) -> StoreResult<Option<Course>>;
    fn get_courses_by_department(&self, department_id: u32) -> StoreResult<Vec<Course>>;
    fn add_course(&self, course: &Course) -> StoreResult<bool>;
    fn modify_course(&self, course: &Course) -> StoreResult<bool>;

    // Sections
    fn does_section_exist(&self, id: u32) -> StoreResult<bool>;
    fn get_section(&self, id: u32) -> StoreResult<Option<Section>>;
    fn get_sections_by_course(&self, course_id: u32) -> StoreResult<Vec<Section>>;
    fn get_sections_by_instructor(&self, instructor_id: &str) -> StoreResult<Vec<Section>>;
    /// Writes the section row only; meetings go through `set_section_meetings`.
    fn add_section(&self, section: &Section) -> StoreResult<bool>;
    /// Updates the section row only; meetings go through `set_section_meetings`.
    fn modify_section(&self, section: &Section) -> StoreResult<bool>;
    /// Replace the meeting rows of a section.
    fn set_section_meetings(&self, section_id: u32, meetings: &[Meeting]) -> StoreResult<bool>;

    // Users
    fn does_user_exist(&self, university_id: &str) -> StoreResult<bool>;
    fn get_user(&self, university_id: &str) -> StoreResult<Option<User>>;
    fn get_users_by_role(&self, role: Role) -> StoreResult<Vec<User>>;
    fn add_user(&self, user: &User) -> StoreResult<bool>;
    fn modify_user(&self, user: &User) -> StoreResult<bool>;
}
