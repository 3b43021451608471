//! Domain managers - cache-aside access to the datastore.
//!
//! Each manager owns one cache per entity type it governs and is the only
//! path between callers and the store for those types. Reads go cache first;
//! writes go to the store first and only then touch the cache.

pub mod cache_aside;
mod course_manager;
mod university_manager;
mod user_manager;

pub use course_manager::CourseManager;
pub use university_manager::UniversityManager;
pub use user_manager::UserManager;
