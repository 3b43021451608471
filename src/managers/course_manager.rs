//! Course and section manager.
//!
//! Sections reference a course (owned here), a building (university
//! manager) and optionally an instructor (user manager). Parent checks go
//! through the owning manager, which falls back to the store on a cache miss.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheCapacities, CacheRegistry};
use crate::database::{Building, Course, Datastore, Department, Section, User};
use crate::error::{RegistrarError, Result};

use super::cache_aside::{
    confirm_exists, read_listing, read_through, require_parent, write_existing, write_new,
    EntityCache,
};
use super::{UniversityManager, UserManager};

/// Manager for courses and their sections.
pub struct CourseManager {
    store: Datastore,
    university: Arc<UniversityManager>,
    users: Arc<UserManager>,
    courses: EntityCache<Course>,
    sections: EntityCache<Section>,
}

impl CourseManager {
    pub fn new(
        store: Datastore,
        university: Arc<UniversityManager>,
        users: Arc<UserManager>,
        caches: &CacheRegistry,
        capacities: &CacheCapacities,
    ) -> Self {
        Self {
            store,
            university,
            users,
            courses: caches.get_or_create("catalog.courses", capacities.courses),
            sections: caches.get_or_create("catalog.sections", capacities.sections),
        }
    }

    // --- Courses ---

    pub fn get_course(&self, id: u32) -> Result<Course> {
        read_through(&self.courses, &self.store, &id, "get_course", |db| db.get_course(id))
    }

    /// Courses offered by one department.
    pub fn get_courses(&self, department_id: u32) -> Result<Vec<Course>> {
        read_listing(
            &self.courses,
            &self.store,
            "get_courses_by_department",
            |c| c.department_id == department_id,
            |db| db.get_courses_by_department(department_id),
        )
    }

    pub fn course_exists(&self, id: u32) -> Result<bool> {
        confirm_exists(&self.courses, &self.store, &id, "does_course_exist", |db| {
            db.does_course_exist(id)
        })
    }

    pub fn add_course(&self, course: &Course) -> Result<()> {
        if self.course_exists(course.id)? {
            return Err(RegistrarError::duplicate::<Course>(&course.id));
        }
        self.check_department(course)?;
        write_new(&self.courses, &self.store, course, "add_course", |db, c| db.add_course(c))
    }

    pub fn modify_course(&self, course: &Course) -> Result<()> {
        self.check_department(course)?;
        write_existing(&self.courses, &self.store, course, "modify_course", |db, c| {
            db.modify_course(c)
        })
    }

    pub fn has_course_cached(&self, id: u32) -> bool {
        self.courses.contains(&id)
    }

    // --- Sections ---

    pub fn get_section(&self, id: u32) -> Result<Section> {
        read_through(&self.sections, &self.store, &id, "get_section", |db| db.get_section(id))
    }

    /// Sections of one course, across terms.
    pub fn get_sections(&self, course_id: u32) -> Result<Vec<Section>> {
        read_listing(
            &self.sections,
            &self.store,
            "get_sections_by_course",
            |s| s.course_id == course_id,
            |db| db.get_sections_by_course(course_id),
        )
    }

    /// Sections taught by one faculty member.
    pub fn get_sections_for_instructor(&self, instructor_id: &str) -> Result<Vec<Section>> {
        read_listing(
            &self.sections,
            &self.store,
            "get_sections_by_instructor",
            |s| s.instructor_id.as_deref() == Some(instructor_id),
            |db| db.get_sections_by_instructor(instructor_id),
        )
    }

    /// Create a section and its meetings.
    ///
    /// The section row and its meeting rows are two store calls made under
    /// one write guard. If the meetings call fails, the error is returned and
    /// nothing is cached, but the section row stays committed.
    pub fn add_section(&self, section: &Section) -> Result<()> {
        let exists = confirm_exists(
            &self.sections,
            &self.store,
            &section.id,
            "does_section_exist",
            |db| db.does_section_exist(section.id),
        )?;
        if exists {
            return Err(RegistrarError::duplicate::<Section>(&section.id));
        }
        self.check_section_parents(section)?;

        self.write_section(section, SectionWrite::Create)?;
        debug!("Created section {}", section.id);
        Ok(())
    }

    /// Update a section and replace its meetings. Same shape as
    /// [`CourseManager::add_section`].
    pub fn modify_section(&self, section: &Section) -> Result<()> {
        self.check_section_parents(section)?;
        self.write_section(section, SectionWrite::Update)
    }

    pub fn has_section_cached(&self, id: u32) -> bool {
        self.sections.contains(&id)
    }

    fn check_department(&self, course: &Course) -> Result<()> {
        require_parent::<Department>(
            self.university.department_exists(course.department_id)?,
            &course.department_id,
        )
    }

    fn check_section_parents(&self, section: &Section) -> Result<()> {
        require_parent::<Course>(self.course_exists(section.course_id)?, &section.course_id)?;
        require_parent::<Building>(
            self.university.building_exists(section.building_id)?,
            &section.building_id,
        )?;
        if let Some(instructor) = &section.instructor_id {
            require_parent::<User>(self.users.user_exists(instructor)?, instructor)?;
        }
        Ok(())
    }

    /// Row write, meetings write and cache update, all under one write guard.
    fn write_section(&self, section: &Section, kind: SectionWrite) -> Result<()> {
        let op = match kind {
            SectionWrite::Create => "add_section",
            SectionWrite::Update => "modify_section",
        };

        // None: no row was written. Some(false): the row vanished before its
        // meetings could be stored.
        let outcome = self
            .store
            .mutate(op, |db| {
                let row = match kind {
                    SectionWrite::Create => db.add_section(section)?,
                    SectionWrite::Update => db.modify_section(section)?,
                };
                if !row {
                    return Ok(None);
                }

                let stored = db
                    .set_section_meetings(section.id, &section.meetings)
                    .inspect_err(|e| {
                        warn!("Section {} row committed but meetings were not: {}", section.id, e)
                    })?;
                if stored {
                    match kind {
                        SectionWrite::Create => self.sections.insert(section.id, section.clone()),
                        SectionWrite::Update => {
                            if self.sections.patch(section.id, section.clone()) {
                                debug!("Patched cached section {}", section.id);
                            }
                        }
                    }
                }
                Ok(Some(stored))
            })
            .inspect_err(|e| warn!("{} for section {} failed: {}", op, section.id, e))?;

        match (outcome, kind) {
            (Some(true), _) => Ok(()),
            (None, SectionWrite::Create) => Err(RegistrarError::duplicate::<Section>(&section.id)),
            (None, SectionWrite::Update) | (Some(false), _) => {
                Err(RegistrarError::not_found::<Section>(&section.id))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SectionWrite {
    Create,
    Update,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{EntityKind, Meeting, MemoryStore, Role, School, Store, StoreError};
    use chrono::{NaiveTime, Weekday};
    use std::sync::Barrier;
    use std::thread;

    struct Fixture {
        courses: CourseManager,
        users: Arc<UserManager>,
        backend: MemoryStore,
    }

    fn fixture() -> Fixture {
        let backend = MemoryStore::new();
        backend.add_school(&School::new(1, "Engineering")).unwrap();
        backend.add_department(&Department::new(10, 1, "CS", "Computer Science")).unwrap();
        backend.add_building(&Building::new(5, "ENG", "Engineering Hall")).unwrap();

        let store = Datastore::new(backend.clone());
        let caches = CacheRegistry::new();
        let capacities = CacheCapacities::uniform(4);
        let university = Arc::new(UniversityManager::new(store.clone(), &caches, &capacities));
        let users = Arc::new(UserManager::new(
            store.clone(),
            university.clone(),
            &caches,
            &capacities,
        ));
        let courses = CourseManager::new(store, university, users.clone(), &caches, &capacities);
        Fixture { courses, users, backend }
    }

    fn monday_nine() -> Meeting {
        Meeting::new(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 50, 0).unwrap(),
        )
    }

    #[test]
    fn test_get_course_single_store_round_trip() {
        let f = fixture();
        f.backend.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();

        assert_eq!(f.courses.get_course(5).unwrap().title, "Intro");
        assert_eq!(f.backend.calls("get_course"), 1);

        f.courses.get_course(5).unwrap();
        assert_eq!(f.backend.calls("get_course"), 1);
    }

    #[test]
    fn test_failed_modify_course_keeps_cached_value() {
        let f = fixture();
        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        let cached = f.courses.get_course(5).unwrap();

        f.backend.fail_op("modify_course", StoreError::unavailable("connection reset"));
        let mut edited = cached.clone();
        edited.title = "Intro to Programming".into();
        let err = f.courses.modify_course(&edited).unwrap_err();
        assert!(err.is_store_unavailable());

        let calls = f.backend.total_calls();
        assert_eq!(f.courses.get_course(5).unwrap(), cached);
        assert_eq!(f.backend.total_calls(), calls);
    }

    #[test]
    fn test_modify_missing_course_is_not_found() {
        let f = fixture();
        let err = f.courses.modify_course(&Course::new(77, 10, 300, "Ghost", 3)).unwrap_err();
        assert_eq!(
            err,
            RegistrarError::EntityNotFound { kind: EntityKind::Course, key: "77".into() }
        );
        assert!(!f.courses.has_course_cached(77));
    }

    #[test]
    fn test_modify_uncached_course_does_not_cache() {
        let f = fixture();
        f.backend.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        f.courses.modify_course(&Course::new(5, 10, 101, "Intro II", 4)).unwrap();
        assert!(!f.courses.has_course_cached(5));
        assert_eq!(f.courses.get_course(5).unwrap().title, "Intro II");
    }

    #[test]
    fn test_add_course_in_department_created_elsewhere() {
        let f = fixture();
        f.backend.add_department(&Department::new(11, 1, "EE", "Electrical")).unwrap();
        f.courses.add_course(&Course::new(6, 11, 201, "Circuits", 4)).unwrap();
        assert!(f.courses.has_course_cached(6));
    }

    #[test]
    fn test_course_listing_returns_new_course_once() {
        let f = fixture();
        f.courses.add_course(&Course::new(1, 10, 101, "Intro", 4)).unwrap();
        f.backend.add_course(&Course::new(2, 10, 201, "Data Structures", 4)).unwrap();

        let before = f.courses.get_courses(10).unwrap();
        assert_eq!(before.len(), 2);

        f.courses.add_course(&Course::new(3, 10, 150, "Discrete Math", 3)).unwrap();
        let after = f.courses.get_courses(10).unwrap();
        let numbers: Vec<u16> = after.iter().map(|c| c.number).collect();
        assert_eq!(numbers, [101, 150, 201]);
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn test_add_section_checks_every_parent() {
        let f = fixture();
        let section = Section::new(100, 5, "001", "2026FA", 5, "101", 30);
        let err = f.courses.add_section(&section).unwrap_err();
        assert_eq!(err, RegistrarError::EntityNotFound { kind: EntityKind::Course, key: "5".into() });

        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        let err = f
            .courses
            .add_section(&Section::new(100, 5, "001", "2026FA", 9, "101", 30))
            .unwrap_err();
        assert_eq!(err, RegistrarError::EntityNotFound { kind: EntityKind::Building, key: "9".into() });

        let err = f
            .courses
            .add_section(&section.clone().with_instructor("f1"))
            .unwrap_err();
        assert_eq!(err, RegistrarError::EntityNotFound { kind: EntityKind::User, key: "f1".into() });
        assert_eq!(f.backend.calls("add_section"), 0);

        f.users
            .add_user(&User::new("f1", "Grace", "Hopper", "f1@uni.edu", Role::Faculty))
            .unwrap();
        let section = section.with_instructor("f1").with_meetings(vec![monday_nine()]);
        f.courses.add_section(&section).unwrap();
        assert!(f.courses.has_section_cached(100));
        assert_eq!(f.courses.get_section(100).unwrap(), section);
        assert_eq!(f.backend.calls("get_section"), 0);
    }

    #[test]
    fn test_add_section_partial_write_surfaces_and_skips_cache() {
        let f = fixture();
        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        f.backend.fail_op("set_section_meetings", StoreError::backend("lock timeout"));

        let section = Section::new(100, 5, "001", "2026FA", 5, "101", 30)
            .with_meetings(vec![monday_nine()]);
        let err = f.courses.add_section(&section).unwrap_err();
        assert_eq!(err, RegistrarError::Store(StoreError::backend("lock timeout")));
        assert!(!f.courses.has_section_cached(100));

        // The row itself did commit.
        assert!(f.backend.does_section_exist(100).unwrap());
        let err = f.courses.add_section(&section).unwrap_err();
        assert_eq!(err, RegistrarError::DuplicateEntity { kind: EntityKind::Section, key: "100".into() });
    }

    #[test]
    fn test_modify_section_replaces_meetings_and_patches() {
        let f = fixture();
        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        let section = Section::new(100, 5, "001", "2026FA", 5, "101", 30);
        f.courses.add_section(&section).unwrap();

        let moved = section.clone().with_meetings(vec![monday_nine()]);
        f.courses.modify_section(&moved).unwrap();
        assert_eq!(f.courses.get_section(100).unwrap().meetings.len(), 1);
        assert_eq!(f.backend.get_section(100).unwrap().unwrap(), moved);
    }

    #[test]
    fn test_sections_for_instructor() {
        let f = fixture();
        f.users
            .add_user(&User::new("f1", "Grace", "Hopper", "f1@uni.edu", Role::Faculty))
            .unwrap();
        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        f.courses
            .add_section(&Section::new(101, 5, "002", "2026FA", 5, "101", 30).with_instructor("f1"))
            .unwrap();
        f.courses
            .add_section(&Section::new(100, 5, "001", "2026FA", 5, "101", 30).with_instructor("f1"))
            .unwrap();
        f.courses
            .add_section(&Section::new(102, 5, "003", "2026FA", 5, "101", 30))
            .unwrap();

        let taught = f.courses.get_sections_for_instructor("f1").unwrap();
        let numbers: Vec<&str> = taught.iter().map(|s| s.number.as_str()).collect();
        assert_eq!(numbers, ["001", "002"]);
        assert_eq!(f.courses.get_sections(5).unwrap().len(), 3);
    }

    #[test]
    fn test_failed_section_row_write_skips_meetings_and_cache() {
        let f = fixture();
        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        f.backend.fail_op("modify_section", StoreError::unavailable("connection reset"));

        let section = Section::new(100, 5, "001", "2026FA", 5, "101", 30);
        f.courses.add_section(&section).unwrap();
        let err = f
            .courses
            .modify_section(&section.clone().with_meetings(vec![monday_nine()]))
            .unwrap_err();
        assert!(err.is_store_unavailable());
        assert_eq!(f.backend.calls("set_section_meetings"), 1);
        assert_eq!(f.courses.get_section(100).unwrap(), section);
    }

    #[test]
    fn test_concurrent_course_writes_leave_cache_matching_store() {
        let f = fixture();
        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        let barrier = Barrier::new(4);

        thread::scope(|s| {
            for writer in 0..2u8 {
                let (f, barrier) = (&f, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    for round in 0..200u8 {
                        let mut course = Course::new(5, 10, 101, "Intro", 4);
                        course.credits = writer * 10 + round % 5;
                        f.courses.modify_course(&course).unwrap();
                    }
                });
            }
            for _ in 0..2 {
                let (f, barrier) = (&f, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    for _ in 0..200 {
                        f.courses.get_course(5).unwrap();
                        assert_eq!(f.courses.get_courses(10).unwrap().len(), 1);
                    }
                });
            }
        });

        assert!(f.courses.has_course_cached(5));
        let stored = f.backend.get_course(5).unwrap().unwrap();
        assert_eq!(f.courses.get_course(5).unwrap(), stored);
    }

    #[test]
    fn test_concurrent_section_writes_leave_cache_matching_store() {
        let f = fixture();
        f.courses.add_course(&Course::new(5, 10, 101, "Intro", 4)).unwrap();
        let base = Section::new(100, 5, "001", "2026FA", 5, "101", 30);
        f.courses.add_section(&base).unwrap();

        let friday_two = Meeting::new(
            Weekday::Fri,
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 15, 0).unwrap(),
        );
        let variants = [
            Section::new(100, 5, "001", "2026FA", 5, "101", 30).with_meetings(vec![monday_nine()]),
            Section::new(100, 5, "001", "2026FA", 5, "220", 45)
                .with_meetings(vec![friday_two, monday_nine()]),
        ];
        let barrier = Barrier::new(4);

        thread::scope(|s| {
            for variant in &variants {
                let (f, barrier) = (&f, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    for _ in 0..200 {
                        f.courses.modify_section(variant).unwrap();
                    }
                });
            }
            for _ in 0..2 {
                let (f, barrier, variants, base) = (&f, &barrier, &variants, &base);
                s.spawn(move || {
                    barrier.wait();
                    for _ in 0..200 {
                        let section = f.courses.get_section(100).unwrap();
                        assert!(variants.contains(&section) || section == *base);
                        f.courses.get_sections(5).unwrap();
                    }
                });
            }
        });

        let stored = f.backend.get_section(100).unwrap().unwrap();
        assert!(variants.contains(&stored));
        assert_eq!(f.courses.get_section(100).unwrap(), stored);
    }
}
