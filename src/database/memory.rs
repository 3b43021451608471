//! In-process store backend.
//!
//! Tables are `DashMap`s keyed by natural key. Integrity rules mirror the
//! relational schema: unique codes, and no rows pointing at missing parents.
//! Every call is counted per operation, and failures can be injected per
//! operation, which is what the manager tests lean on.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::models::{Building, Course, Department, Major, Meeting, Role, School, Section, User};
use super::store::{Store, StoreError, StoreResult};

/// In-memory store. Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    schools: DashMap<u32, School>,
    departments: DashMap<u32, Department>,
    majors: DashMap<u32, Major>,
    buildings: DashMap<u32, Building>,
    courses: DashMap<u32, Course>,
    sections: DashMap<u32, Section>,
    meetings: DashMap<u32, Vec<Meeting>>,
    users: DashMap<String, User>,

    calls: DashMap<&'static str, AtomicU64>,
    failures: DashMap<&'static str, StoreError>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `op` has been called.
    pub fn calls(&self, op: &str) -> u64 {
        self.inner
            .calls
            .get(op)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Total calls across every operation.
    pub fn total_calls(&self) -> u64 {
        self.inner
            .calls
            .iter()
            .map(|c| c.value().load(Ordering::Relaxed))
            .sum()
    }

    /// Make every later call to `op` fail with `error`.
    pub fn fail_op(&self, op: &'static str, error: StoreError) {
        self.inner.failures.insert(op, error);
    }

    /// Remove all injected failures and bring the store back online.
    pub fn clear_failures(&self) {
        self.inner.failures.clear();
        self.inner.offline.store(false, Ordering::SeqCst);
    }

    /// Simulate a lost connection: every call fails as unavailable.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn enter(&self, op: &'static str) -> StoreResult<()> {
        self.inner
            .calls
            .entry(op)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);

        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store offline"));
        }
        if let Some(error) = self.inner.failures.get(op) {
            debug!("Injected failure for {}: {}", op, error.value());
            return Err(error.value().clone());
        }
        Ok(())
    }

    fn section_with_meetings(&self, mut section: Section) -> Section {
        section.meetings = self
            .inner
            .meetings
            .get(&section.id)
            .map(|m| m.value().clone())
            .unwrap_or_default();
        section
    }
}

fn insert_new<K, V>(table: &DashMap<K, V>, key: K, value: &V) -> bool
where
    K: Eq + Hash,
    V: Clone,
{
    match table.entry(key) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(value.clone());
            true
        }
    }
}

fn replace_existing<K, V>(table: &DashMap<K, V>, key: &K, value: &V) -> bool
where
    K: Eq + Hash,
    V: Clone,
{
    match table.get_mut(key) {
        Some(mut row) => {
            *row = value.clone();
            true
        }
        None => false,
    }
}

fn select<K, V>(table: &DashMap<K, V>, pred: impl Fn(&V) -> bool) -> Vec<V>
where
    K: Eq + Hash,
    V: Clone,
{
    table
        .iter()
        .filter(|row| pred(row.value()))
        .map(|row| row.value().clone())
        .collect()
}

/// Fails if another row (different key) already matches `clash`.
fn ensure_unique<K, V>(
    table: &DashMap<K, V>,
    key: &K,
    what: &str,
    clash: impl Fn(&V) -> bool,
) -> StoreResult<()>
where
    K: Eq + Hash,
{
    if table.iter().any(|row| row.key() != key && clash(row.value())) {
        return Err(StoreError::constraint(format!("duplicate {what}")));
    }
    Ok(())
}

fn ensure_parent<K, V>(table: &DashMap<K, V>, key: &K, what: &str) -> StoreResult<()>
where
    K: Eq + Hash,
{
    if table.contains_key(key) {
        Ok(())
    } else {
        Err(StoreError::constraint(format!("missing {what}")))
    }
}

impl Store for MemoryStore {
    fn does_school_exist(&self, id: u32) -> StoreResult<bool> {
        self.enter("does_school_exist")?;
        Ok(self.inner.schools.contains_key(&id))
    }

    fn get_school(&self, id: u32) -> StoreResult<Option<School>> {
        self.enter("get_school")?;
        Ok(self.inner.schools.get(&id).map(|r| r.value().clone()))
    }

    fn get_schools(&self) -> StoreResult<Vec<School>> {
        self.enter("get_schools")?;
        Ok(select(&self.inner.schools, |_| true))
    }

    fn add_school(&self, school: &School) -> StoreResult<bool> {
        self.enter("add_school")?;
        Ok(insert_new(&self.inner.schools, school.id, school))
    }

    fn modify_school(&self, school: &School) -> StoreResult<bool> {
        self.enter("modify_school")?;
        Ok(replace_existing(&self.inner.schools, &school.id, school))
    }

    fn does_department_exist(&self, id: u32) -> StoreResult<bool> {
        self.enter("does_department_exist")?;
        Ok(self.inner.departments.contains_key(&id))
    }

    fn get_department(&self, id: u32) -> StoreResult<Option<Department>> {
        self.enter("get_department")?;
        Ok(self.inner.departments.get(&id).map(|r| r.value().clone()))
    }

    fn get_departments_by_school(&self, school_id: u32) -> StoreResult<Vec<Department>> {
        self.enter("get_departments_by_school")?;
        Ok(select(&self.inner.departments, |d| d.school_id == school_id))
    }

    fn add_department(&self, department: &Department) -> StoreResult<bool> {
        self.enter("add_department")?;
        ensure_parent(&self.inner.schools, &department.school_id, "school")?;
        ensure_unique(&self.inner.departments, &department.id, "department code", |d| {
            d.code == department.code
        })?;
        Ok(insert_new(&self.inner.departments, department.id, department))
    }

    fn modify_department(&self, department: &Department) -> StoreResult<bool> {
        self.enter("modify_department")?;
        ensure_parent(&self.inner.schools, &department.school_id, "school")?;
        ensure_unique(&self.inner.departments, &department.id, "department code", |d| {
            d.code == department.code
        })?;
        Ok(replace_existing(&self.inner.departments, &department.id, department))
    }

    fn does_major_exist(&self, id: u32) -> StoreResult<bool> {
        self.enter("does_major_exist")?;
        Ok(self.inner.majors.contains_key(&id))
    }

    fn get_major(&self, id: u32) -> StoreResult<Option<Major>> {
        self.enter("get_major")?;
        Ok(self.inner.majors.get(&id).map(|r| r.value().clone()))
    }

    fn get_majors_by_department(&self, department_id: u32) -> StoreResult<Vec<Major>> {
        self.enter("get_majors_by_department")?;
        Ok(select(&self.inner.majors, |m| m.department_id == department_id))
    }

    fn add_major(&self, major: &Major) -> StoreResult<bool> {
        self.enter("add_major")?;
        ensure_parent(&self.inner.departments, &major.department_id, "department")?;
        Ok(insert_new(&self.inner.majors, major.id, major))
    }

    fn modify_major(&self, major: &Major) -> StoreResult<bool> {
        self.enter("modify_major")?;
        ensure_parent(&self.inner.departments, &major.department_id, "department")?;
        Ok(replace_existing(&self.inner.majors, &major.id, major))
    }

    fn does_building_exist(&self, id: u32) -> StoreResult<bool> {
        self.enter("does_building_exist")?;
        Ok(self.inner.buildings.contains_key(&id))
    }

    fn get_building(&self, id: u32) -> StoreResult<Option<Building>> {
        self.enter("get_building")?;
        Ok(self.inner.buildings.get(&id).map(|r| r.value().clone()))
    }

    fn get_buildings(&self) -> StoreResult<Vec<Building>> {
        self.enter("get_buildings")?;
        Ok(select(&self.inner.buildings, |_| true))
    }

    fn add_building(&self, building: &Building) -> StoreResult<bool> {
        self.enter("add_building")?;
        ensure_unique(&self.inner.buildings, &building.id, "building code", |b| {
            b.code == building.code
        })?;
        Ok(insert_new(&self.inner.buildings, building.id, building))
    }

    fn modify_building(&self, building: &Building) -> StoreResult<bool> {
        self.enter("modify_building")?;
        ensure_unique(&self.inner.buildings, &building.id, "building code", |b| {
            b.code == building.code
        })?;
        Ok(replace_existing(&self.inner.buildings, &building.id, building))
    }

    fn does_course_exist(&self, id: u32) -> StoreResult<bool> {
        self.enter("does_course_exist")?;
        Ok(self.inner.courses.contains_key(&id))
    }

    fn get_course(&self, id: u32) -> StoreResult<Option<Course>> {
        self.enter("get_course")?;
        Ok(self.inner.courses.get(&id).map(|r| r.value().clone()))
    }

    fn get_courses_by_department(&self, department_id: u32) -> StoreResult<Vec<Course>> {
        self.enter("get_courses_by_department")?;
        Ok(select(&self.inner.courses, |c| c.department_id == department_id))
    }

    fn add_course(&self, course: &Course) -> StoreResult<bool> {
        self.enter("add_course")?;
        ensure_parent(&self.inner.departments, &course.department_id, "department")?;
        ensure_unique(&self.inner.courses, &course.id, "course number", |c| {
            c.department_id == course.department_id && c.number == course.number
        })?;
        Ok(insert_new(&self.inner.courses, course.id, course))
    }

    fn modify_course(&self, course: &Course) -> StoreResult<bool> {
        self.enter("modify_course")?;
        ensure_parent(&self.inner.departments, &course.department_id, "department")?;
        ensure_unique(&self.inner.courses, &course.id, "course number", |c| {
            c.department_id == course.department_id && c.number == course.number
        })?;
        Ok(replace_existing(&self.inner.courses, &course.id, course))
    }

    fn does_section_exist(&self, id: u32) -> StoreResult<bool> {
        self.enter("does_section_exist")?;
        Ok(self.inner.sections.contains_key(&id))
    }

    fn get_section(&self, id: u32) -> StoreResult<Option<Section>> {
        self.enter("get_section")?;
        let row = self.inner.sections.get(&id).map(|r| r.value().clone());
        Ok(row.map(|s| self.section_with_meetings(s)))
    }

    fn get_sections_by_course(&self, course_id: u32) -> StoreResult<Vec<Section>> {
        self.enter("get_sections_by_course")?;
        let rows = select(&self.inner.sections, |s| s.course_id == course_id);
        Ok(rows.into_iter().map(|s| self.section_with_meetings(s)).collect())
    }

    fn get_sections_by_instructor(&self, instructor_id: &str) -> StoreResult<Vec<Section>> {
        self.enter("get_sections_by_instructor")?;
        let rows = select(&self.inner.sections, |s| {
            s.instructor_id.as_deref() == Some(instructor_id)
        });
        Ok(rows.into_iter().map(|s| self.section_with_meetings(s)).collect())
    }

    fn add_section(&self, section: &Section) -> StoreResult<bool> {
        self.enter("add_section")?;
        self.check_section(section)?;
        let row = Section {
            meetings: Vec::new(),
            ..section.clone()
        };
        Ok(insert_new(&self.inner.sections, section.id, &row))
    }

    fn modify_section(&self, section: &Section) -> StoreResult<bool> {
        self.enter("modify_section")?;
        self.check_section(section)?;
        let row = Section {
            meetings: Vec::new(),
            ..section.clone()
        };
        Ok(replace_existing(&self.inner.sections, &section.id, &row))
    }

    fn set_section_meetings(&self, section_id: u32, meetings: &[Meeting]) -> StoreResult<bool> {
        self.enter("set_section_meetings")?;
        if !self.inner.sections.contains_key(&section_id) {
            return Ok(false);
        }
        self.inner.meetings.insert(section_id, meetings.to_vec());
        Ok(true)
    }

    fn does_user_exist(&self, university_id: &str) -> StoreResult<bool> {
        self.enter("does_user_exist")?;
        Ok(self.inner.users.contains_key(university_id))
    }

    fn get_user(&self, university_id: &str) -> StoreResult<Option<User>> {
        self.enter("get_user")?;
        Ok(self.inner.users.get(university_id).map(|r| r.value().clone()))
    }

    fn get_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        self.enter("get_users_by_role")?;
        Ok(select(&self.inner.users, |u| u.role == role))
    }

    fn add_user(&self, user: &User) -> StoreResult<bool> {
        self.enter("add_user")?;
        self.check_user(user)?;
        Ok(insert_new(&self.inner.users, user.university_id.clone(), user))
    }

    fn modify_user(&self, user: &User) -> StoreResult<bool> {
        self.enter("modify_user")?;
        self.check_user(user)?;
        Ok(replace_existing(&self.inner.users, &user.university_id, user))
    }
}

impl MemoryStore {
    fn check_section(&self, section: &Section) -> StoreResult<()> {
        ensure_parent(&self.inner.courses, &section.course_id, "course")?;
        ensure_parent(&self.inner.buildings, &section.building_id, "building")?;
        if let Some(instructor) = &section.instructor_id {
            ensure_parent(&self.inner.users, instructor, "instructor")?;
        }
        ensure_unique(&self.inner.sections, &section.id, "section number", |s| {
            s.course_id == section.course_id
                && s.term == section.term
                && s.number == section.number
        })
    }

    fn check_user(&self, user: &User) -> StoreResult<()> {
        if let Some(major_id) = &user.major_id {
            ensure_parent(&self.inner.majors, major_id, "major")?;
        }
        ensure_unique(&self.inner.users, &user.university_id, "email", |u| {
            u.email.eq_ignore_ascii_case(&user.email)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_school(&School::new(1, "Engineering")).unwrap();
        store
            .add_department(&Department::new(10, 1, "CS", "Computer Science"))
            .unwrap();
        store
    }

    #[test]
    fn test_add_existing_key_reports_false() {
        let store = seeded();
        assert!(!store.add_school(&School::new(1, "Other")).unwrap());
        assert_eq!(store.get_school(1).unwrap().unwrap().name, "Engineering");
    }

    #[test]
    fn test_modify_missing_row_reports_false() {
        let store = seeded();
        assert!(!store.modify_school(&School::new(9, "Nope")).unwrap());
    }

    #[test]
    fn test_dangling_parent_is_constraint_error() {
        let store = seeded();
        let err = store
            .add_department(&Department::new(11, 42, "EE", "Electrical"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
    }

    #[test]
    fn test_duplicate_code_is_constraint_error() {
        let store = seeded();
        let err = store
            .add_department(&Department::new(11, 1, "CS", "Computing"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
        // Same code on the same row is fine.
        assert!(store
            .modify_department(&Department::new(10, 1, "CS", "Computing"))
            .unwrap());
    }

    #[test]
    fn test_section_meetings_stored_separately() {
        use chrono::{NaiveTime, Weekday};

        let store = seeded();
        store.add_building(&Building::new(5, "ENG", "Engineering Hall")).unwrap();
        store.add_course(&Course::new(100, 10, 101, "Intro", 4)).unwrap();

        let meeting = Meeting::new(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 50, 0).unwrap(),
        );
        let section = Section::new(1000, 100, "001", "2026FA", 5, "101", 30)
            .with_meetings(vec![meeting.clone()]);

        assert!(store.add_section(&section).unwrap());
        assert!(store.get_section(1000).unwrap().unwrap().meetings.is_empty());

        assert!(store.set_section_meetings(1000, &[meeting]).unwrap());
        assert_eq!(store.get_section(1000).unwrap().unwrap(), section);
    }

    #[test]
    fn test_calls_and_injected_failures() {
        let store = seeded();
        store.get_school(1).unwrap();
        store.get_school(1).unwrap();
        assert_eq!(store.calls("get_school"), 2);

        store.fail_op("get_school", StoreError::backend("boom"));
        assert_eq!(store.get_school(1), Err(StoreError::backend("boom")));
        assert_eq!(store.calls("get_school"), 3);

        store.clear_failures();
        store.set_offline(true);
        assert!(store.get_schools().unwrap_err().is_unavailable());
        store.clear_failures();
        assert_eq!(store.get_schools().unwrap().len(), 1);
    }

    #[test]
    fn test_email_uniqueness_ignores_case() {
        let store = seeded();
        let ada = User::new("u1", "Ada", "Lovelace", "ada@uni.edu", Role::Student);
        assert!(store.add_user(&ada).unwrap());

        let clash = User::new("u2", "Ada", "Byron", "ADA@Uni.edu", Role::Student);
        let err = store.add_user(&clash).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));

        // The owner may change the case of their own address.
        let mut recased = ada.clone();
        recased.email = "Ada@uni.edu".into();
        assert!(store.modify_user(&recased).unwrap());
    }
}
