//! MongoDB store backend.
//!
//! Uses the blocking driver: every store call is already made from a request
//! worker thread while the datastore lock is held, so there is nothing to
//! await. One collection per entity, keyed on an `id` (or `university_id`)
//! field with a unique index. Parent references are checked before writes.

use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{Collation, CollationStrength, IndexOptions};
use mongodb::sync::{Client, Collection};
use mongodb::IndexModel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::models::{Building, Course, Department, Major, Meeting, Role, School, Section, User};
use super::store::{Store, StoreError, StoreResult};

const DUPLICATE_KEY: i32 = 11000;

/// Meeting rows of one section, kept in their own collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SectionMeetings {
    section_id: u32,
    meetings: Vec<Meeting>,
}

/// Store backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    schools: Collection<School>,
    departments: Collection<Department>,
    majors: Collection<Major>,
    buildings: Collection<Building>,
    courses: Collection<Course>,
    sections: Collection<Section>,
    meetings: Collection<SectionMeetings>,
    users: Collection<User>,
}

impl From<MongoError> for StoreError {
    fn from(err: MongoError) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
                StoreError::constraint(write.message.clone())
            }
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => StoreError::unavailable(err.to_string()),
            _ => StoreError::backend(err.to_string()),
        }
    }
}

fn id_filter(id: u32) -> Document {
    doc! { "id": i64::from(id) }
}

fn user_filter(university_id: &str) -> Document {
    doc! { "university_id": university_id }
}

impl MongoStore {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// Pings the server and makes sure the key and uniqueness indexes exist.
    ///
    /// # Errors
    /// Returns error if connection or index creation fails.
    pub fn connect(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri)?;

        // Ping the database to verify connection
        client.database("admin").run_command(doc! { "ping": 1 }).run()?;
        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);
        let store = Self {
            schools: db.collection("schools"),
            departments: db.collection("departments"),
            majors: db.collection("majors"),
            buildings: db.collection("buildings"),
            courses: db.collection("courses"),
            sections: db.collection("sections"),
            meetings: db.collection("section_meetings"),
            users: db.collection("users"),
        };
        store.ensure_indexes()?;
        Ok(store)
    }

    fn ensure_indexes(&self) -> StoreResult<()> {
        let id = doc! { "id": 1 };
        unique_index(&self.schools, id.clone())?;
        unique_index(&self.departments, id.clone())?;
        unique_index(&self.departments, doc! { "code": 1 })?;
        unique_index(&self.majors, id.clone())?;
        unique_index(&self.buildings, id.clone())?;
        unique_index(&self.buildings, doc! { "code": 1 })?;
        unique_index(&self.courses, id.clone())?;
        unique_index(&self.courses, doc! { "department_id": 1, "number": 1 })?;
        unique_index(&self.sections, id)?;
        unique_index(&self.sections, doc! { "course_id": 1, "term": 1, "number": 1 })?;
        unique_index(&self.meetings, doc! { "section_id": 1 })?;
        unique_index(&self.users, doc! { "university_id": 1 })?;
        unique_index_ignoring_case(&self.users, doc! { "email": 1 })?;
        debug!("MongoDB indexes ensured");
        Ok(())
    }

    fn require(&self, exists: bool, what: &str) -> StoreResult<()> {
        if exists {
            Ok(())
        } else {
            Err(StoreError::constraint(format!("missing {what}")))
        }
    }

    fn attach_meetings(&self, mut section: Section) -> StoreResult<Section> {
        let filter = doc! { "section_id": i64::from(section.id) };
        section.meetings = self
            .meetings
            .find_one(filter)
            .run()?
            .map(|m| m.meetings)
            .unwrap_or_default();
        Ok(section)
    }

    fn check_section(&self, section: &Section) -> StoreResult<()> {
        self.require(exists(&self.courses, id_filter(section.course_id))?, "course")?;
        self.require(exists(&self.buildings, id_filter(section.building_id))?, "building")?;
        if let Some(instructor) = &section.instructor_id {
            self.require(exists(&self.users, user_filter(instructor))?, "instructor")?;
        }
        Ok(())
    }

    fn check_user(&self, user: &User) -> StoreResult<()> {
        if let Some(major_id) = user.major_id {
            self.require(exists(&self.majors, id_filter(major_id))?, "major")?;
        }
        Ok(())
    }
}

fn unique_index<T>(coll: &Collection<T>, keys: Document) -> StoreResult<()>
where
    T: Send + Sync,
{
    let model = IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build();
    coll.create_index(model).run()?;
    Ok(())
}

/// Unique index compared case-insensitively (collation strength 2).
fn unique_index_ignoring_case<T>(coll: &Collection<T>, keys: Document) -> StoreResult<()>
where
    T: Send + Sync,
{
    let collation = Collation::builder()
        .locale("en".to_string())
        .strength(CollationStrength::Secondary)
        .build();
    let model = IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .collation(collation)
                .build(),
        )
        .build();
    coll.create_index(model).run()?;
    Ok(())
}

fn exists<T>(coll: &Collection<T>, filter: Document) -> StoreResult<bool>
where
    T: Send + Sync,
{
    Ok(coll.count_documents(filter).limit(1).run()? > 0)
}

fn find_one<T>(coll: &Collection<T>, filter: Document) -> StoreResult<Option<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    Ok(coll.find_one(filter).run()?)
}

fn find_many<T>(coll: &Collection<T>, filter: Document) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let cursor = coll.find(filter).run()?;
    let mut rows = Vec::new();
    for row in cursor {
        rows.push(row?);
    }
    Ok(rows)
}

/// Insert unless a row with the same key exists.
fn insert<T>(coll: &Collection<T>, key: Document, value: &T) -> StoreResult<bool>
where
    T: Serialize + Send + Sync,
{
    if exists(coll, key)? {
        return Ok(false);
    }
    coll.insert_one(value).run()?;
    Ok(true)
}

/// Replace the row matching `key`, if any.
fn replace<T>(coll: &Collection<T>, key: Document, value: &T) -> StoreResult<bool>
where
    T: Serialize + Send + Sync,
{
    let result = coll.replace_one(key, value).run()?;
    Ok(result.matched_count > 0)
}

impl Store for MongoStore {
    fn does_school_exist(&self, id: u32) -> StoreResult<bool> {
        exists(&self.schools, id_filter(id))
    }

    fn get_school(&self, id: u32) -> StoreResult<Option<School>> {
        find_one(&self.schools, id_filter(id))
    }

    fn get_schools(&self) -> StoreResult<Vec<School>> {
        find_many(&self.schools, doc! {})
    }

    fn add_school(&self, school: &School) -> StoreResult<bool> {
        insert(&self.schools, id_filter(school.id), school)
    }

    fn modify_school(&self, school: &School) -> StoreResult<bool> {
        replace(&self.schools, id_filter(school.id), school)
    }

    fn does_department_exist(&self, id: u32) -> StoreResult<bool> {
        exists(&self.departments, id_filter(id))
    }

    fn get_department(&self, id: u32) -> StoreResult<Option<Department>> {
        find_one(&self.departments, id_filter(id))
    }

    fn get_departments_by_school(&self, school_id: u32) -> StoreResult<Vec<Department>> {
        find_many(&self.departments, doc! { "school_id": i64::from(school_id) })
    }

    fn add_department(&self, department: &Department) -> StoreResult<bool> {
        self.require(exists(&self.schools, id_filter(department.school_id))?, "school")?;
        insert(&self.departments, id_filter(department.id), department)
    }

    fn modify_department(&self, department: &Department) -> StoreResult<bool> {
        self.require(exists(&self.schools, id_filter(department.school_id))?, "school")?;
        replace(&self.departments, id_filter(department.id), department)
    }

    fn does_major_exist(&self, id: u32) -> StoreResult<bool> {
        exists(&self.majors, id_filter(id))
    }

    fn get_major(&self, id: u32) -> StoreResult<Option<Major>> {
        find_one(&self.majors, id_filter(id))
    }

    fn get_majors_by_department(&self, department_id: u32) -> StoreResult<Vec<Major>> {
        find_many(&self.majors, doc! { "department_id": i64::from(department_id) })
    }

    fn add_major(&self, major: &Major) -> StoreResult<bool> {
        self.require(exists(&self.departments, id_filter(major.department_id))?, "department")?;
        insert(&self.majors, id_filter(major.id), major)
    }

    fn modify_major(&self, major: &Major) -> StoreResult<bool> {
        self.require(exists(&self.departments, id_filter(major.department_id))?, "department")?;
        replace(&self.majors, id_filter(major.id), major)
    }

    fn does_building_exist(&self, id: u32) -> StoreResult<bool> {
        exists(&self.buildings, id_filter(id))
    }

    fn get_building(&self, id: u32) -> StoreResult<Option<Building>> {
        find_one(&self.buildings, id_filter(id))
    }

    fn get_buildings(&self) -> StoreResult<Vec<Building>> {
        find_many(&self.buildings, doc! {})
    }

    fn add_building(&self, building: &Building) -> StoreResult<bool> {
        insert(&self.buildings, id_filter(building.id), building)
    }

    fn modify_building(&self, building: &Building) -> StoreResult<bool> {
        replace(&self.buildings, id_filter(building.id), building)
    }

    fn does_course_exist(&self, id: u32) -> StoreResult<bool> {
        exists(&self.courses, id_filter(id))
    }

    fn get_course(&self, id: u32) -> StoreResult<Option<Course>> {
        find_one(&self.courses, id_filter(id))
    }

    fn get_courses_by_department(&self, department_id: u32) -> StoreResult<Vec<Course>> {
        find_many(&self.courses, doc! { "department_id": i64::from(department_id) })
    }

    fn add_course(&self, course: &Course) -> StoreResult<bool> {
        self.require(exists(&self.departments, id_filter(course.department_id))?, "department")?;
        insert(&self.courses, id_filter(course.id), course)
    }

    fn modify_course(&self, course: &Course) -> StoreResult<bool> {
        self.require(exists(&self.departments, id_filter(course.department_id))?, "department")?;
        replace(&self.courses, id_filter(course.id), course)
    }

    fn does_section_exist(&self, id: u32) -> StoreResult<bool> {
        exists(&self.sections, id_filter(id))
    }

    fn get_section(&self, id: u32) -> StoreResult<Option<Section>> {
        find_one(&self.sections, id_filter(id))?
            .map(|s| self.attach_meetings(s))
            .transpose()
    }

    fn get_sections_by_course(&self, course_id: u32) -> StoreResult<Vec<Section>> {
        find_many(&self.sections, doc! { "course_id": i64::from(course_id) })?
            .into_iter()
            .map(|s| self.attach_meetings(s))
            .collect()
    }

    fn get_sections_by_instructor(&self, instructor_id: &str) -> StoreResult<Vec<Section>> {
        find_many(&self.sections, doc! { "instructor_id": instructor_id })?
            .into_iter()
            .map(|s| self.attach_meetings(s))
            .collect()
    }

    fn add_section(&self, section: &Section) -> StoreResult<bool> {
        self.check_section(section)?;
        let row = Section {
            meetings: Vec::new(),
            ..section.clone()
        };
        insert(&self.sections, id_filter(section.id), &row)
    }

    fn modify_section(&self, section: &Section) -> StoreResult<bool> {
        self.check_section(section)?;
        let row = Section {
            meetings: Vec::new(),
            ..section.clone()
        };
        replace(&self.sections, id_filter(section.id), &row)
    }

    fn set_section_meetings(&self, section_id: u32, meetings: &[Meeting]) -> StoreResult<bool> {
        if !exists(&self.sections, id_filter(section_id))? {
            return Ok(false);
        }
        let row = SectionMeetings {
            section_id,
            meetings: meetings.to_vec(),
        };
        self.meetings
            .replace_one(doc! { "section_id": i64::from(section_id) }, &row)
            .upsert(true)
            .run()?;
        Ok(true)
    }

    fn does_user_exist(&self, university_id: &str) -> StoreResult<bool> {
        exists(&self.users, user_filter(university_id))
    }

    fn get_user(&self, university_id: &str) -> StoreResult<Option<User>> {
        find_one(&self.users, user_filter(university_id))
    }

    fn get_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let role = mongodb::bson::to_bson(&role).map_err(|e| StoreError::backend(e.to_string()))?;
        find_many(&self.users, doc! { "role": role })
    }

    fn add_user(&self, user: &User) -> StoreResult<bool> {
        self.check_user(user)?;
        insert(&self.users, user_filter(&user.university_id), user)
    }

    fn modify_user(&self, user: &User) -> StoreResult<bool> {
        self.check_user(user)?;
        replace(&self.users, user_filter(&user.university_id), user)
    }
}
