//! University structure manager: schools, departments, majors, buildings.

use tracing::debug;

use crate::cache::{CacheCapacities, CacheRegistry};
use crate::database::{Building, Datastore, Department, Major, School};
use crate::error::{RegistrarError, Result};

use super::cache_aside::{
    confirm_exists, read_listing, read_through, require_parent, write_existing, write_new,
    EntityCache,
};

/// Manager for the university structure, with one cache per entity type.
pub struct UniversityManager {
    store: Datastore,
    schools: EntityCache<School>,
    departments: EntityCache<Department>,
    majors: EntityCache<Major>,
    buildings: EntityCache<Building>,
}

impl UniversityManager {
    pub fn new(store: Datastore, caches: &CacheRegistry, capacities: &CacheCapacities) -> Self {
        Self {
            store,
            schools: caches.get_or_create("university.schools", capacities.schools),
            departments: caches.get_or_create("university.departments", capacities.departments),
            majors: caches.get_or_create("university.majors", capacities.majors),
            buildings: caches.get_or_create("university.buildings", capacities.buildings),
        }
    }

    // --- Schools ---

    pub fn get_school(&self, id: u32) -> Result<School> {
        read_through(&self.schools, &self.store, &id, "get_school", |db| db.get_school(id))
    }

    pub fn get_schools(&self) -> Result<Vec<School>> {
        read_listing(&self.schools, &self.store, "get_schools", |_| true, |db| db.get_schools())
    }

    pub fn school_exists(&self, id: u32) -> Result<bool> {
        confirm_exists(&self.schools, &self.store, &id, "does_school_exist", |db| {
            db.does_school_exist(id)
        })
    }

    pub fn add_school(&self, school: &School) -> Result<()> {
        if self.school_exists(school.id)? {
            return Err(RegistrarError::duplicate::<School>(&school.id));
        }
        write_new(&self.schools, &self.store, school, "add_school", |db, s| db.add_school(s))
    }

    pub fn modify_school(&self, school: &School) -> Result<()> {
        write_existing(&self.schools, &self.store, school, "modify_school", |db, s| {
            db.modify_school(s)
        })
    }

    pub fn has_school_cached(&self, id: u32) -> bool {
        self.schools.contains(&id)
    }

    // --- Departments ---

    pub fn get_department(&self, id: u32) -> Result<Department> {
        read_through(&self.departments, &self.store, &id, "get_department", |db| {
            db.get_department(id)
        })
    }

    /// Departments of one school.
    pub fn get_departments(&self, school_id: u32) -> Result<Vec<Department>> {
        read_listing(
            &self.departments,
            &self.store,
            "get_departments_by_school",
            |d| d.school_id == school_id,
            |db| db.get_departments_by_school(school_id),
        )
    }

    pub fn department_exists(&self, id: u32) -> Result<bool> {
        confirm_exists(&self.departments, &self.store, &id, "does_department_exist", |db| {
            db.does_department_exist(id)
        })
    }

    pub fn add_department(&self, department: &Department) -> Result<()> {
        if self.department_exists(department.id)? {
            return Err(RegistrarError::duplicate::<Department>(&department.id));
        }
        require_parent::<School>(self.school_exists(department.school_id)?, &department.school_id)?;
        write_new(&self.departments, &self.store, department, "add_department", |db, d| {
            db.add_department(d)
        })
    }

    pub fn modify_department(&self, department: &Department) -> Result<()> {
        require_parent::<School>(self.school_exists(department.school_id)?, &department.school_id)?;
        write_existing(&self.departments, &self.store, department, "modify_department", |db, d| {
            db.modify_department(d)
        })
    }

    pub fn has_department_cached(&self, id: u32) -> bool {
        self.departments.contains(&id)
    }

    // --- Majors ---

    pub fn get_major(&self, id: u32) -> Result<Major> {
        read_through(&self.majors, &self.store, &id, "get_major", |db| db.get_major(id))
    }

    /// Majors offered by one department.
    pub fn get_majors(&self, department_id: u32) -> Result<Vec<Major>> {
        read_listing(
            &self.majors,
            &self.store,
            "get_majors_by_department",
            |m| m.department_id == department_id,
            |db| db.get_majors_by_department(department_id),
        )
    }

    pub fn major_exists(&self, id: u32) -> Result<bool> {
        confirm_exists(&self.majors, &self.store, &id, "does_major_exist", |db| {
            db.does_major_exist(id)
        })
    }

    pub fn add_major(&self, major: &Major) -> Result<()> {
        if self.major_exists(major.id)? {
            return Err(RegistrarError::duplicate::<Major>(&major.id));
        }
        require_parent::<Department>(
            self.department_exists(major.department_id)?,
            &major.department_id,
        )?;
        write_new(&self.majors, &self.store, major, "add_major", |db, m| db.add_major(m))
    }

    pub fn modify_major(&self, major: &Major) -> Result<()> {
        require_parent::<Department>(
            self.department_exists(major.department_id)?,
            &major.department_id,
        )?;
        write_existing(&self.majors, &self.store, major, "modify_major", |db, m| {
            db.modify_major(m)
        })
    }

    pub fn has_major_cached(&self, id: u32) -> bool {
        self.majors.contains(&id)
    }

    // --- Buildings ---

    pub fn get_building(&self, id: u32) -> Result<Building> {
        read_through(&self.buildings, &self.store, &id, "get_building", |db| {
            db.get_building(id)
        })
    }

    pub fn get_buildings(&self) -> Result<Vec<Building>> {
        read_listing(&self.buildings, &self.store, "get_buildings", |_| true, |db| {
            db.get_buildings()
        })
    }

    pub fn building_exists(&self, id: u32) -> Result<bool> {
        confirm_exists(&self.buildings, &self.store, &id, "does_building_exist", |db| {
            db.does_building_exist(id)
        })
    }

    pub fn add_building(&self, building: &Building) -> Result<()> {
        if self.building_exists(building.id)? {
            return Err(RegistrarError::duplicate::<Building>(&building.id));
        }
        write_new(&self.buildings, &self.store, building, "add_building", |db, b| {
            db.add_building(b)
        })
    }

    pub fn modify_building(&self, building: &Building) -> Result<()> {
        write_existing(&self.buildings, &self.store, building, "modify_building", |db, b| {
            db.modify_building(b)
        })
    }

    pub fn has_building_cached(&self, id: u32) -> bool {
        self.buildings.contains(&id)
    }

    /// Load every school, its departments, and all buildings into cache.
    ///
    /// Returns the number of entities seen.
    pub fn warm(&self) -> Result<usize> {
        let schools = self.get_schools()?;
        let mut seen = schools.len();
        for school in &schools {
            seen += self.get_departments(school.id)?.len();
        }
        seen += self.get_buildings()?.len();
        debug!("Warmed university caches with {} entities", seen);
        Ok(seen)
    }
}
