//! University structure: schools, departments, majors and buildings.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind};

/// A school (college) grouping several departments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: u32,
    pub name: String,
}

impl School {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Entity for School {
    type Key = u32;
    const KIND: EntityKind = EntityKind::School;

    fn key(&self) -> u32 {
        self.id
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then(self.id.cmp(&other.id))
    }
}

/// An academic department belonging to one school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: u32,
    pub school_id: u32,
    /// Short code used in course listings, e.g. `CS`.
    pub code: String,
    pub name: String,
}

impl Department {
    pub fn new(id: u32, school_id: u32, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            school_id,
            code: code.into(),
            name: name.into(),
        }
    }
}

impl Entity for Department {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Department;

    fn key(&self) -> u32 {
        self.id
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.code.cmp(&other.code).then(self.id.cmp(&other.id))
    }
}

/// Degree awarded by a major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Degree {
    Bachelor,
    Master,
    Doctorate,
}

/// A program of study offered by a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Major {
    pub id: u32,
    pub department_id: u32,
    pub name: String,
    pub degree: Degree,
}

impl Major {
    pub fn new(id: u32, department_id: u32, name: impl Into<String>, degree: Degree) -> Self {
        Self {
            id,
            department_id,
            name: name.into(),
            degree,
        }
    }
}

impl Entity for Major {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Major;

    fn key(&self) -> u32 {
        self.id
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then(self.id.cmp(&other.id))
    }
}

/// A campus building where sections meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub id: u32,
    /// Short code printed on schedules, e.g. `ENG`.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl Building {
    pub fn new(id: u32, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            address: None,
        }
    }
}

impl Entity for Building {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Building;

    fn key(&self) -> u32 {
        self.id
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.code.cmp(&other.code).then(self.id.cmp(&other.id))
    }
}
