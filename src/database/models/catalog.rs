//! Course catalog: courses and their per-term sections.

use std::cmp::Ordering;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind};

/// A catalog course, independent of any term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: u32,
    pub department_id: u32,
    /// Catalog number within the department, e.g. `101`.
    pub number: u16,
    pub title: String,
    pub credits: u8,
    #[serde(default)]
    pub description: String,
}

impl Course {
    pub fn new(
        id: u32,
        department_id: u32,
        number: u16,
        title: impl Into<String>,
        credits: u8,
    ) -> Self {
        Self {
            id,
            department_id,
            number,
            title: title.into(),
            credits,
            description: String::new(),
        }
    }
}

impl Entity for Course {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Course;

    fn key(&self) -> u32 {
        self.id
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        (self.department_id, self.number, self.id).cmp(&(other.department_id, other.number, other.id))
    }
}

/// One weekly meeting of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Meeting {
    pub fn new(day: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self { day, start, end }
    }
}

/// A scheduled offering of a course in one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: u32,
    pub course_id: u32,
    /// Section number within the course and term, e.g. `001`.
    pub number: String,
    /// Term label, e.g. `2026FA`.
    pub term: String,
    pub building_id: u32,
    pub room: String,
    /// University id of the teaching faculty member, if assigned.
    #[serde(default)]
    pub instructor_id: Option<String>,
    pub capacity: u16,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
}

impl Section {
    pub fn new(
        id: u32,
        course_id: u32,
        number: impl Into<String>,
        term: impl Into<String>,
        building_id: u32,
        room: impl Into<String>,
        capacity: u16,
    ) -> Self {
        Self {
            id,
            course_id,
            number: number.into(),
            term: term.into(),
            building_id,
            room: room.into(),
            instructor_id: None,
            capacity,
            meetings: Vec::new(),
        }
    }

    /// Builder-style instructor assignment.
    #[must_use]
    pub fn with_instructor(mut self, university_id: impl Into<String>) -> Self {
        self.instructor_id = Some(university_id.into());
        self
    }

    /// Builder-style meeting list.
    #[must_use]
    pub fn with_meetings(mut self, meetings: Vec<Meeting>) -> Self {
        self.meetings = meetings;
        self
    }
}

impl Entity for Section {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Section;

    fn key(&self) -> u32 {
        self.id
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.course_id
            .cmp(&other.course_id)
            .then_with(|| self.term.cmp(&other.term))
            .then_with(|| self.number.cmp(&other.number))
            .then(self.id.cmp(&other.id))
    }
}
