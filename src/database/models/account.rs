//! User accounts.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

/// A registered account, keyed by university identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub university_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    /// Declared major, students only.
    #[serde(default)]
    pub major_id: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        university_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            university_id: university_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            role,
            major_id: None,
            created_at: Utc::now(),
        }
    }

    /// Builder-style major assignment.
    #[must_use]
    pub fn with_major(mut self, major_id: u32) -> Self {
        self.major_id = Some(major_id);
        self
    }
}

impl Entity for User {
    type Key = String;
    const KIND: EntityKind = EntityKind::User;

    fn key(&self) -> String {
        self.university_id.clone()
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.last_name
            .cmp(&other.last_name)
            .then_with(|| self.first_name.cmp(&other.first_name))
            .then_with(|| self.university_id.cmp(&other.university_id))
    }
}
