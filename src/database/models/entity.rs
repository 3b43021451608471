//! Common entity contract used by caches and managers.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Tag naming an entity type in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    School,
    Department,
    Major,
    Building,
    Course,
    Section,
    User,
}

impl EntityKind {
    /// Lowercase singular name, as shown in errors and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::School => "school",
            Self::Department => "department",
            Self::Major => "major",
            Self::Building => "building",
            Self::Course => "course",
            Self::Section => "section",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted record with a natural key.
///
/// Values are opaque to the cache; the key is what the cache indexes on.
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Ord + Hash + fmt::Display + Send + Sync + 'static;

    const KIND: EntityKind;

    fn key(&self) -> Self::Key;

    /// Ordering used when returning lists to callers.
    fn natural_cmp(&self, other: &Self) -> Ordering;
}
