//! Errors surfaced by the domain managers.

use thiserror::Error;

use crate::database::{Entity, EntityKind, StoreError};

/// Manager-level failure.
///
/// Cache misses never appear here; a manager either loads the entity or
/// reports [`RegistrarError::EntityNotFound`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrarError {
    #[error("{kind} {key} not found")]
    EntityNotFound { kind: EntityKind, key: String },

    #[error("{kind} {key} already exists")]
    DuplicateEntity { kind: EntityKind, key: String },

    /// Store failure, passed through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistrarError {
    pub fn not_found<T: Entity>(key: &T::Key) -> Self {
        Self::EntityNotFound {
            kind: T::KIND,
            key: key.to_string(),
        }
    }

    pub fn duplicate<T: Entity>(key: &T::Key) -> Self {
        Self::DuplicateEntity {
            kind: T::KIND,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }

    /// Whether the store could not be reached (or was closed).
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unavailable())
    }
}

pub type Result<T> = std::result::Result<T, RegistrarError>;
