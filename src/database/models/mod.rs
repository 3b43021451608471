//! Database model exports.

pub mod account;
pub mod catalog;
pub mod entity;
pub mod university;

pub use account::{Role, User};
pub use catalog::{Course, Meeting, Section};
pub use entity::{Entity, EntityKind};
pub use university::{Building, Degree, Department, Major, School};
