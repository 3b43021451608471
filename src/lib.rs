//! Registrar - cache-aside domain managers for course registration
//!
//! ## Architecture
//!
//! - `cache` - Bounded slot caches with age-based eviction
//! - `database` - Store trait, lock-guarded datastore, memory and MongoDB backends
//! - `managers` - University, user, and course managers over the datastore
//! - `registrar` - Application state wiring the managers together
//! - `config` - Environment configuration
//! - `seed` - Demo catalog

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod managers;
pub mod registrar;
pub mod seed;

pub use error::{RegistrarError, Result};
pub use registrar::Registrar;
