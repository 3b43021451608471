//! Cache module - fixed-capacity caches owned by the domain managers.
//!
//! ## Architecture
//!
//! - `BoundedCache` - unsynchronized slot array with age-based eviction
//! - `TypedCache` - named, mutex-guarded handle shared between request threads
//! - `CacheRegistry` - central registry holding all named caches
//!
//! ## Usage
//!
//! ```rust
//! use registrar::cache::{CacheConfig, CacheRegistry, TypedCache};
//!
//! let registry = CacheRegistry::new();
//! let users: TypedCache<String, u32> = registry.get_or_create("users", CacheConfig::sessions());
//!
//! users.insert("u100".to_string(), 7);
//! assert_eq!(users.get(&"u100".to_string()), Some(7));
//! ```

pub mod bounded;
mod config;
mod registry;
mod typed;

use thiserror::Error;

pub use bounded::BoundedCache;
pub use config::{CacheCapacities, CacheConfig};
pub use registry::{CacheRegistry, CacheStats};
pub use typed::TypedCache;

/// Errors raised by cache operations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("key not found in cache")]
    KeyNotFound,

    #[error("cache capacity must be at least one slot")]
    ZeroCapacity,
}
