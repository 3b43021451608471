//! Database module exports.

mod datastore;
mod memory;
mod models;
mod mongo;
mod store;

pub use datastore::Datastore;
pub use memory::MemoryStore;
pub use models::*;
pub use mongo::MongoStore;
pub use store::{Store, StoreError, StoreResult};
