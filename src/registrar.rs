//! Application context wiring the managers together.

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheCapacities, CacheRegistry, CacheStats};
use crate::database::Datastore;
use crate::managers::{CourseManager, UniversityManager, UserManager};

/// Shared application state.
///
/// Built once per process (or per test) and handed to request handlers.
/// There are no global accessors; everything reachable from here was passed
/// in at construction.
#[derive(Clone)]
pub struct Registrar {
    /// Lock-guarded datastore shared by all managers.
    pub store: Datastore,

    /// Registry of every manager cache.
    pub caches: CacheRegistry,

    /// Schools, departments, majors, buildings.
    pub university: Arc<UniversityManager>,

    /// User accounts.
    pub users: Arc<UserManager>,

    /// Courses and sections.
    pub courses: Arc<CourseManager>,
}

impl Registrar {
    /// Create the managers over `store`.
    pub fn new(store: Datastore, capacities: &CacheCapacities) -> Self {
        let caches = CacheRegistry::new();

        let university = Arc::new(UniversityManager::new(store.clone(), &caches, capacities));
        let users = Arc::new(UserManager::new(
            store.clone(),
            university.clone(),
            &caches,
            capacities,
        ));
        let courses = Arc::new(CourseManager::new(
            store.clone(),
            university.clone(),
            users.clone(),
            &caches,
            capacities,
        ));

        info!("Registrar initialized with {} caches", caches.len());

        Self {
            store,
            caches,
            university,
            users,
            courses,
        }
    }

    /// Occupancy of every manager cache.
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        self.caches.stats()
    }

    /// Refuse further store calls once in-flight ones finish.
    pub fn shutdown(&self) {
        self.store.close();
    }
}
