//! Cache configuration.

/// Configuration for a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of slots allocated for the cache. Never zero.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Set capacity for the cache (builder pattern).
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Small, rarely changing tables (schools, buildings).
    pub fn reference_data() -> Self {
        Self::with_capacity(16)
    }

    /// Catalog tables browsed on most pages (departments, majors, courses).
    pub fn catalog() -> Self {
        Self::with_capacity(64)
    }

    /// Per-term offerings, the busiest table during registration.
    pub fn offerings() -> Self {
        Self::with_capacity(128)
    }

    /// Signed-in accounts.
    pub fn sessions() -> Self {
        Self::with_capacity(64)
    }
}

/// Capacities for every cache owned by the domain managers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheCapacities {
    pub schools: CacheConfig,
    pub departments: CacheConfig,
    pub majors: CacheConfig,
    pub buildings: CacheConfig,
    pub courses: CacheConfig,
    pub sections: CacheConfig,
    pub users: CacheConfig,
}

impl Default for CacheCapacities {
    fn default() -> Self {
        Self {
            schools: CacheConfig::reference_data(),
            departments: CacheConfig::catalog(),
            majors: CacheConfig::catalog(),
            buildings: CacheConfig::reference_data(),
            courses: CacheConfig::catalog(),
            sections: CacheConfig::offerings(),
            users: CacheConfig::sessions(),
        }
    }
}

impl CacheCapacities {
    /// Every cache gets the same capacity. Mostly useful in tests.
    pub fn uniform(capacity: usize) -> Self {
        let config = CacheConfig::with_capacity(capacity);
        Self {
            schools: config,
            departments: config,
            majors: config,
            buildings: config,
            courses: config,
            sections: config,
            users: config,
        }
    }
}
