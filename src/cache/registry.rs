//! Cache registry - Central management for all caches.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use super::{CacheConfig, TypedCache};

/// Point-in-time occupancy of one cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub capacity: usize,
}

/// Type-erased view used for diagnostics and maintenance.
trait CacheProbe: Send + Sync {
    fn stats(&self) -> CacheStats;
    fn clear(&self);
}

impl<K, V> CacheProbe for TypedCache<K, V>
where
    K: Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name().to_string(),
            entries: self.entry_count(),
            capacity: self.capacity(),
        }
    }

    fn clear(&self) {
        self.invalidate_all();
    }
}

/// Central registry for the caches owned by the domain managers.
///
/// Each manager creates its per-entity caches here by name, so that
/// diagnostics can enumerate every cache in the process.
///
/// ## Example
///
/// ```rust
/// use registrar::cache::{CacheConfig, CacheRegistry, TypedCache};
///
/// let registry = CacheRegistry::new();
/// let courses: TypedCache<u32, String> =
///     registry.get_or_create("courses", CacheConfig::with_capacity(8));
///
/// // Later, retrieve the same cache
/// let again: TypedCache<u32, String> = registry.get("courses").unwrap();
/// courses.insert(1, "Compilers".to_string());
/// assert!(again.contains(&1));
/// ```
#[derive(Clone)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

/// Internal cache entry storing type-erased cache.
struct CacheEntry {
    cache: Box<dyn Any + Send + Sync>,
    probe: Arc<dyn CacheProbe>,
    type_id: TypeId,
    type_name: &'static str,
}

impl CacheEntry {
    fn downcast<K, V>(&self, name: &str) -> TypedCache<K, V>
    where
        K: Eq + Send + 'static,
        V: Clone + Send + 'static,
    {
        match self.cache.downcast_ref::<TypedCache<K, V>>() {
            Some(cache) if self.type_id == TypeId::of::<TypedCache<K, V>>() => cache.clone(),
            _ => panic!(
                "Cache '{}' type mismatch: expected {}, got {}",
                name,
                std::any::type_name::<TypedCache<K, V>>(),
                self.type_name
            ),
        }
    }
}

impl CacheRegistry {
    /// Create a new empty cache registry.
    pub fn new() -> Self {
        info!("Cache registry initialized");
        Self {
            caches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    ///
    /// # Panics
    /// Panics if a cache with the same name but different types already exists.
    pub fn get_or_create<K, V>(&self, name: &str, config: CacheConfig) -> TypedCache<K, V>
    where
        K: Eq + Send + 'static,
        V: Clone + Send + 'static,
    {
        let mut caches = self.caches.write();

        if let Some(existing) = caches.get(name) {
            return existing.downcast(name);
        }

        debug!("Creating cache: {} ({} slots)", name, config.capacity);

        let cache = TypedCache::<K, V>::new(name, config);
        caches.insert(
            name.to_string(),
            CacheEntry {
                cache: Box::new(cache.clone()),
                probe: Arc::new(cache.clone()),
                type_id: TypeId::of::<TypedCache<K, V>>(),
                type_name: std::any::type_name::<TypedCache<K, V>>(),
            },
        );

        cache
    }

    /// Get an existing cache by name.
    ///
    /// # Panics
    /// Panics if the cache exists but with different types.
    pub fn get<K, V>(&self, name: &str) -> Option<TypedCache<K, V>>
    where
        K: Eq + Send + 'static,
        V: Clone + Send + 'static,
    {
        self.caches.read().get(name).map(|entry| entry.downcast(name))
    }

    /// Check if a cache with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    /// Get the number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.caches.read().is_empty()
    }

    /// Occupancy of every registered cache, sorted by name.
    pub fn stats(&self) -> Vec<CacheStats> {
        let mut stats: Vec<CacheStats> =
            self.caches.read().values().map(|e| e.probe.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Empty every registered cache. Maintenance only.
    pub fn clear_all(&self) {
        for entry in self.caches.read().values() {
            entry.probe.clear();
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_count", &caches.len())
            .field("cache_names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_shared_cache() {
        let registry = CacheRegistry::new();
        let a: TypedCache<u32, u32> = registry.get_or_create("a", CacheConfig::with_capacity(4));
        let again: TypedCache<u32, u32> = registry.get_or_create("a", CacheConfig::with_capacity(99));
        a.insert(1, 1);
        assert!(again.contains(&1));
        assert_eq!(again.capacity(), 4);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stats_sorted_by_name() {
        let registry = CacheRegistry::new();
        let b: TypedCache<u32, u32> = registry.get_or_create("b", CacheConfig::with_capacity(2));
        let _a: TypedCache<String, u32> = registry.get_or_create("a", CacheConfig::with_capacity(3));
        b.insert(7, 7);

        let stats = registry.stats();
        assert_eq!(stats[0], CacheStats { name: "a".into(), entries: 0, capacity: 3 });
        assert_eq!(stats[1], CacheStats { name: "b".into(), entries: 1, capacity: 2 });
    }

    #[test]
    fn test_clear_all() {
        let registry = CacheRegistry::new();
        let c: TypedCache<u32, u32> = registry.get_or_create("c", CacheConfig::default());
        c.insert(1, 1);
        registry.clear_all();
        assert_eq!(c.entry_count(), 0);
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn test_type_mismatch_panics() {
        let registry = CacheRegistry::new();
        let _: TypedCache<u32, u32> = registry.get_or_create("x", CacheConfig::default());
        let _: TypedCache<u32, String> = registry.get_or_create("x", CacheConfig::default());
    }
}
