//! Typed, shareable handle over a [`BoundedCache`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{BoundedCache, CacheConfig};

/// A typed cache wrapper that provides a clean API over [`BoundedCache`].
///
/// This cache is:
/// - Thread-safe (one mutex per cache, held for each whole operation)
/// - Approximate-LRU with a fixed number of slots
/// - Clone-friendly (cloning is cheap, shares the same underlying cache)
pub struct TypedCache<K, V>
where
    K: Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    inner: Arc<Mutex<BoundedCache<K, V>>>,
    name: Arc<str>,
}

// Manual Clone implementation that doesn't require K: Clone, V: Clone
impl<K, V> Clone for TypedCache<K, V>
where
    K: Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create a new typed cache with the given name and config.
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let cache = BoundedCache::with_slots(capacity);

        Self {
            inner: Arc::new(Mutex::new(cache)),
            name: name.into(),
        }
    }

    /// Get the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or overwrite a key-value pair.
    pub fn insert(&self, key: K, value: V) {
        if self.inner.lock().add(key, value).is_some() {
            trace!(cache = %self.name, "evicted oldest entry");
        }
    }

    /// Insert only if `key` is not cached yet.
    ///
    /// Returns `true` if the value was inserted.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut cache = self.inner.lock();
        if cache.contains(&key) {
            return false;
        }
        cache.add(key, value);
        true
    }

    /// Get a value from the cache, marking it recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).ok()
    }

    /// Replace the value of `key` if it is cached.
    ///
    /// Returns `false` without inserting anything when the key is absent.
    pub fn patch(&self, key: K, value: V) -> bool {
        self.inner.lock().set(key, value).is_ok()
    }

    /// Check if a key exists in the cache.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Remove a key from the cache.
    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Remove all entries from the cache.
    pub fn invalidate_all(&self) {
        self.inner.lock().reset();
    }

    /// Snapshot of all cached values.
    pub fn values(&self) -> Vec<V> {
        self.inner.lock().values()
    }

    /// Get the number of entries in the cache.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.inner.lock();
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &cache.len())
            .field("capacity", &cache.capacity())
            .finish()
    }
}
