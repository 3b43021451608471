//! Read-through / write-through steps shared by every manager.
//!
//! Lock order is always datastore lock, then cache lock. Cache writes that
//! follow a store round trip happen inside the datastore closure, so they are
//! ordered exactly like the store calls they reflect: a reader cannot insert a
//! row that a concurrent writer has already replaced, and two writers patch
//! the cache in the order they committed.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::cache::TypedCache;
use crate::database::{Datastore, Entity, Store, StoreResult};
use crate::error::{RegistrarError, Result};

/// Cache for one entity type, keyed by its natural key.
pub type EntityCache<T> = TypedCache<<T as Entity>::Key, T>;

/// Cached value, or one store round trip that populates the cache on a hit.
pub fn read_through<T: Entity>(
    cache: &EntityCache<T>,
    store: &Datastore,
    key: &T::Key,
    op: &'static str,
    load: impl FnOnce(&dyn Store) -> StoreResult<Option<T>>,
) -> Result<T> {
    if let Some(value) = cache.get(key) {
        return Ok(value);
    }

    let loaded = store.query(op, |db| {
        let loaded = load(db)?;
        if let Some(value) = &loaded {
            cache.insert(key.clone(), value.clone());
        }
        Ok(loaded)
    })?;

    match loaded {
        Some(value) => {
            debug!("Loaded {} {} from store", T::KIND, key);
            Ok(value)
        }
        None => Err(RegistrarError::not_found::<T>(key)),
    }
}

/// Cached values matching `filter` merged with one store query.
///
/// Fresh rows are cached if absent. The result holds each key once (the
/// cached copy wins) and is sorted by the entity's natural order.
pub fn read_listing<T: Entity>(
    cache: &EntityCache<T>,
    store: &Datastore,
    op: &'static str,
    filter: impl Fn(&T) -> bool,
    load: impl FnOnce(&dyn Store) -> StoreResult<Vec<T>>,
) -> Result<Vec<T>> {
    let merged = store.query(op, |db| {
        let mut merged: BTreeMap<T::Key, T> = cache
            .values()
            .into_iter()
            .filter(|v| filter(v))
            .map(|v| (v.key(), v))
            .collect();

        let fresh = load(db)?;
        let fetched = fresh.len();
        for value in fresh {
            let key = value.key();
            cache.insert_if_absent(key.clone(), value.clone());
            merged.entry(key).or_insert(value);
        }
        debug!("{}: {} rows from store, {} after merge", op, fetched, merged.len());
        Ok(merged)
    })?;

    let mut values: Vec<T> = merged.into_values().collect();
    values.sort_by(T::natural_cmp);
    Ok(values)
}

/// Cached, or confirmed by the store. Never trusts cache absence.
pub fn confirm_exists<T: Entity>(
    cache: &EntityCache<T>,
    store: &Datastore,
    key: &T::Key,
    op: &'static str,
    probe: impl FnOnce(&dyn Store) -> StoreResult<bool>,
) -> Result<bool> {
    if cache.contains(key) {
        return Ok(true);
    }
    Ok(store.query(op, probe)?)
}

/// Fail with `EntityNotFound` for `P` unless the parent exists.
pub fn require_parent<P: Entity>(exists: bool, key: &P::Key) -> Result<()> {
    if exists {
        Ok(())
    } else {
        Err(RegistrarError::not_found::<P>(key))
    }
}

/// Create `value` in the store, then cache it.
///
/// A `false` from the store means the key was taken in the meantime.
pub fn write_new<T: Entity>(
    cache: &EntityCache<T>,
    store: &Datastore,
    value: &T,
    op: &'static str,
    write: impl FnOnce(&dyn Store, &T) -> StoreResult<bool>,
) -> Result<()> {
    let key = value.key();
    let written = store
        .mutate(op, |db| {
            let written = write(db, value)?;
            if written {
                cache.insert(key.clone(), value.clone());
            }
            Ok(written)
        })
        .inspect_err(|e| warn!("{} for {} {} failed: {}", op, T::KIND, key, e))?;

    if !written {
        return Err(RegistrarError::duplicate::<T>(&key));
    }
    debug!("Created {} {}", T::KIND, key);
    Ok(())
}

/// Update `value` in the store, then patch the cached copy if there is one.
///
/// A `false` from the store means there was no row to update.
pub fn write_existing<T: Entity>(
    cache: &EntityCache<T>,
    store: &Datastore,
    value: &T,
    op: &'static str,
    write: impl FnOnce(&dyn Store, &T) -> StoreResult<bool>,
) -> Result<()> {
    let key = value.key();
    let written = store
        .mutate(op, |db| {
            let written = write(db, value)?;
            if written && cache.patch(key.clone(), value.clone()) {
                debug!("Patched cached {} {}", T::KIND, key);
            }
            Ok(written)
        })
        .inspect_err(|e| warn!("{} for {} {} failed: {}", op, T::KIND, key, e))?;

    if !written {
        return Err(RegistrarError::not_found::<T>(&key));
    }
    Ok(())
}
