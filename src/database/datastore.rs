//! Lock-guarded access to the backing store.
//!
//! One reader/writer lock serializes every store round trip in the process.
//! Queries share the lock in read mode, mutations take it exclusively, and
//! either mode is held for the full call. Acquisition blocks until granted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, trace};

use super::store::{Store, StoreError, StoreResult};

/// Shared handle to the store behind the process-wide lock.
#[derive(Clone)]
pub struct Datastore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Box<dyn Store>,
    lock: RwLock<()>,
    open: AtomicBool,
}

impl Datastore {
    /// Wrap a store backend.
    pub fn new(backend: impl Store + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Box::new(backend),
                lock: RwLock::new(()),
                open: AtomicBool::new(true),
            }),
        }
    }

    /// Run a read-only round trip under the shared lock.
    pub fn query<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&dyn Store) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let _guard = self.inner.lock.read();
        self.ensure_open(op)?;
        trace!(op, "store query");
        f(self.inner.backend.as_ref())
    }

    /// Run a mutating round trip under the exclusive lock.
    pub fn mutate<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&dyn Store) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let _guard = self.inner.lock.write();
        self.ensure_open(op)?;
        trace!(op, "store mutation");
        f(self.inner.backend.as_ref())
    }

    /// Stop accepting calls. Waits for in-flight calls to finish first.
    pub fn close(&self) {
        let _guard = self.inner.lock.write();
        if self.inner.open.swap(false, Ordering::SeqCst) {
            info!("Datastore closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self, op: &'static str) -> StoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::unavailable(format!("datastore closed ({op})")))
        }
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("open", &self.is_open())
            .finish()
    }
}
