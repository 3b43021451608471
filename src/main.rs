//! Registrar service binary.
//!
//! Opens the configured store, builds the managers, optionally seeds a demo
//! catalog, then waits for Ctrl-C.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use registrar::Registrar;
use registrar::config::{Config, StoreBackend};
use registrar::database::{Datastore, MemoryStore, MongoStore};
use registrar::seed::seed_demo_data;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("registrar=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting registrar...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    // Store calls block, so keep them off the async workers.
    let backend = config.store.clone();
    let store = tokio::task::spawn_blocking(move || open_store(&backend)).await??;
    info!("Store opened");

    let registrar = Registrar::new(store, &config.capacities);

    if config.seed_demo_data {
        let r = registrar.clone();
        let created = tokio::task::spawn_blocking(move || seed_demo_data(&r))
            .await?
            .context("seeding demo data")?;
        info!("Demo data ready ({} new entities)", created);
    }

    let university = registrar.university.clone();
    match tokio::task::spawn_blocking(move || university.warm()).await? {
        Ok(n) => info!("Warmed university caches with {} entities", n),
        Err(e) => warn!("Cache warm-up failed: {}", e),
    }

    info!("Cache stats: {}", serde_json::to_string(&registrar.cache_stats())?);

    info!("Registrar running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    registrar.shutdown();
    info!("Cache stats at shutdown: {}", serde_json::to_string(&registrar.cache_stats())?);
    info!("Registrar stopped");

    Ok(())
}

fn open_store(backend: &StoreBackend) -> anyhow::Result<Datastore> {
    match backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Datastore::new(MemoryStore::new()))
        }
        StoreBackend::Mongo { uri, database } => {
            info!("Connecting to MongoDB...");
            let store = MongoStore::connect(uri, database)
                .with_context(|| format!("connecting to MongoDB database '{database}'"))?;
            Ok(Datastore::new(store))
        }
    }
}
