//! Configuration module for the registrar service.
//!
//! Loads configuration from environment variables.

use std::env;

use anyhow::{bail, Context, Result};

use crate::cache::{CacheCapacities, CacheConfig};

/// Which store backend to run against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// In-process tables, lost on restart.
    #[default]
    Memory,
    /// MongoDB at the given URI.
    Mongo { uri: String, database: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,

    /// Populate a small demo catalog on startup.
    pub seed_demo_data: bool,

    /// Slots per manager cache.
    pub capacities: CacheCapacities,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if `STORE_BACKEND` is unknown, if `MONGODB_URI` is missing for
    /// the MongoDB backend, or if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = lookup("STORE_BACKEND")
            .unwrap_or_else(|| "memory".to_string())
            .to_lowercase();

        let store = match backend.as_str() {
            "memory" => StoreBackend::Memory,
            "mongodb" | "mongo" => StoreBackend::Mongo {
                uri: lookup("MONGODB_URI")
                    .context("MONGODB_URI must be set when STORE_BACKEND is mongodb")?,
                database: lookup("MONGODB_DATABASE").unwrap_or_else(|| "registrar".to_string()),
            },
            other => bail!("unknown STORE_BACKEND '{}'", other),
        };

        let seed_demo_data = match lookup("SEED_DEMO_DATA") {
            Some(v) => parse_bool(&v).with_context(|| format!("invalid SEED_DEMO_DATA '{v}'"))?,
            None => false,
        };

        let defaults = CacheCapacities::default();
        let capacity = |name: &str, default: CacheConfig| -> Result<CacheConfig> {
            let key = format!("CACHE_{name}_CAPACITY");
            match lookup(&key) {
                Some(v) => {
                    let slots: usize = v
                        .trim()
                        .parse()
                        .with_context(|| format!("invalid {key} '{v}'"))?;
                    Ok(CacheConfig::with_capacity(slots))
                }
                None => Ok(default),
            }
        };

        let capacities = CacheCapacities {
            schools: capacity("SCHOOLS", defaults.schools)?,
            departments: capacity("DEPARTMENTS", defaults.departments)?,
            majors: capacity("MAJORS", defaults.majors)?,
            buildings: capacity("BUILDINGS", defaults.buildings)?,
            courses: capacity("COURSES", defaults.courses)?,
            sections: capacity("SECTIONS", defaults.sections)?,
            users: capacity("USERS", defaults.users)?,
        };

        Ok(Self {
            store,
            seed_demo_data,
            capacities,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
