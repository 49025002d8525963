//! Runtime settings read from `BOSSRAID_*` environment variables.

use std::env;
use std::str::FromStr;

use crate::combat::{Catalog, CatalogError, DEFAULT_AVG_TEAM_SIZE};
use crate::store::transaction::DEFAULT_MAX_ATTEMPTS;
use crate::store::RetryPolicy;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub bind: String,
    /// YAML or JSON catalog; the builtin catalog when unset.
    pub catalog_path: Option<String>,
    /// Fixed RNG seed for reproducible sessions; OS entropy when unset.
    pub seed: Option<u64>,
    pub max_attempts: u32,
    pub avg_team_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            catalog_path: None,
            seed: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            avg_team_size: DEFAULT_AVG_TEAM_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to the default with a
    /// warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind: lookup("BOSSRAID_BIND")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.bind),
            catalog_path: lookup("BOSSRAID_CATALOG").filter(|v| !v.trim().is_empty()),
            seed: lookup("BOSSRAID_SEED").and_then(|raw| parse_var("BOSSRAID_SEED", &raw)),
            max_attempts: lookup("BOSSRAID_MAX_ATTEMPTS")
                .and_then(|raw| parse_var("BOSSRAID_MAX_ATTEMPTS", &raw))
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_attempts),
            avg_team_size: lookup("BOSSRAID_AVG_TEAM_SIZE")
                .and_then(|raw| parse_var("BOSSRAID_AVG_TEAM_SIZE", &raw))
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.avg_team_size),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            ..RetryPolicy::default()
        }
    }

    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => {
                let catalog = Catalog::load(path)?;
                tracing::info!(path = %path, bosses = catalog.bosses.len(), "catalog loaded");
                Ok(catalog)
            }
            None => Ok(Catalog::builtin()),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "ignoring unparseable setting");
            None
        }
    }
}
