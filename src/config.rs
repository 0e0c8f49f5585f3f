// src/config.rs

//! Configuration for cost-graph construction and simplification.
//!
//! The library never reads global state: every entry point takes a
//! `&Config`. The process-wide [`CONFIG`] exists for the diagnostic binary,
//! which loads it from the file named by `SHARDING_COST_GRAPH_CONFIG`.

use std::path::{Path, PathBuf};

use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "SHARDING_COST_GRAPH_CONFIG";

/// Configuration loaded once on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)] // Missing fields fall back to `Config::default()`.
pub struct Config {
    /// Merge nodes joined by a follow relation during `simplify`.
    pub simplify: bool,
    /// Largest allowed difference between the communication costs of two
    /// same-named strategies on a reassociation pair.
    pub reassociation_tolerance: f64,
    /// Print node sizes and every edge matrix instead of a summary.
    pub dump_graph: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            simplify: true,
            reassociation_tolerance: 1e-6,
            dump_graph: false,
        }
    }
}

impl Config {
    /// Read a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from [`CONFIG_ENV_VAR`] if it is set, else use defaults.
    ///
    /// A config file that fails to load is reported and ignored.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from) else {
            return Config::default();
        };
        match Config::load(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; using default config", e);
                Config::default()
            }
        }
    }
}
