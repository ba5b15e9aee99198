//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};
use crate::registry::CollectionRegistry;

/// Upper bound on the worker pool size.
pub const MAX_WORKERS_LIMIT: usize = 256;

/// Runtime settings of the collection engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for metric and observation fan-out. 0 or 1 runs
    /// sequentially.
    pub max_workers: usize,

    /// Ask recipes to materialize dive-down payloads.
    pub produce_dive_down: bool,

    /// Optional TOML file with extra metric collections.
    pub collections_file: Option<PathBuf>,
}

impl EngineConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/enso_metrics.toml (base settings)
    /// 2. config/{ENSO_METRICS_ENV}.toml (environment-specific)
    /// 3. Environment variables with ENSO_METRICS__ prefix
    pub fn load() -> EngineResult<Self> {
        let env = std::env::var("ENSO_METRICS_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/enso_metrics").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("ENSO_METRICS").separator("__"));

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| EngineError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_workers > MAX_WORKERS_LIMIT {
            return Err(EngineError::invalid_param(
                "max_workers",
                self.max_workers,
                format!("Must be at most {}", MAX_WORKERS_LIMIT),
            ));
        }
        if let Some(path) = &self.collections_file {
            if !path.exists() {
                return Err(EngineError::ConfigError(format!(
                    "collections_file does not exist: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Whether fan-out runs on a worker pool.
    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.max_workers > 1
    }

    /// Built-in collections extended with `collections_file`, if set.
    pub fn registry(&self) -> EngineResult<CollectionRegistry> {
        let mut registry = CollectionRegistry::builtin();
        if let Some(path) = &self.collections_file {
            registry.load_file(path)?;
        }
        Ok(registry)
    }
}
