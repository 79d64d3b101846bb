//! Run configuration
//!
//! Built-in defaults, overridden by `HOLOCRON_*` environment variables,
//! overridden in turn by command-line flags in the binary.

use crate::catalog::normalize_base_url;
use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "HOLOCRON";
pub const DEFAULT_BASE_URL: &str = "https://swapi.dev/api/";
pub const DEFAULT_DATABASE: &str = "holocron.sqlite";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Catalog root; collections live at `<base_url><resource>/`
    pub base_url: String,

    /// SQLite database file
    pub database: PathBuf,

    /// Per-request HTTP timeout
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: DEFAULT_BASE_URL.to_string(),
            database: PathBuf::from(DEFAULT_DATABASE),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Defaults plus the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(None)
    }

    /// Defaults plus the given environment (the process environment if `None`)
    pub fn from_env(env: Option<HashMap<String, String>>) -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("database", DEFAULT_DATABASE)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        Ok(settings.normalized())
    }

    fn normalized(mut self) -> Self {
        self.base_url = normalize_base_url(&self.base_url);
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
