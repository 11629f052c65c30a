//! Dashboard configuration: built-in defaults < TOML file < `AURA__*` environment.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | bind_addr | 127.0.0.1:8000 | Gateway listen address. |
//! | storage_backend | sled | `sled`, `file`, or `memory`. |
//! | storage_path | ./data/aura_shortcuts | Sled directory or JSON file. |
//! | gemini_model | gemini-2.5-flash | Search model. |
//! | gemini_api_base | Gemini v1beta | Endpoint base. |
//! | gemini_api_key | (unset) | Falls back to `GEMINI_API_KEY`, then `API_KEY`. |
//! | search_timeout_secs | (unset) | Transport timeout for the search call; unset means none. |

use crate::gemini_bridge::{GeminiBridge, SearchProvider, DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::storage::{FileStorage, MemoryStorage, ShortcutStorage, SledStorage, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/aura";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sled,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub bind_addr: String,
    pub storage_backend: StorageBackend,
    pub storage_path: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub search_timeout_secs: Option<u64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            storage_backend: StorageBackend::Sled,
            storage_path: "./data/aura_shortcuts".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            gemini_api_key: None,
            search_timeout_secs: None,
        }
    }
}

impl DashboardConfig {
    /// Load config from file and environment. File path: env `AURA_CONFIG` > `config/aura` (any
    /// extension the `config` crate understands, e.g. `config/aura.toml`).
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("AURA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("storage_backend", "sled")?
            .set_default("storage_path", defaults.storage_path)?
            .set_default("gemini_model", defaults.gemini_model)?
            .set_default("gemini_api_base", defaults.gemini_api_base)?;

        let builder = builder.add_source(config::File::with_name(config_path).required(false));

        let built = builder
            .add_source(config::Environment::with_prefix("AURA").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// The search credential: config value, then `GEMINI_API_KEY`, then `API_KEY`.
    /// A blank value at any step counts as missing and falls through to the next.
    pub fn api_key(&self) -> Option<String> {
        non_blank(self.gemini_api_key.clone())
            .or_else(|| non_blank(std::env::var("GEMINI_API_KEY").ok()))
            .or_else(|| non_blank(std::env::var("API_KEY").ok()))
    }

    /// Build the search provider, or `None` when no credential is available.
    pub fn search_provider(&self) -> Option<Arc<dyn SearchProvider>> {
        let key = self.api_key()?;
        let bridge = GeminiBridge::with_timeout(key, self.search_timeout_secs.map(Duration::from_secs))
            .with_model(&self.gemini_model)
            .with_api_base(&self.gemini_api_base);
        Some(Arc::new(bridge))
    }

    /// Open the configured shortcut storage backend.
    pub fn open_storage(&self) -> Result<Arc<dyn ShortcutStorage>, StorageError> {
        let storage: Arc<dyn ShortcutStorage> = match self.storage_backend {
            StorageBackend::Sled => Arc::new(SledStorage::open(Some(Path::new(&self.storage_path)))?),
            StorageBackend::File => Arc::new(FileStorage::new(&self.storage_path)),
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        };
        Ok(storage)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
