//! # Stores Configuration
//!
//! Which data access strategy to use, and how to reach each backend.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STORES_ACCESS_MODE=rest                                            │
//! │     STORES_REST_URL=https://.../documents                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ledger/stores.toml (Linux)                               │
//! │     ~/Library/Application Support/com.stores.ledger/stores.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     AccessMode::Auto, real-time allowed, 5s probe                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [access]
//! mode = "auto"            # auto | realtime | rest
//! realtime_allowed = true  # false on networks that block streaming
//! probe_timeout_ms = 5000
//! failover_error_threshold = 3
//!
//! [rest]
//! base_url = "https://host/v1/projects/p/databases/(default)/documents"
//! page_size = 1000
//! request_timeout_secs = 30
//!
//! [database]
//! path = "/var/lib/stores/stores.db"
//! max_connections = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use stores_db::DbConfig;

use crate::error::{AccessError, AccessResult};

// =============================================================================
// Access Mode
// =============================================================================

/// Which strategy the selector may pick.
///
/// ```text
/// AUTO      probe real-time, fall back to REST on timeout or error
/// REALTIME  probe real-time even after earlier failures
/// REST      never open a real-time connection
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    Auto,
    Realtime,
    Rest,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Auto => write!(f, "auto"),
            AccessMode::Realtime => write!(f, "realtime"),
            AccessMode::Rest => write!(f, "rest"),
        }
    }
}

impl std::str::FromStr for AccessMode {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(AccessMode::Auto),
            "realtime" | "real-time" | "push" => Ok(AccessMode::Realtime),
            "rest" | "http" | "poll" => Ok(AccessMode::Rest),
            other => Err(AccessError::InvalidConfig(format!(
                "Unknown access mode: '{}'. Valid options: auto, realtime, rest",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Strategy selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSettings {
    #[serde(default)]
    pub mode: AccessMode,

    /// Set false where the network is known to block streaming traffic.
    #[serde(default = "default_true")]
    pub realtime_allowed: bool,

    /// How long to wait for the first real-time snapshot.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Consecutive transport errors on real-time writes before failing over.
    #[serde(default = "default_error_threshold")]
    pub failover_error_threshold: u32,
}

fn default_true() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    5000
}

fn default_error_threshold() -> u32 {
    3
}

impl Default for AccessSettings {
    fn default() -> Self {
        AccessSettings {
            mode: AccessMode::default(),
            realtime_allowed: true,
            probe_timeout_ms: default_probe_timeout(),
            failover_error_threshold: default_error_threshold(),
        }
    }
}

/// REST endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestSettings {
    /// Documents root of the REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/v1/projects/stores-ledger/databases/(default)/documents".to_string()
}

fn default_page_size() -> u32 {
    crate::rest::DEFAULT_PAGE_SIZE
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for RestSettings {
    fn default() -> Self {
        RestSettings {
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Embedded store settings for the real-time strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "stores", "ledger")
        .map(|dirs| dirs.data_dir().join("stores.db"))
        .unwrap_or_else(|| PathBuf::from("stores.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete data access configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default)]
    pub access: AccessSettings,

    #[serde(default)]
    pub rest: RestSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl StoresConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stores.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> AccessResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading stores config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load stores config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> AccessResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| AccessError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AccessError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| AccessError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Stores config saved");
        Ok(())
    }

    pub fn validate(&self) -> AccessResult<()> {
        let url = Url::parse(&self.rest.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AccessError::InvalidUrl(format!(
                "REST URL must start with http:// or https://, got: {}",
                self.rest.base_url
            )));
        }

        if self.rest.page_size == 0 {
            return Err(AccessError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }

        if self.access.probe_timeout_ms == 0 {
            return Err(AccessError::InvalidConfig(
                "probe_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides read through `lookup` (the process environment in
    /// [`StoresConfig::load`]).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("STORES_ACCESS_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding access mode from environment");
                    self.access.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown access mode in environment"),
            }
        }

        if let Some(allowed) = lookup("STORES_REALTIME_ALLOWED") {
            match allowed.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.access.realtime_allowed = true,
                "0" | "false" | "no" => self.access.realtime_allowed = false,
                _ => warn!(value = %allowed, "Unrecognised STORES_REALTIME_ALLOWED"),
            }
        }

        if let Some(timeout) = lookup("STORES_PROBE_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                self.access.probe_timeout_ms = ms;
            }
        }

        if let Some(url) = lookup("STORES_REST_URL") {
            debug!(url = %url, "Overriding REST URL from environment");
            self.rest.base_url = url;
        }

        if let Some(path) = lookup("STORES_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stores", "ledger")
            .map(|dirs| dirs.config_dir().join("stores.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn mode(&self) -> AccessMode {
        self.access.mode
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.access.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.rest.request_timeout_secs)
    }

    /// Database settings for the real-time strategy's embedded store.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }
}
