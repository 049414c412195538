//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument
//! (default: config/dev.toml). A missing or unparsable file falls back to
//! built-in defaults so the engine always starts.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Floor on the refresh interval. The upstream API is shared and
/// rate-limit-friendly usage is part of the engine's contract, so a
/// configured interval below this is raised, never honored.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), timeout_secs: default_timeout_secs() }
    }
}

fn default_base_url() -> String {
    "https://api.themeparks.wiki/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Hierarchy is refetched every N refresh cycles (it rarely changes)
    #[serde(default = "default_hierarchy_refresh_cycles")]
    pub hierarchy_refresh_cycles: u64,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    /// Data older than multiplier x refresh_interval is reported stale
    #[serde(default = "default_staleness_multiplier")]
    pub staleness_multiplier: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            hierarchy_refresh_cycles: default_hierarchy_refresh_cycles(),
            backoff_cap_secs: default_backoff_cap_secs(),
            staleness_multiplier: default_staleness_multiplier(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_hierarchy_refresh_cycles() -> u64 {
    30
}

fn default_backoff_cap_secs() -> u64 {
    600
}

fn default_staleness_multiplier() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_file")]
    pub file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { file: default_cache_file() }
    }
}

fn default_cache_file() -> String {
    "cache/parkpulse.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParksConfig {
    /// Ordered park entity ids whose live data is polled
    #[serde(default = "default_tracked_parks")]
    pub tracked: Vec<String>,
    #[serde(default = "default_park")]
    pub default_park: String,
}

impl Default for ParksConfig {
    fn default() -> Self {
        Self { tracked: default_tracked_parks(), default_park: default_park() }
    }
}

// Walt Disney World park entity ids on themeparks.wiki
fn default_tracked_parks() -> Vec<String> {
    vec![
        "75ea578a-adc8-4116-a54d-dccb60765ef9".to_string(), // Magic Kingdom
        "47f90d2c-e191-4239-a466-5892ef59a88b".to_string(), // EPCOT
        "288747d1-8b4f-4a64-867e-ea7c9b27bad8".to_string(), // Hollywood Studios
        "1c84a229-8862-4648-9c71-378ddd2c7693".to_string(), // Animal Kingdom
    ]
}

fn default_park() -> String {
    "75ea578a-adc8-4116-a54d-dccb60765ef9".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Ordered attraction names for the featured view; matching is
    /// case-insensitive and partial
    #[serde(default = "default_featured_attractions")]
    pub featured_attractions: Vec<String>,
    #[serde(default = "default_show_closed")]
    pub show_closed_attractions: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            featured_attractions: default_featured_attractions(),
            show_closed_attractions: default_show_closed(),
        }
    }
}

fn default_featured_attractions() -> Vec<String> {
    vec![
        "Space Mountain".to_string(),
        "Big Thunder Mountain".to_string(),
        "Seven Dwarfs Mine Train".to_string(),
        "Haunted Mansion".to_string(),
        "Pirates of the Caribbean".to_string(),
    ]
}

fn default_show_closed() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub parks: ParksConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Main configuration struct used throughout the engine.
///
/// Immutable after construction - the scheduler takes a clone at build time
/// and never sees later edits. Reconfiguration means constructing a new
/// scheduler, not mutating shared state.
#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    request_timeout: Duration,
    refresh_interval: Duration,
    hierarchy_refresh_cycles: u64,
    backoff_cap: Duration,
    staleness_multiplier: u32,
    cache_file: String,
    tracked_parks: Vec<String>,
    default_park: String,
    featured_attractions: Vec<String>,
    show_closed_attractions: bool,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, source: &str) -> Self {
        // Enforce the refresh floor rather than trusting the file
        let refresh_secs = toml_config.sync.refresh_interval_secs.max(MIN_REFRESH_INTERVAL_SECS);
        if refresh_secs != toml_config.sync.refresh_interval_secs {
            tracing::warn!(
                configured = toml_config.sync.refresh_interval_secs,
                enforced = refresh_secs,
                "refresh_interval_below_floor"
            );
        }

        Self {
            base_url: toml_config.api.base_url,
            request_timeout: Duration::from_secs(toml_config.api.timeout_secs),
            refresh_interval: Duration::from_secs(refresh_secs),
            hierarchy_refresh_cycles: toml_config.sync.hierarchy_refresh_cycles.max(1),
            backoff_cap: Duration::from_secs(toml_config.sync.backoff_cap_secs),
            staleness_multiplier: toml_config.sync.staleness_multiplier.max(1),
            cache_file: toml_config.cache.file,
            tracked_parks: toml_config.parks.tracked,
            default_park: toml_config.parks.default_park,
            featured_attractions: toml_config.display.featured_attractions,
            show_closed_attractions: toml_config.display.show_closed_attractions,
            config_file: source.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn hierarchy_refresh_cycles(&self) -> u64 {
        self.hierarchy_refresh_cycles
    }

    pub fn backoff_cap(&self) -> Duration {
        self.backoff_cap
    }

    /// Age beyond which data counts as stale: multiplier x refresh interval
    pub fn staleness_threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.refresh_interval * self.staleness_multiplier)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000))
    }

    pub fn cache_file(&self) -> &str {
        &self.cache_file
    }

    pub fn tracked_parks(&self) -> &[String] {
        &self.tracked_parks
    }

    pub fn default_park(&self) -> &str {
        &self.default_park
    }

    pub fn featured_attractions(&self) -> &[String] {
        &self.featured_attractions
    }

    pub fn show_closed_attractions(&self) -> bool {
        self.show_closed_attractions
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the refresh interval without the floor
    #[cfg(test)]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Builder method for tests to set the featured list
    #[cfg(test)]
    pub fn with_featured(mut self, featured: Vec<String>) -> Self {
        self.featured_attractions = featured;
        self
    }

    /// Builder method for tests to toggle the closed filter
    #[cfg(test)]
    pub fn with_show_closed(mut self, show: bool) -> Self {
        self.show_closed_attractions = show;
        self
    }
}
