//! Configuration loading.
//!
//! Configuration is loaded once at process start from a TOML file with the
//! following resolution order:
//! 1. explicit path (e.g. a `--config <path>` flag)
//! 2. `~/.millcache/config.toml` (user)
//! 3. `/etc/millcache/config.toml` (system)
//!
//! `MILLCACHE_*` environment variables override individual file values.
//! Nothing here is re-read after the cache is built.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{Tier, TierSettings};
use crate::{CacheError, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Cache configuration.
///
/// ```rust
/// # use millcache::{CacheConfig, Tier};
/// let config = CacheConfig::new()
///     .max_entries_per_tier(500)
///     .ttl_secs(Tier::Live, 30);
/// assert_eq!(config.settings_for(Tier::Live).max_entries, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Master switch. When false every call runs the underlying operation
    /// (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Capacity of each storing tier (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries_per_tier: usize,
    #[serde(default)]
    pub ttl: TtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_entries_per_tier: default_max_entries(),
            ttl: TtlConfig::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> usize {
    1000
}

/// TTL in seconds for each storing tier. The `none` tier is always 0.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TtlConfig {
    #[serde(default = "default_live_ttl")]
    pub live: u64,
    #[serde(default = "default_daily_ttl")]
    pub daily: u64,
    #[serde(default = "default_static_ttl", rename = "static")]
    pub static_: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            live: default_live_ttl(),
            daily: default_daily_ttl(),
            static_: default_static_ttl(),
        }
    }
}

fn default_live_ttl() -> u64 {
    Tier::Live.default_ttl().as_secs()
}

fn default_daily_ttl() -> u64 {
    Tier::Daily.default_ttl().as_secs()
}

fn default_static_ttl() -> u64 {
    Tier::Static.default_ttl().as_secs()
}

/// Environment variable → setting mapping for overrides.
const ENV_ENABLED: &str = "MILLCACHE_ENABLED";
const ENV_MAX_ENTRIES: &str = "MILLCACHE_MAX_ENTRIES_PER_TIER";
const ENV_TTLS: &[(Tier, &str)] = &[
    (Tier::Live, "MILLCACHE_TTL_LIVE"),
    (Tier::Daily, "MILLCACHE_TTL_DAILY"),
    (Tier::Static, "MILLCACHE_TTL_STATIC"),
];

impl CacheConfig {
    /// Create a config with the canonical defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the capacity of each storing tier.
    pub fn max_entries_per_tier(mut self, n: usize) -> Self {
        self.max_entries_per_tier = n;
        self
    }

    /// Set one tier's TTL in seconds. Ignored for [`Tier::None`].
    pub fn ttl_secs(mut self, tier: Tier, secs: u64) -> Self {
        match tier {
            Tier::Live => self.ttl.live = secs,
            Tier::Daily => self.ttl.daily = secs,
            Tier::Static => self.ttl.static_ = secs,
            Tier::None => {}
        }
        self
    }

    /// Effective TTL and capacity for `tier`.
    pub fn settings_for(&self, tier: Tier) -> TierSettings {
        let secs = match tier {
            Tier::Live => self.ttl.live,
            Tier::Daily => self.ttl.daily,
            Tier::Static => self.ttl.static_,
            Tier::None => return TierSettings::new(Duration::ZERO, 0),
        };
        TierSettings::new(Duration::from_secs(secs), self.max_entries_per_tier)
    }

    /// Reject settings the stores cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries_per_tier == 0 {
            return Err(CacheError::Configuration(
                "max_entries_per_tier must be greater than zero".to_string(),
            ));
        }
        for tier in Tier::STORING {
            if self.settings_for(tier).ttl.is_zero() {
                return Err(CacheError::Configuration(format!(
                    "ttl.{tier} must be greater than zero"
                )));
            }
        }
        Ok(())
    }

    /// Apply `MILLCACHE_*` overrides from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_ENABLED) {
            self.enabled = parse_bool(ENV_ENABLED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_ENTRIES) {
            self.max_entries_per_tier = parse_number(ENV_MAX_ENTRIES, &raw)?;
        }
        for (tier, name) in ENV_TTLS {
            if let Some(raw) = lookup(name) {
                let secs = parse_number(name, &raw)?;
                self = self.ttl_secs(*tier, secs);
            }
        }
        Ok(self)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CacheError::Configuration(format!(
            "{name} must be a boolean, got {raw:?}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        CacheError::Configuration(format!("{name} must be a non-negative integer, got {raw:?}"))
    })
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.millcache/config.toml`
    /// 3. `/etc/millcache/config.toml`
    ///
    /// With no explicit path and no file found, the defaults are used.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Config::default(),
        };
        Ok(Config {
            cache: config.cache.apply_env_overrides()?,
        })
    }

    /// Parse a configuration document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CacheError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CacheError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CacheError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CacheError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".millcache").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/millcache/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
