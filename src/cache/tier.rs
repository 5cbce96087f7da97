//! Freshness tiers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CacheError;

/// A named freshness class.
///
/// Every wrapped operation is assigned exactly one tier at its call site.
/// The tier fixes how long a stored result stays servable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Rapidly changing data: current production metrics, active alerts.
    Live,
    /// Data that settles over a shift: trends, recommendations, comparisons.
    Daily,
    /// Reference data: line layouts, equipment catalogues.
    Static,
    /// Never stored. Lookups always miss.
    None,
}

impl Tier {
    /// All tiers, in declaration order.
    pub const ALL: [Tier; 4] = [Tier::Live, Tier::Daily, Tier::Static, Tier::None];

    /// Tiers that actually hold entries.
    pub const STORING: [Tier; 3] = [Tier::Live, Tier::Daily, Tier::Static];

    /// Lowercase tier name, as used in config files, keys and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Live => "live",
            Tier::Daily => "daily",
            Tier::Static => "static",
            Tier::None => "none",
        }
    }

    /// Canonical TTL for the tier.
    pub fn default_ttl(&self) -> Duration {
        match self {
            Tier::Live => Duration::from_secs(60),
            Tier::Daily => Duration::from_secs(900),
            Tier::Static => Duration::from_secs(3600),
            Tier::None => Duration::ZERO,
        }
    }

    /// Whether entries assigned to this tier are ever stored.
    pub fn is_storing(&self) -> bool {
        !matches!(self, Tier::None)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Tier::Live),
            "daily" => Ok(Tier::Daily),
            "static" => Ok(Tier::Static),
            "none" => Ok(Tier::None),
            other => Err(CacheError::UnknownTier(other.to_string())),
        }
    }
}

/// Fixed TTL and capacity for one tier's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSettings {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl TierSettings {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries }
    }
}
