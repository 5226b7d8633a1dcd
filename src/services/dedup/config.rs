//! Dedup gate configuration.
//!
//! This module defines configuration for the dedup engine: cache capacity,
//! the time-tiered similarity thresholds, registry lookback depth, and the
//! on-disk data locations.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the dedup engine.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `RELAYGATE_DATA_DIR` | path | `./data` | Root for partitions and stats |
/// | `RELAYGATE_CACHE_CAPACITY` | usize | `1000` | Similarity cache capacity |
/// | `RELAYGATE_TIER_IMMEDIATE_SECS` | u64 | `1800` | First tier boundary (30 min) |
/// | `RELAYGATE_TIER_SHORT_SECS` | u64 | `7200` | Second tier boundary (2 h) |
/// | `RELAYGATE_TIER_MEDIUM_SECS` | u64 | `86400` | Third tier boundary (24 h) |
/// | `RELAYGATE_THRESHOLD_IMMEDIATE` | f64 | `70` | Threshold inside first tier |
/// | `RELAYGATE_THRESHOLD_SHORT` | f64 | `80` | Threshold inside second tier |
/// | `RELAYGATE_THRESHOLD_MEDIUM` | f64 | `90` | Threshold inside third tier |
/// | `RELAYGATE_THRESHOLD_LONG` | f64 | `95` | Threshold past the third tier |
/// | `RELAYGATE_REGISTRY_LOOKBACK` | usize | `7` | Prior partitions scanned |
/// | `RELAYGATE_REGISTRY_THRESHOLD` | f64 | `95` | Lookback text-similarity bar |
/// | `RELAYGATE_RETENTION_DAYS` | u32 | `7` | Partitions older than this are skipped |
///
/// The early tiers are deliberately permissive: a near-identical item seen
/// minutes after the first sighting is almost always an unintentional re-post
/// of the same story, while the same similarity days later is increasingly
/// likely to be a different event reusing common phrasing.
///
/// # Example
///
/// ```rust
/// use relaygate::DedupConfig;
///
/// let config = DedupConfig::default();
/// assert_eq!(config.cache_capacity, 1000);
/// assert_eq!(config.registry_lookback, 7);
/// ```
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Root directory for sent partitions, omission partitions, and stats.
    pub data_dir: PathBuf,

    /// Maximum entries in the similarity cache before batch eviction.
    pub cache_capacity: usize,

    /// Upper bound of the most permissive tier.
    pub tier_immediate: Duration,

    /// Upper bound of the second tier.
    pub tier_short: Duration,

    /// Upper bound of the third tier.
    pub tier_medium: Duration,

    /// Similarity threshold within [`Self::tier_immediate`].
    pub threshold_immediate: f64,

    /// Similarity threshold within [`Self::tier_short`].
    pub threshold_short: f64,

    /// Similarity threshold within [`Self::tier_medium`].
    pub threshold_medium: f64,

    /// Similarity threshold past [`Self::tier_medium`].
    pub threshold_long: f64,

    /// How many prior day partitions the registry lookback scans.
    pub registry_lookback: usize,

    /// Fixed text-similarity bar for the registry lookback fallback.
    ///
    /// Deliberately stricter than the tiered cache thresholds and not
    /// tiered itself: the lookback answers "was this exact story already
    /// delivered days ago", not "is this merely similar".
    pub registry_text_threshold: f64,

    /// Partitions whose encoded date is older than this many days are
    /// skipped during lookback.
    pub retention_days: u32,
}

impl DedupConfig {
    /// Creates a configuration from environment variables.
    ///
    /// Falls back to defaults for any unset variable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            data_dir: std::env::var("RELAYGATE_DATA_DIR")
                .map_or(defaults.data_dir, PathBuf::from),
            cache_capacity: env_parse("RELAYGATE_CACHE_CAPACITY", defaults.cache_capacity),
            tier_immediate: Duration::from_secs(env_parse(
                "RELAYGATE_TIER_IMMEDIATE_SECS",
                defaults.tier_immediate.as_secs(),
            )),
            tier_short: Duration::from_secs(env_parse(
                "RELAYGATE_TIER_SHORT_SECS",
                defaults.tier_short.as_secs(),
            )),
            tier_medium: Duration::from_secs(env_parse(
                "RELAYGATE_TIER_MEDIUM_SECS",
                defaults.tier_medium.as_secs(),
            )),
            threshold_immediate: env_parse(
                "RELAYGATE_THRESHOLD_IMMEDIATE",
                defaults.threshold_immediate,
            ),
            threshold_short: env_parse("RELAYGATE_THRESHOLD_SHORT", defaults.threshold_short),
            threshold_medium: env_parse("RELAYGATE_THRESHOLD_MEDIUM", defaults.threshold_medium),
            threshold_long: env_parse("RELAYGATE_THRESHOLD_LONG", defaults.threshold_long),
            registry_lookback: env_parse(
                "RELAYGATE_REGISTRY_LOOKBACK",
                defaults.registry_lookback,
            ),
            registry_text_threshold: env_parse(
                "RELAYGATE_REGISTRY_THRESHOLD",
                defaults.registry_text_threshold,
            ),
            retention_days: env_parse("RELAYGATE_RETENTION_DAYS", defaults.retention_days),
        }
    }

    /// Directory holding `sent-<date>.json` partitions.
    #[must_use]
    pub fn sent_dir(&self) -> PathBuf {
        self.data_dir.join("sent")
    }

    /// Directory holding `omissions-<date>.json` partitions.
    #[must_use]
    pub fn omissions_dir(&self) -> PathBuf {
        self.data_dir.join("omissions")
    }

    /// Path of the running-stats JSON object.
    #[must_use]
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join("stats.json")
    }

    /// Builder method to set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Builder method to set the cache capacity.
    #[must_use]
    pub const fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Builder method to set the registry lookback depth.
    #[must_use]
    pub const fn with_registry_lookback(mut self, partitions: usize) -> Self {
        self.registry_lookback = partitions;
        self
    }

    /// Builder method to set the registry lookback text threshold.
    #[must_use]
    pub const fn with_registry_text_threshold(mut self, threshold: f64) -> Self {
        self.registry_text_threshold = threshold;
        self
    }

    /// Builder method to set the retention horizon.
    #[must_use]
    pub const fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            cache_capacity: 1000,
            tier_immediate: Duration::from_secs(30 * 60),
            tier_short: Duration::from_secs(2 * 60 * 60),
            tier_medium: Duration::from_secs(24 * 60 * 60),
            threshold_immediate: 70.0,
            threshold_short: 80.0,
            threshold_medium: 90.0,
            threshold_long: 95.0,
            registry_lookback: 7,
            registry_text_threshold: 95.0,
            retention_days: 7,
        }
    }
}

/// Parses an environment variable, falling back to a default.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DedupConfig::default();

        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.tier_immediate, Duration::from_secs(1800));
        assert_eq!(config.tier_short, Duration::from_secs(7200));
        assert_eq!(config.tier_medium, Duration::from_secs(86_400));
        assert!((config.threshold_immediate - 70.0).abs() < f64::EPSILON);
        assert!((config.threshold_long - 95.0).abs() < f64::EPSILON);
        assert_eq!(config.registry_lookback, 7);
        assert!((config.registry_text_threshold - 95.0).abs() < f64::EPSILON);
        assert_eq!(config.retention_days, 7);
    }

    #[test]
    fn test_data_paths() {
        let config = DedupConfig::default().with_data_dir("/var/lib/relaygate");

        assert_eq!(config.sent_dir(), PathBuf::from("/var/lib/relaygate/sent"));
        assert_eq!(
            config.omissions_dir(),
            PathBuf::from("/var/lib/relaygate/omissions")
        );
        assert_eq!(
            config.stats_path(),
            PathBuf::from("/var/lib/relaygate/stats.json")
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = DedupConfig::default()
            .with_cache_capacity(50)
            .with_registry_lookback(3)
            .with_registry_text_threshold(90.0)
            .with_retention_days(14);

        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.registry_lookback, 3);
        assert!((config.registry_text_threshold - 90.0).abs() < f64::EPSILON);
        assert_eq!(config.retention_days, 14);
    }
}
