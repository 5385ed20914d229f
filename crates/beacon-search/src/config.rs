//! Search configuration.
//!
//! Consumed once by `Search::new` and again on every `Search::reconfigure`; both go
//! through the same initialization path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::strategy::StrategyKind;

/// A byte count that deserializes from either an integer or a string such as
/// `"512k"`, `"1M"` or `"2G"` (binary multiples).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "MemorySizeRepr", into = "u64")]
pub struct MemorySize(u64);

impl MemorySize {
    pub const KIB: u64 = 1024;
    pub const MIB: u64 = 1024 * 1024;
    pub const GIB: u64 = 1024 * 1024 * 1024;

    pub const fn bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn kib(kib: u64) -> Self {
        Self(kib * Self::KIB)
    }

    pub const fn mib(mib: u64) -> Self {
        Self(mib * Self::MIB)
    }

    pub const fn as_bytes(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemorySize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidMemorySize {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let (digits, multiplier) = match trimmed.chars().last() {
            Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], Self::KIB),
            Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], Self::MIB),
            Some('g' | 'G') => (&trimmed[..trimmed.len() - 1], Self::GIB),
            Some(_) => (trimmed, 1),
            None => return Err(invalid()),
        };
        let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
        value.checked_mul(multiplier).map(Self).ok_or_else(invalid)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MemorySizeRepr {
    Bytes(u64),
    Text(String),
}

impl TryFrom<MemorySizeRepr> for MemorySize {
    type Error = ConfigError;

    fn try_from(repr: MemorySizeRepr) -> Result<Self, Self::Error> {
        match repr {
            MemorySizeRepr::Bytes(bytes) => Ok(Self(bytes)),
            MemorySizeRepr::Text(text) => text.parse(),
        }
    }
}

impl From<MemorySize> for u64 {
    fn from(size: MemorySize) -> Self {
        size.0
    }
}

/// Configuration for a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Depth at which depth-first search forces a backtrack (default: unbounded).
    pub depth_limit: usize,
    /// Treat a revisited state as new when it is reached at a shallower depth.
    pub match_by_min_depth: bool,
    /// Stop exploring once less than this much memory is available. Only checked when
    /// `max_memory` is set or a custom `MemoryProbe` is installed.
    pub min_free_memory: MemorySize,
    /// Process memory ceiling used to derive available memory. None disables the check.
    pub max_memory: Option<MemorySize>,
    /// Keep searching after a violation and collect every error.
    pub continue_on_violation: bool,
    /// Number of walks the random-restart strategy performs.
    pub path_limit: usize,
    /// Bound on the heuristic search queue. None = unbounded.
    pub queue_limit: Option<usize>,
    /// Heuristic search queues revisited states as well.
    pub path_sensitive: bool,
    /// Period of the background progress probe. None = no probe timer.
    pub probe_interval_ms: Option<u64>,
    pub strategy: StrategyKind,
    /// Seed for randomized heuristics.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth_limit: usize::MAX,
            match_by_min_depth: false,
            min_free_memory: MemorySize::mib(1),
            max_memory: None,
            continue_on_violation: false,
            path_limit: 1,
            queue_limit: None,
            path_sensitive: false,
            probe_interval_ms: None,
            strategy: StrategyKind::Dfs,
            seed: 42,
        }
    }
}

impl SearchConfig {
    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth_limit == 0 {
            return Err(ConfigError::Zero {
                field: "depth_limit",
            });
        }
        if self.path_limit == 0 {
            return Err(ConfigError::Zero { field: "path_limit" });
        }
        if self.queue_limit == Some(0) {
            return Err(ConfigError::Zero {
                field: "queue_limit",
            });
        }
        if self.probe_interval_ms == Some(0) {
            return Err(ConfigError::Zero {
                field: "probe_interval_ms",
            });
        }
        Ok(())
    }

    pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn with_continue_on_violation(mut self, continue_on_violation: bool) -> Self {
        self.continue_on_violation = continue_on_violation;
        self
    }

    pub fn with_match_by_min_depth(mut self, match_by_min_depth: bool) -> Self {
        self.match_by_min_depth = match_by_min_depth;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.depth_limit, usize::MAX);
        assert!(!config.match_by_min_depth);
        assert_eq!(config.min_free_memory.as_bytes(), 1024 * 1024);
        assert!(!config.continue_on_violation);
        assert_eq!(config.strategy, StrategyKind::Dfs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_size_parsing() {
        assert_eq!("1024".parse::<MemorySize>().unwrap().as_bytes(), 1024);
        assert_eq!("512k".parse::<MemorySize>().unwrap().as_bytes(), 512 * 1024);
        assert_eq!("1M".parse::<MemorySize>().unwrap().as_bytes(), 1024 * 1024);
        assert_eq!(
            "2g".parse::<MemorySize>().unwrap().as_bytes(),
            2 * 1024 * 1024 * 1024
        );
        assert!("".parse::<MemorySize>().is_err());
        assert!("lots".parse::<MemorySize>().is_err());
        assert!("M".parse::<MemorySize>().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SearchConfig::from_json(
            r#"{
                "depth_limit": 42,
                "min_free_memory": "2M",
                "continue_on_violation": true,
                "strategy": "random_restart"
            }"#,
        )
        .unwrap();
        assert_eq!(config.depth_limit, 42);
        assert_eq!(config.min_free_memory, MemorySize::mib(2));
        assert!(config.continue_on_violation);
        assert_eq!(config.strategy, StrategyKind::RandomRestart);
        assert_eq!(config.path_limit, 1);
    }

    #[test]
    fn test_from_json_numeric_memory() {
        let config = SearchConfig::from_json(r#"{ "min_free_memory": 4096 }"#).unwrap();
        assert_eq!(config.min_free_memory.as_bytes(), 4096);
    }

    #[test]
    fn test_from_json_rejects_zero_path_limit() {
        let err = SearchConfig::from_json(r#"{ "path_limit": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Zero { field: "path_limit" }));
    }

    #[test]
    fn test_from_json_rejects_bad_memory() {
        assert!(SearchConfig::from_json(r#"{ "min_free_memory": "many" }"#).is_err());
    }

    #[test]
    fn test_roundtrip_json() {
        let config = SearchConfig::default()
            .with_depth_limit(10)
            .with_match_by_min_depth(true);
        let json = serde_json::to_string(&config).unwrap();
        let back = SearchConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }
}
