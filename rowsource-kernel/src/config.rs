//! Data source configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::DataSourceError;

/// Configuration for a [`FetchCoordinator`](crate::FetchCoordinator).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSourceConfig {
    /// Bypass the response cache entirely.
    pub disable_cache: bool,

    /// Time-to-live of the built-in cache, in milliseconds. `None` keeps
    /// entries until the cache is cleared.
    pub cache_ttl_ms: Option<u64>,

    /// How many children fetches may be in flight at once. `None` is unbounded.
    pub max_concurrent_requests: Option<usize>,

    /// Group rows shallower than this depth are expanded (and their children
    /// fetched) as soon as they load. `-1` expands every level.
    pub default_grouping_expansion_depth: i32,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            disable_cache: false,
            cache_ttl_ms: Some(300_000),
            max_concurrent_requests: None,
            default_grouping_expansion_depth: 0,
            event_capacity: 1024,
        }
    }
}

impl DataSourceConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, DataSourceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_ms.map(Duration::from_millis)
    }

    /// Whether a group row at `depth` should be expanded when it loads.
    pub fn expands_depth(&self, depth: usize) -> bool {
        match self.default_grouping_expansion_depth {
            -1 => true,
            limit if limit <= 0 => false,
            limit => depth < limit as usize,
        }
    }
}
