/*!
 * AVC Configuration
 * Cache geometry, retry bounds and enforcement defaults
 */

use super::types::{AvcError, AvcResult};
use crate::core::limits::{
    AVC_CACHE_MAXNODES, AVC_CACHE_SLOTS, AVC_CAPACITY_WARN_INTERVAL, AVC_MAX_INSERT_RETRIES,
    MAX_AUDIT_EVENTS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Access vector cache configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct AvcConfig {
    /// Hash chains in the table (power of two)
    pub cache_slots: usize,
    /// Pre-allocated nodes
    pub max_nodes: usize,
    /// Compute-and-insert attempts per check
    pub max_insert_retries: u32,
    /// Start in enforcing mode
    pub enforcing: bool,
    /// Audit records retained in memory
    pub audit_history: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub capacity_warn_interval: Duration,
}

impl Default for AvcConfig {
    fn default() -> Self {
        Self {
            cache_slots: AVC_CACHE_SLOTS,
            max_nodes: AVC_CACHE_MAXNODES,
            max_insert_retries: AVC_MAX_INSERT_RETRIES,
            enforcing: true,
            audit_history: MAX_AUDIT_EVENTS,
            capacity_warn_interval: AVC_CAPACITY_WARN_INTERVAL,
        }
    }
}

impl AvcConfig {
    /// Defaults overridden by environment variables
    ///
    /// Environment variables:
    /// - AVC_CACHE_SLOTS: hash chains (power of two)
    /// - AVC_CACHE_MAXNODES: node pool size
    /// - AVC_MAX_RETRIES: compute-and-insert attempts
    /// - AVC_ENFORCING: "1"/"true" or "0"/"false"
    /// - AVC_AUDIT_HISTORY: audit records kept in memory
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(slots) = env_override("AVC_CACHE_SLOTS") {
            config.cache_slots = slots;
        }
        if let Some(nodes) = env_override("AVC_CACHE_MAXNODES") {
            config.max_nodes = nodes;
        }
        if let Some(retries) = env_override("AVC_MAX_RETRIES") {
            config.max_insert_retries = retries;
        }
        if let Ok(value) = std::env::var("AVC_ENFORCING") {
            match value.as_str() {
                "1" | "true" => config.enforcing = true,
                "0" | "false" => config.enforcing = false,
                other => warn!(value = other, "Ignoring invalid AVC_ENFORCING"),
            }
        }
        if let Some(history) = env_override("AVC_AUDIT_HISTORY") {
            config.audit_history = history;
        }
        config
    }

    pub fn with_geometry(mut self, cache_slots: usize, max_nodes: usize) -> Self {
        self.cache_slots = cache_slots;
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_enforcing(mut self, enforcing: bool) -> Self {
        self.enforcing = enforcing;
        self
    }

    pub fn with_max_insert_retries(mut self, retries: u32) -> Self {
        self.max_insert_retries = retries;
        self
    }

    pub fn with_audit_history(mut self, audit_history: usize) -> Self {
        self.audit_history = audit_history;
        self
    }

    pub fn validate(&self) -> AvcResult<()> {
        if !self.cache_slots.is_power_of_two() {
            return Err(invalid(format!(
                "cache_slots must be a power of two, got {}",
                self.cache_slots
            )));
        }
        if self.max_nodes == 0 {
            return Err(invalid("max_nodes must be non-zero"));
        }
        if self.max_nodes > u32::MAX as usize {
            return Err(invalid(format!("max_nodes too large: {}", self.max_nodes)));
        }
        if self.max_insert_retries == 0 {
            return Err(invalid("max_insert_retries must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> AvcError {
    AvcError::InvalidConfig {
        reason: reason.into(),
    }
}

fn env_override<T: FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %value, "Ignoring unparseable configuration override");
            None
        }
    }
}
