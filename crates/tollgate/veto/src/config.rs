//! Dynamic configuration
//!
//! Policies read their tunables on every check so operators can change
//! them without a restart. Keys are dotted paths such as
//! `veto.unhappy.max-diff-count`.

use crate::error::{Result, VetoError};
use chrono::Duration;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tollgate_types::parse_iso8601_duration;
use tracing::warn;

/// Key holding the diff count above which an unhappy resource is held back
pub const MAX_DIFF_COUNT_KEY: &str = "veto.unhappy.max-diff-count";

/// Key holding the ISO-8601 duration between rechecks of an unhappy resource
pub const WAITING_TIME_KEY: &str = "veto.unhappy.waiting-time";

/// Source of runtime-tunable settings
pub trait DynamicConfigService: Send + Sync {
    /// Raw value for `key`, if set
    fn get_value(&self, key: &str) -> Option<Value>;
}

/// Typed lookup with a fallback
///
/// A value that is present but cannot be read as `T` is logged and
/// replaced by `default`.
pub fn get_config<T: DeserializeOwned>(
    service: &dyn DynamicConfigService,
    key: &str,
    default: T,
) -> T {
    match service.get_value(key) {
        Some(value) => match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(key, error = %e, "Ignoring malformed config value");
                default
            }
        },
        None => default,
    }
}

/// Typed lookup of an ISO-8601 duration with a fallback
pub fn get_duration_config(
    service: &dyn DynamicConfigService,
    key: &str,
    default: Duration,
) -> Duration {
    let Some(raw) = get_config::<Option<String>>(service, key, None) else {
        return default;
    };
    match parse_iso8601_duration(&raw) {
        Ok(duration) => duration,
        Err(e) => {
            warn!(key, error = %e, "Ignoring malformed duration");
            default
        }
    }
}

/// Settings held in memory
///
/// Nested TOML tables are flattened into dotted keys, so
///
/// ```toml
/// [veto.unhappy]
/// max-diff-count = 5
/// ```
///
/// is readable as `veto.unhappy.max-diff-count`.
#[derive(Debug, Default)]
pub struct StaticConfigService {
    values: DashMap<String, Value>,
}

impl StaticConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous one
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.values.remove(key);
    }

    /// All keys currently set, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Load settings from a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(contents).map_err(|e| VetoError::Configuration(e.to_string()))?;
        let json = serde_json::to_value(table)
            .map_err(|e| VetoError::Configuration(e.to_string()))?;

        let service = Self::new();
        service.merge_flattened("", json);
        Ok(service)
    }

    /// Load settings from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            VetoError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    fn merge_flattened(&self, prefix: &str, value: Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key
                    } else {
                        format!("{prefix}.{key}")
                    };
                    self.merge_flattened(&path, child);
                }
            }
            leaf => {
                self.values.insert(prefix.to_string(), leaf);
            }
        }
    }
}

impl DynamicConfigService for StaticConfigService {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.clone())
    }
}

/// Defaults for [`crate::UnhappyVeto`] when the dynamic keys are unset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnhappyVetoConfig {
    /// Diff count up to which an unhappy resource is still allowed
    pub max_diff_count: u32,

    /// Time between rechecks once a resource is held back
    pub waiting_time: Duration,
}

impl Default for UnhappyVetoConfig {
    fn default() -> Self {
        Self {
            max_diff_count: 5,
            waiting_time: Duration::minutes(10),
        }
    }
}

impl UnhappyVetoConfig {
    /// Current values, falling back to `self` for anything unset
    ///
    /// A waiting time must be positive; anything else is logged and
    /// replaced by `self.waiting_time`.
    pub fn resolve(&self, service: &dyn DynamicConfigService) -> Self {
        let mut waiting_time = get_duration_config(service, WAITING_TIME_KEY, self.waiting_time);
        if waiting_time <= Duration::zero() {
            warn!(
                key = WAITING_TIME_KEY,
                waiting_time = %waiting_time,
                "Ignoring non-positive waiting time"
            );
            waiting_time = self.waiting_time;
        }
        Self {
            max_diff_count: get_config(service, MAX_DIFF_COUNT_KEY, self.max_diff_count),
            waiting_time,
        }
    }
}
