//! Queue configuration.
//!
//! Values come from code (`QueueBuilder`), from serde (`QueueConfig` is
//! `Deserialize`), or from the environment:
//!
//! - `SPINDLE_CONCURRENCY`: maximum simultaneous tasks (default `1`)
//! - `SPINDLE_AUTO_START`: `true`/`false`, start admitting immediately (default `true`)

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_CONCURRENCY: &str = "SPINDLE_CONCURRENCY";
pub const ENV_AUTO_START: &str = "SPINDLE_AUTO_START";

/// Settings a queue is built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of tasks executing at once. Must be at least 1.
    pub concurrency: usize,

    /// When false the queue is built paused and waits for `start()`.
    pub auto_start: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            auto_start: true,
        }
    }
}

impl QueueConfig {
    /// Read the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup (unset keys keep defaults).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            config.concurrency = raw.trim().parse::<usize>().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: ENV_CONCURRENCY,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(raw) = lookup(ENV_AUTO_START) {
            config.auto_start = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_AUTO_START,
                value: raw.clone(),
                reason: "expected true/false".to_string(),
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
