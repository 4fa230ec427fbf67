//! Runtime configuration, read from `LERA_*` environment variables.

use std::time::Duration;

use thiserror::Error;

pub const PER_ORDER_CAP_VAR: &str = "LERA_PER_ORDER_CAP";
pub const RESERVE_TIMEOUT_VAR: &str = "LERA_RESERVE_TIMEOUT_MS";
pub const REQUIRE_TERMS_VAR: &str = "LERA_REQUIRE_TERMS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Checkout settings shared by every buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum units of a single tier per order.
    pub per_order_cap: u32,
    /// Bound on waiting for the inventory writer lock.
    pub reserve_timeout: Duration,
    /// Whether the buyer must accept the terms of sale before committing.
    pub require_terms: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            per_order_cap: 10,
            reserve_timeout: Duration::from_secs(5),
            require_terms: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(PER_ORDER_CAP_VAR) {
            config.per_order_cap = parse_number(PER_ORDER_CAP_VAR, &value)? as u32;
            if config.per_order_cap == 0 {
                return Err(ConfigError::Zero(PER_ORDER_CAP_VAR));
            }
        }

        if let Some(value) = lookup(RESERVE_TIMEOUT_VAR) {
            let millis = parse_number(RESERVE_TIMEOUT_VAR, &value)?;
            if millis == 0 {
                return Err(ConfigError::Zero(RESERVE_TIMEOUT_VAR));
            }
            config.reserve_timeout = Duration::from_millis(millis);
        }

        if let Some(value) = lookup(REQUIRE_TERMS_VAR) {
            config.require_terms = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: REQUIRE_TERMS_VAR,
                        value,
                    });
                }
            };
        }

        Ok(config)
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    let parsed: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })?;
    if key == PER_ORDER_CAP_VAR && parsed > u64::from(u32::MAX) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}
