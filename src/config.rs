//! Runtime settings read from the environment.
//!
//! Every variable is optional. Invalid values log a warning and fall back to
//! the default rather than failing startup.

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use tracing::warn;

use crate::llm::provider::{ModelSet, OPENROUTER_BASE_URL};

/// Hosted completion key.
pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
/// Hosted completion endpoint override.
pub const BASE_URL_ENV_VAR: &str = "GITLOG_BASE_URL";
/// Per-call completion timeout, in seconds.
pub const TIMEOUT_ENV_VAR: &str = "GITLOG_COMPLETION_TIMEOUT";
/// Generation cache lifetime, in seconds.
pub const CACHE_TTL_ENV_VAR: &str = "GITLOG_CACHE_TTL";
/// Generation cache capacity, in entries.
pub const CACHE_CAPACITY_ENV_VAR: &str = "GITLOG_CACHE_CAPACITY";
pub const SMART_MODEL_ENV_VAR: &str = "GITLOG_SMART_MODEL";
pub const FAST_MODEL_ENV_VAR: &str = "GITLOG_FAST_MODEL";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 10 * 60;
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Everything the library needs to talk to the hosted completion service
/// and size its cache.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub completion_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: NonZeroUsize,
    pub models: ModelSet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENROUTER_BASE_URL.to_string(),
            completion_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            models: ModelSet::default(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        let cache_capacity = match read_u64(CACHE_CAPACITY_ENV_VAR, DEFAULT_CACHE_CAPACITY as u64) {
            0 => {
                warn!(
                    "{} must be at least 1, using default {}",
                    CACHE_CAPACITY_ENV_VAR, DEFAULT_CACHE_CAPACITY
                );
                defaults.cache_capacity
            }
            n => NonZeroUsize::new(n as usize).unwrap_or(defaults.cache_capacity),
        };

        Self {
            api_key: read_string(API_KEY_ENV_VAR),
            base_url: read_string(BASE_URL_ENV_VAR)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            completion_timeout: Duration::from_secs(read_u64(TIMEOUT_ENV_VAR, DEFAULT_TIMEOUT_SECS)),
            cache_ttl: Duration::from_secs(read_u64(CACHE_TTL_ENV_VAR, DEFAULT_CACHE_TTL_SECS)),
            cache_capacity,
            models: ModelSet {
                fast: read_string(FAST_MODEL_ENV_VAR).unwrap_or(defaults.models.fast),
                smart: read_string(SMART_MODEL_ENV_VAR).unwrap_or(defaults.models.smart),
            },
        }
    }
}

fn read_string(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Read a non-negative integer, warning when the value is present but invalid.
fn read_u64(var: &str, default: u64) -> u64 {
    match env::var(var) {
        Ok(v) if !v.is_empty() => match v.trim().parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                warn!("Invalid {} value '{}', using default {}", var, v, default);
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        temp_env::with_vars_unset(
            [TIMEOUT_ENV_VAR, CACHE_TTL_ENV_VAR, CACHE_CAPACITY_ENV_VAR, BASE_URL_ENV_VAR],
            || {
                let settings = Settings::from_env();
                assert_eq!(settings.completion_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
                assert_eq!(settings.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
                assert_eq!(settings.cache_capacity.get(), DEFAULT_CACHE_CAPACITY);
                assert_eq!(settings.base_url, OPENROUTER_BASE_URL);
            },
        );
    }

    #[test]
    #[serial]
    fn test_valid_values_are_read() {
        temp_env::with_vars(
            [
                (TIMEOUT_ENV_VAR, Some("15")),
                (CACHE_TTL_ENV_VAR, Some("30")),
                (CACHE_CAPACITY_ENV_VAR, Some("7")),
                (BASE_URL_ENV_VAR, Some("http://localhost:8080/v1/")),
            ],
            || {
                let settings = Settings::from_env();
                assert_eq!(settings.completion_timeout, Duration::from_secs(15));
                assert_eq!(settings.cache_ttl, Duration::from_secs(30));
                assert_eq!(settings.cache_capacity.get(), 7);
                assert_eq!(settings.base_url, "http://localhost:8080/v1");
            },
        );
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        temp_env::with_vars(
            [
                (TIMEOUT_ENV_VAR, Some("soon")),
                (CACHE_TTL_ENV_VAR, Some("-5")),
                (CACHE_CAPACITY_ENV_VAR, Some("0")),
            ],
            || {
                let settings = Settings::from_env();
                assert_eq!(settings.completion_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
                assert_eq!(settings.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
                assert_eq!(settings.cache_capacity.get(), DEFAULT_CACHE_CAPACITY);
            },
        );
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_ignored() {
        temp_env::with_var(API_KEY_ENV_VAR, Some("   "), || {
            assert!(Settings::from_env().api_key.is_none());
        });
    }
}
