// Service configuration read from the environment.
//
// Responsibilities
// - Collect every tunable in one typed struct at startup.
// - Fail fast on missing required variables or unparsable numbers.

use crate::modules::catalog::use_cases::run_catalog_sync::handler::SyncSettings;
use crate::shared::infrastructure::retry_policy::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosApiConfig {
    pub base_url: String,
    pub token: String,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub pos_api: PosApiConfig,
    pub sync: SyncSettings,
}

const DEFAULT_POS_API_BASE_URL: &str = "https://connect.squareup.com";
const DEFAULT_POS_API_VERSION: &str = "2024-10-17";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = SyncSettings::default();
        let retry = RetryPolicy {
            max_attempts: env.parse_or("SYNC_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            base_delay: Duration::from_millis(
                env.parse_or("SYNC_BACKOFF_BASE_MS", defaults.retry.base_delay.as_millis() as u64)?,
            ),
            max_delay: Duration::from_millis(
                env.parse_or("SYNC_BACKOFF_MAX_MS", defaults.retry.max_delay.as_millis() as u64)?,
            ),
            rate_limit_cooldown: Duration::from_millis(env.parse_or(
                "SYNC_RATE_LIMIT_COOLDOWN_MS",
                defaults.retry.rate_limit_cooldown.as_millis() as u64,
            )?),
            page_timeout: Duration::from_secs(
                env.parse_or("SYNC_PAGE_TIMEOUT_SECS", defaults.retry.page_timeout.as_secs())?,
            ),
        };

        Ok(Self {
            database_url: env.required("DATABASE_URL")?,
            database_max_connections: env.parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: env.or("BIND_ADDR", "0.0.0.0:8080"),
            pos_api: PosApiConfig {
                base_url: env.or("POS_API_BASE_URL", DEFAULT_POS_API_BASE_URL),
                token: env.required("POS_API_TOKEN")?,
                api_version: env.or("POS_API_VERSION", DEFAULT_POS_API_VERSION),
            },
            sync: SyncSettings {
                page_size: env.parse_or("SYNC_PAGE_SIZE", defaults.page_size)?,
                retry,
                cursor_overlap: env.seconds_or("SYNC_CURSOR_OVERLAP_SECS", defaults.cursor_overlap)?,
                lease_ttl: env.seconds_or("SYNC_LEASE_TTL_SECS", defaults.lease_ttl)?,
            },
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }

    /// Whole, non-negative seconds that fit a `chrono::Duration`.
    fn seconds_or(
        &self,
        name: &'static str,
        default: chrono::Duration,
    ) -> Result<chrono::Duration, ConfigError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let secs = value.trim().parse::<i64>().ok().filter(|secs| *secs >= 0);
        secs.and_then(chrono::Duration::try_seconds)
            .ok_or(ConfigError::Invalid { name, value })
    }
}

#[cfg(test)]
mod app_config_tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;

    #[fixture]
    fn before_each() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("POS_API_TOKEN", "sq0-test"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[rstest]
    fn it_should_fill_defaults_around_the_required_variables(
        before_each: HashMap<&'static str, &'static str>,
    ) {
        let config = load(&before_each).expect("config failed");
        assert_eq!(config.database_url, "postgres://localhost/catalog");
        assert_eq!(config.pos_api.token, "sq0-test");
        assert_eq!(config.pos_api.base_url, DEFAULT_POS_API_BASE_URL);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.sync, SyncSettings::default());
    }

    #[rstest]
    fn it_should_read_sync_tunables(mut before_each: HashMap<&'static str, &'static str>) {
        before_each.insert("SYNC_PAGE_SIZE", "250");
        before_each.insert("SYNC_BACKOFF_BASE_MS", "20");
        before_each.insert("SYNC_RATE_LIMIT_COOLDOWN_MS", "7000");
        before_each.insert("SYNC_CURSOR_OVERLAP_SECS", "300");
        let config = load(&before_each).expect("config failed");
        assert_eq!(config.sync.page_size, 250);
        assert_eq!(config.sync.retry.base_delay, Duration::from_millis(20));
        assert_eq!(config.sync.retry.rate_limit_cooldown, Duration::from_secs(7));
        assert_eq!(config.sync.cursor_overlap, chrono::Duration::minutes(5));
    }

    #[rstest]
    #[case("DATABASE_URL")]
    #[case("POS_API_TOKEN")]
    fn it_should_fail_without_a_required_variable(
        mut before_each: HashMap<&'static str, &'static str>,
        #[case] name: &'static str,
    ) {
        before_each.remove(name);
        assert_eq!(load(&before_each).unwrap_err(), ConfigError::Missing(name));
    }

    #[rstest]
    fn it_should_fail_on_an_unparsable_number(mut before_each: HashMap<&'static str, &'static str>) {
        before_each.insert("SYNC_MAX_ATTEMPTS", "many");
        assert_eq!(
            load(&before_each).unwrap_err(),
            ConfigError::Invalid {
                name: "SYNC_MAX_ATTEMPTS",
                value: "many".into()
            }
        );
    }

    #[rstest]
    #[case("SYNC_LEASE_TTL_SECS", "-30")]
    #[case("SYNC_LEASE_TTL_SECS", "9223372036854775807")]
    #[case("SYNC_CURSOR_OVERLAP_SECS", "-1")]
    #[case("SYNC_CURSOR_OVERLAP_SECS", "1.5")]
    fn it_should_reject_durations_out_of_range(
        mut before_each: HashMap<&'static str, &'static str>,
        #[case] name: &'static str,
        #[case] value: &'static str,
    ) {
        before_each.insert(name, value);
        assert_eq!(
            load(&before_each).unwrap_err(),
            ConfigError::Invalid {
                name,
                value: value.into()
            }
        );
    }
}
