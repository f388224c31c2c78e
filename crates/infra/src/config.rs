//! Configuration loading and representation.
//!
//! Every setting has a default and an environment override. Invalid values
//! are logged and ignored rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use brewery_catalog::ExpiryPolicy;
use brewery_inventory::StatusClassifier;

use crate::jobs::MAX_SWEEP_INTERVAL;
use crate::ledger::DEFAULT_MAX_CONFLICT_RETRIES;

pub const ENV_LOW_STOCK_THRESHOLD: &str = "BREWERY_LOW_STOCK_THRESHOLD";
pub const ENV_MAX_CONFLICT_RETRIES: &str = "BREWERY_MAX_CONFLICT_RETRIES";
pub const ENV_EXPIRY_WARNING_DAYS: &str = "BREWERY_EXPIRY_WARNING_DAYS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "BREWERY_SWEEP_INTERVAL_SECS";

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreweryConfig {
    /// Quantities at or below this (and above zero) are `Low`.
    pub low_stock_threshold: u32,
    /// Save attempts per ledger operation before a conflict is surfaced.
    pub max_conflict_retries: u32,
    pub expiry_warning_days: u32,
    pub sweep_interval: Duration,
}

impl Default for BreweryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: StatusClassifier::DEFAULT_LOW_STOCK_THRESHOLD,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            expiry_warning_days: ExpiryPolicy::DEFAULT_WARNING_WINDOW_DAYS,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl BreweryConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup` (`None` = unset).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let max_conflict_retries =
            parse_or(&lookup, ENV_MAX_CONFLICT_RETRIES, defaults.max_conflict_retries);
        let max_conflict_retries = if max_conflict_retries == 0 {
            warn!(key = ENV_MAX_CONFLICT_RETRIES, "must be at least 1; using default");
            defaults.max_conflict_retries
        } else {
            max_conflict_retries
        };

        let sweep_secs = parse_or(
            &lookup,
            ENV_SWEEP_INTERVAL_SECS,
            defaults.sweep_interval.as_secs(),
        );
        let sweep_interval = if sweep_secs == 0 || sweep_secs > MAX_SWEEP_INTERVAL.as_secs() {
            warn!(
                key = ENV_SWEEP_INTERVAL_SECS,
                value = sweep_secs,
                max = MAX_SWEEP_INTERVAL.as_secs(),
                "out of range; using default"
            );
            defaults.sweep_interval
        } else {
            Duration::from_secs(sweep_secs)
        };

        Self {
            low_stock_threshold: parse_or(
                &lookup,
                ENV_LOW_STOCK_THRESHOLD,
                defaults.low_stock_threshold,
            ),
            max_conflict_retries,
            expiry_warning_days: parse_or(
                &lookup,
                ENV_EXPIRY_WARNING_DAYS,
                defaults.expiry_warning_days,
            ),
            sweep_interval,
        }
    }

    pub fn classifier(&self) -> StatusClassifier {
        StatusClassifier::new(self.low_stock_threshold)
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.expiry_warning_days)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, default = ?default, "invalid config value; using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = BreweryConfig::from_lookup(|_| None);
        assert_eq!(config, BreweryConfig::default());
        assert_eq!(config.low_stock_threshold, 10);
        assert_eq!(config.max_conflict_retries, 16);
        assert_eq!(config.expiry_warning_days, 7);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = BreweryConfig::from_lookup(lookup_from(&[
            (ENV_LOW_STOCK_THRESHOLD, "25"),
            (ENV_MAX_CONFLICT_RETRIES, " 4 "),
            (ENV_EXPIRY_WARNING_DAYS, "14"),
            (ENV_SWEEP_INTERVAL_SECS, "60"),
        ]));

        assert_eq!(config.low_stock_threshold, 25);
        assert_eq!(config.max_conflict_retries, 4);
        assert_eq!(config.expiry_warning_days, 14);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.classifier(), StatusClassifier::new(25));
        assert_eq!(config.expiry_policy().warning_window_days(), 14);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = BreweryConfig::from_lookup(lookup_from(&[
            (ENV_LOW_STOCK_THRESHOLD, "-3"),
            (ENV_MAX_CONFLICT_RETRIES, "0"),
            (ENV_EXPIRY_WARNING_DAYS, "a week"),
            (ENV_SWEEP_INTERVAL_SECS, "0"),
        ]));
        assert_eq!(config, BreweryConfig::default());
    }

    #[test]
    fn sweep_interval_beyond_the_runner_limit_falls_back() {
        let max = MAX_SWEEP_INTERVAL.as_secs().to_string();
        let huge = u64::MAX.to_string();

        let config =
            BreweryConfig::from_lookup(lookup_from(&[(ENV_SWEEP_INTERVAL_SECS, huge.as_str())]));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));

        let config =
            BreweryConfig::from_lookup(lookup_from(&[(ENV_SWEEP_INTERVAL_SECS, max.as_str())]));
        assert_eq!(config.sweep_interval, MAX_SWEEP_INTERVAL);
    }
}
