//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Largest accepted multiplier for the mock backend's latencies.
pub const MAX_LATENCY_SCALE: f64 = 1000.0;

/// Wizard configuration.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Directory holding the persisted session record.
    pub data_dir: PathBuf,
    /// Name of the persisted session record.
    pub storage_key: String,
    /// Quiet period after the last edit before a step is autosaved.
    pub autosave_delay: Duration,
    /// Multiplier for the mock backend's simulated latencies.
    pub api_latency_scale: f64,
    /// Probability in [0, 1] that a mock backend call fails.
    pub api_failure_rate: f64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            storage_key: "tailor-onboarding".to_string(),
            autosave_delay: Duration::from_millis(1000),
            api_latency_scale: 1.0,
            api_failure_rate: 0.0,
        }
    }
}

impl WizardConfig {
    /// Build from `ONBOARDING_*` environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = lookup("ONBOARDING_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let storage_key = lookup("ONBOARDING_STORAGE_KEY").unwrap_or(defaults.storage_key);
        let autosave_delay = parse_var::<u64>(&lookup, "ONBOARDING_AUTOSAVE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.autosave_delay);
        let api_latency_scale = parse_var::<f64>(&lookup, "ONBOARDING_API_LATENCY_SCALE")?
            .unwrap_or(defaults.api_latency_scale);
        let api_failure_rate = parse_var::<f64>(&lookup, "ONBOARDING_API_FAILURE_RATE")?
            .unwrap_or(defaults.api_failure_rate);

        if storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARDING_STORAGE_KEY".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if !(0.0..=MAX_LATENCY_SCALE).contains(&api_latency_scale) {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARDING_API_LATENCY_SCALE".to_string(),
                message: format!(
                    "expected a value between 0 and {MAX_LATENCY_SCALE}, got {api_latency_scale}"
                ),
            });
        }
        if !(0.0..=1.0).contains(&api_failure_rate) {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARDING_API_FAILURE_RATE".to_string(),
                message: format!("expected a value between 0 and 1, got {api_failure_rate}"),
            });
        }

        Ok(Self {
            data_dir,
            storage_key,
            autosave_delay,
            api_latency_scale,
            api_failure_rate,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<WizardConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WizardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage_key, "tailor-onboarding");
        assert_eq!(config.autosave_delay, Duration::from_millis(1000));
        assert_eq!(config.api_latency_scale, 1.0);
        assert_eq!(config.api_failure_rate, 0.0);
    }

    #[test]
    fn overrides_from_vars() {
        let config = config_from(&[
            ("ONBOARDING_DATA_DIR", "/tmp/wizard"),
            ("ONBOARDING_STORAGE_KEY", "shop-42"),
            ("ONBOARDING_AUTOSAVE_MS", "250"),
            ("ONBOARDING_API_LATENCY_SCALE", "0"),
            ("ONBOARDING_API_FAILURE_RATE", "0.25"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/wizard"));
        assert_eq!(config.storage_key, "shop-42");
        assert_eq!(config.autosave_delay, Duration::from_millis(250));
        assert_eq!(config.api_latency_scale, 0.0);
        assert_eq!(config.api_failure_rate, 0.25);
    }

    #[test]
    fn rejects_bad_values() {
        let err = config_from(&[("ONBOARDING_AUTOSAVE_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("ONBOARDING_AUTOSAVE_MS"));

        assert!(config_from(&[("ONBOARDING_API_FAILURE_RATE", "1.5")]).is_err());
        assert!(config_from(&[("ONBOARDING_API_LATENCY_SCALE", "-1")]).is_err());
        assert!(config_from(&[("ONBOARDING_API_LATENCY_SCALE", "1e20")]).is_err());
        assert!(config_from(&[("ONBOARDING_API_LATENCY_SCALE", "NaN")]).is_err());
        assert!(config_from(&[("ONBOARDING_API_LATENCY_SCALE", "1000")]).is_ok());
        assert!(config_from(&[("ONBOARDING_STORAGE_KEY", "  ")]).is_err());
    }
}
