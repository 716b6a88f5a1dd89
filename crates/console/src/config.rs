use std::path::PathBuf;
use std::time::Duration;

use validator::Validate;

use hrdesk_core::snapshot::RelationOrder;
use hrdesk_core::ControllerOptions;

/// Configuration errors, reported before any work happens.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Console configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, Validate)]
pub struct ConsoleConfig {
    /// Base URL of the REST API (default: `http://localhost:8080/api/v1`).
    #[validate(url)]
    pub api_url: String,
    /// JSON file holding drafts between sessions (default: `.hrdesk-drafts.json`).
    #[validate(length(min = 1))]
    pub draft_file: String,
    /// Draft write debounce in milliseconds (default: `150`).
    #[validate(range(max = 60_000))]
    pub draft_debounce_ms: u64,
    /// Whether relation order counts toward dirtiness (default: `insensitive`).
    pub relation_order: RelationOrder,
    /// HTTP request timeout in seconds (default: `30`).
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,
}

impl ConsoleConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                        |
    /// |-------------------------------|--------------------------------|
    /// | `HRDESK_API_URL`              | `http://localhost:8080/api/v1` |
    /// | `HRDESK_DRAFT_FILE`           | `.hrdesk-drafts.json`          |
    /// | `HRDESK_DRAFT_DEBOUNCE_MS`    | `150`                          |
    /// | `HRDESK_RELATION_ORDER`       | `insensitive`                  |
    /// | `HRDESK_REQUEST_TIMEOUT_SECS` | `30`                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_url = var("HRDESK_API_URL", "http://localhost:8080/api/v1");
        let draft_file = var("HRDESK_DRAFT_FILE", ".hrdesk-drafts.json");
        let draft_debounce_ms = parse_u64(
            "HRDESK_DRAFT_DEBOUNCE_MS",
            var("HRDESK_DRAFT_DEBOUNCE_MS", "150"),
        )?;

        let raw_order = var("HRDESK_RELATION_ORDER", "insensitive");
        let relation_order =
            raw_order
                .parse::<RelationOrder>()
                .map_err(|reason| ConfigError::Invalid {
                    var: "HRDESK_RELATION_ORDER",
                    value: raw_order.clone(),
                    reason,
                })?;

        let request_timeout_secs = parse_u64(
            "HRDESK_REQUEST_TIMEOUT_SECS",
            var("HRDESK_REQUEST_TIMEOUT_SECS", "30"),
        )?;

        let config = Self {
            api_url,
            draft_file,
            draft_debounce_ms,
            relation_order,
            request_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn draft_path(&self) -> PathBuf {
        PathBuf::from(&self.draft_file)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            debounce: Duration::from_millis(self.draft_debounce_ms),
            relation_order: Some(self.relation_order),
        }
    }
}

fn parse_u64(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ConsoleConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/api/v1");
        assert_eq!(config.draft_file, ".hrdesk-drafts.json");
        assert_eq!(config.draft_debounce_ms, 150);
        assert_eq!(config.relation_order, RelationOrder::Insensitive);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.controller_options().debounce,
            Duration::from_millis(150)
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("HRDESK_API_URL", "https://hr.example.com/api/v1"),
            ("HRDESK_DRAFT_DEBOUNCE_MS", "400"),
            ("HRDESK_RELATION_ORDER", "Significant"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://hr.example.com/api/v1");
        assert_eq!(config.draft_debounce_ms, 400);
        assert_eq!(config.relation_order, RelationOrder::Significant);
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let err = load(&[("HRDESK_DRAFT_DEBOUNCE_MS", "soon")]).unwrap_err();
        assert_matches!(
            err,
            ConfigError::Invalid {
                var: "HRDESK_DRAFT_DEBOUNCE_MS",
                ..
            }
        );
    }

    #[test]
    fn unknown_relation_order_is_rejected() {
        let err = load(&[("HRDESK_RELATION_ORDER", "sorted")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { .. });
    }

    #[test]
    fn validation_catches_bad_url_and_timeout() {
        assert_matches!(
            load(&[("HRDESK_API_URL", "not a url")]),
            Err(ConfigError::Validation(_))
        );
        assert_matches!(
            load(&[("HRDESK_REQUEST_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Validation(_))
        );
    }
}
