//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::policy::{RetryPolicy, DEFAULT_RETRY_BUDGET};
use crate::request::AdSize;

/// Configuration for the demand request orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of fetch attempts per stage.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Delay after every failed attempt, before deciding whether to retry
    /// (milliseconds).
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Size appended to the request between the first and second stage.
    #[serde(default = "default_escalation_size")]
    pub escalation_size: AdSize,

    /// Upper bound on how long a caller waits for the run to finish
    /// (milliseconds). Waits forever when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout_ms: Option<u64>,
}

fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

fn default_backoff_ms() -> u64 {
    3000 // 3 seconds
}

fn default_escalation_size() -> AdSize {
    AdSize::new(728, 90)
}

impl OrchestratorConfig {
    /// Backoff delay as a `Duration`.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Retry policy derived from the configured budget.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_budget)
    }

    /// Wait timeout as a `Duration`, if configured.
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            backoff_ms: default_backoff_ms(),
            escalation_size: default_escalation_size(),
            wait_timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.retry_budget, 5);
        assert_eq!(config.backoff_ms, 3000);
        assert_eq!(config.escalation_size, AdSize::new(728, 90));
        assert_eq!(config.wait_timeout(), None);
        assert_eq!(config.backoff(), Duration::from_secs(3));
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            retry_budget = 3
            backoff_ms = 250
            escalation_size = "320x50"
            wait_timeout_ms = 60000
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.retry_budget, 3);
        assert_eq!(config.backoff(), Duration::from_millis(250));
        assert_eq!(config.escalation_size, AdSize::new(320, 50));
        assert_eq!(config.wait_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.retry_policy().budget(), 3);
    }

    #[test]
    fn test_deserialize_invalid_escalation_size() {
        let result: Result<OrchestratorConfig, _> = toml::from_str(r#"escalation_size = "wide""#);
        assert!(result.is_err());
    }
}
