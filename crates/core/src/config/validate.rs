use super::{
    types::{Config, ServerHost},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Ad unit has a config id and a non-empty size
/// - Retry budget allows at least one attempt
/// - Escalation size is non-empty
/// - Custom server hosts come with a URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.ad_unit.config_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "ad_unit.config_id cannot be empty".to_string(),
        ));
    }

    if config.ad_unit.size.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "ad_unit.size cannot be {}",
            config.ad_unit.size
        )));
    }

    if config.orchestrator.retry_budget == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.retry_budget cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.escalation_size.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "orchestrator.escalation_size cannot be {}",
            config.orchestrator.escalation_size
        )));
    }

    if config.server.host == ServerHost::Custom && config.server.url.is_none() {
        return Err(ConfigError::ValidationError(
            "server.url must be set when host is custom".to_string(),
        ));
    }

    Ok(())
}
