use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
///
/// Nested keys are separated by a double underscore, e.g.
/// `DEMANDFLOW_ORCHESTRATOR__BACKOFF_MS=500`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("DEMANDFLOW_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AdSize;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[ad_unit]
config_id = "1001-1"

[orchestrator]
backoff_ms = 100
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.ad_unit.config_id, "1001-1");
        assert_eq!(config.ad_unit.size, AdSize::new(300, 250));
        assert_eq!(config.orchestrator.backoff_ms, 100);
        assert_eq!(config.orchestrator.retry_budget, 5);
    }

    #[test]
    fn test_load_config_from_str_missing_ad_unit() {
        let toml = r#"
[orchestrator]
retry_budget = 3
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/demandflow.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[ad_unit]
config_id = "1001-1"
size = "320x50"

[server]
host = "appnexus"
account_id = "bfa84af2-bd16-4d35-96ad-31c6bb888df0"

[simulation]
outcomes = [{{ kind = "success", size = "320x50" }}]
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.ad_unit.size, AdSize::new(320, 50));
        assert_eq!(config.server.host, crate::config::ServerHost::Appnexus);
        assert_eq!(config.simulation.outcomes.len(), 1);
    }

    #[test]
    fn test_load_config_env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "demandflow.toml",
                r#"
[ad_unit]
config_id = "1001-1"

[orchestrator]
backoff_ms = 3000
"#,
            )?;
            jail.set_env("DEMANDFLOW_ORCHESTRATOR__BACKOFF_MS", "250");
            jail.set_env("DEMANDFLOW_AD_UNIT__CONFIG_ID", "2002-7");

            let config = load_config(Path::new("demandflow.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.orchestrator.backoff_ms, 250);
            assert_eq!(config.orchestrator.retry_budget, 5);
            assert_eq!(config.ad_unit.config_id, "2002-7");
            Ok(())
        });
    }
}
