use serde::{Deserialize, Serialize};

use crate::orchestrator::OrchestratorConfig;
use crate::request::{AdSize, FetchOutcome, RequestPayload};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub ad_unit: AdUnitConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Ad unit the demand requests are issued for
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdUnitConfig {
    /// Stored request id on the demand server
    pub config_id: String,
    /// Primary creative size (default: 300x250)
    #[serde(default = "default_ad_size")]
    pub size: AdSize,
}

fn default_ad_size() -> AdSize {
    AdSize::new(300, 250)
}

impl AdUnitConfig {
    /// Build the initial request payload for this ad unit.
    pub fn request_payload(&self) -> RequestPayload {
        RequestPayload::new(self.config_id.clone(), self.size)
    }
}

/// Demand server configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub host: ServerHost,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Auction endpoint (required when host = "custom")
    #[serde(default)]
    pub url: Option<String>,
}

impl ServerConfig {
    /// Auction endpoint, explicit URL first.
    pub fn endpoint(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.host.default_url().map(str::to_string))
    }
}

/// Known demand server hosts
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServerHost {
    #[default]
    Rubicon,
    Appnexus,
    Custom,
}

impl ServerHost {
    pub fn default_url(&self) -> Option<&'static str> {
        match self {
            ServerHost::Rubicon => Some("https://prebid-server.rubiconproject.com/openrtb2/auction"),
            ServerHost::Appnexus => Some("https://prebid.adnxs.com/pbs/v1/openrtb2/auction"),
            ServerHost::Custom => None,
        }
    }
}

/// Scripted behavior for the simulated ad client
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Outcomes replayed in order, one per demand fetch
    #[serde(default)]
    pub outcomes: Vec<ScriptedOutcome>,
    /// Delay before each completion is delivered (milliseconds)
    #[serde(default)]
    pub latency_ms: u64,
}

/// One scripted demand fetch outcome
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedOutcome {
    Success {
        size: AdSize,
    },
    MissingSize,
    Failure {
        #[serde(default)]
        code: i32,
        #[serde(default = "default_failure_message")]
        message: String,
    },
}

fn default_failure_message() -> String {
    "ad failed to load".to_string()
}

impl From<&ScriptedOutcome> for FetchOutcome {
    fn from(outcome: &ScriptedOutcome) -> Self {
        match outcome {
            ScriptedOutcome::Success { size } => FetchOutcome::loaded(*size),
            ScriptedOutcome::MissingSize => FetchOutcome::missing_size(),
            ScriptedOutcome::Failure { code, message } => {
                FetchOutcome::failed(*code, message.clone())
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
