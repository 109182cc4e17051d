pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod request;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, AdUnitConfig, Config, ConfigError,
    LogConfig, LogFormat, ScriptedOutcome, ServerConfig, ServerHost, SimulationConfig,
};
pub use orchestrator::{
    should_retry, CompletionGate, DemandRequestOrchestrator, GateError, OrchestratorConfig,
    OrchestratorError, RetryPolicy, RunHandle, RunReport, RunState, RunUpdateCallback, Stage,
    StageReport, StageTransactionTracker, DEFAULT_RETRY_BUDGET,
};
pub use request::{
    AdRequestClient, AdSize, FetchCallback, FetchFailure, FetchOutcome, HostView,
    ParseAdSizeError, RequestPayload,
};
