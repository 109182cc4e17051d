mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use demandflow_core::{
    load_config,
    testing::{RecordingHostView, ScriptedAdClient},
    validate_config, AdRequestClient, Config, DemandRequestOrchestrator, FetchOutcome, LogFormat,
    RunReport, RunUpdateCallback, Stage,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code for a run that finished but failed.
const EXIT_RUN_FAILED: i32 = 1;

/// Exit code for a harness that could not run at all.
const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(report) if report.succeeded() => {}
        Ok(_) => std::process::exit(EXIT_RUN_FAILED),
        Err(e) => {
            eprintln!("Fatal error: {:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

async fn run() -> Result<RunReport> {
    // Determine config path
    let config_path = std::env::var("DEMANDFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("demandflow.toml"));

    // Load configuration
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    init_logging(config.log.format);

    info!("demand-check {} starting", VERSION);
    info!("Configuration loaded from {:?}", config_path);
    info!(
        "Ad unit {} ({}) on {:?} (endpoint: {}, account: {})",
        config.ad_unit.config_id,
        config.ad_unit.size,
        config.server.host,
        config.server.endpoint().as_deref().unwrap_or("none"),
        config.server.account_id.as_deref().unwrap_or("none")
    );

    // Create simulated ad client
    let outcomes = scripted_outcomes(&config);
    metrics::SCRIPTED_OUTCOMES.set(outcomes.len() as i64);
    let client = ScriptedAdClient::with_outcomes(outcomes)
        .with_latency(std::time::Duration::from_millis(config.simulation.latency_ms));
    info!(
        "Using {} ad client with {} scripted outcomes",
        client.name(),
        client.remaining()
    );

    let view = RecordingHostView::new();

    let update_callback: RunUpdateCallback = Arc::new(|run_id, state| {
        if state.is_terminal() {
            info!("Run {} finished: {}", run_id, state);
        } else {
            debug!("Run {} is now {}", run_id, state);
        }
    });

    let orchestrator = DemandRequestOrchestrator::new(
        config.orchestrator.clone(),
        Arc::new(client.clone()) as Arc<dyn AdRequestClient>,
    )
    .with_host_view(Arc::new(view.clone()))
    .with_update_callback(update_callback);

    let handle = orchestrator.start(config.ad_unit.request_payload());

    let report = match config.orchestrator.wait_timeout() {
        Some(timeout) => handle
            .wait_timeout(timeout)
            .await
            .with_context(|| format!("Run {} did not finish", handle.run_id()))?,
        None => handle.wait_async().await,
    };

    // The view must end up at the size the last stage resolved.
    if report.succeeded() {
        let current = view.current_size().await;
        if current != report.stage_two.creative_size {
            warn!(
                "Host view size {:?} does not match resolved creative size {:?}",
                current, report.stage_two.creative_size
            );
        }
    }

    for stage in [Stage::One, Stage::Two] {
        if let Some(summary) = report.stage(stage) {
            info!(
                "{}: {} fetches, creative {}",
                stage,
                summary.calls,
                summary
                    .creative_size
                    .map(|size| size.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
        }
    }

    if client.remaining() > 0 {
        debug!("{} scripted outcomes left unused", client.remaining());
    }

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
    println!("{}", json);

    debug!("Metrics:\n{}", metrics::encode_metrics()?);

    Ok(report)
}

/// Initialize logging on stderr, keeping stdout for the report.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Outcomes for the simulated client. Without a script both stages succeed
/// with the sizes they ask for.
fn scripted_outcomes(config: &Config) -> Vec<FetchOutcome> {
    if config.simulation.outcomes.is_empty() {
        return vec![
            FetchOutcome::loaded(config.ad_unit.size),
            FetchOutcome::loaded(config.orchestrator.escalation_size),
        ];
    }
    config
        .simulation
        .outcomes
        .iter()
        .map(FetchOutcome::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use demandflow_core::{load_config_from_str, AdSize};

    #[test]
    fn test_default_script_succeeds_both_stages() {
        let config = load_config_from_str(
            r#"
[ad_unit]
config_id = "1001-1"
"#,
        )
        .unwrap();

        assert_eq!(
            scripted_outcomes(&config),
            vec![
                FetchOutcome::loaded(AdSize::new(300, 250)),
                FetchOutcome::loaded(AdSize::new(728, 90)),
            ]
        );
    }

    #[test]
    fn test_configured_script_is_used() {
        let config = load_config_from_str(
            r#"
[ad_unit]
config_id = "1001-1"

[simulation]
outcomes = [{ kind = "failure", code = 2, message = "network" }, { kind = "missing_size" }]
"#,
        )
        .unwrap();

        assert_eq!(
            scripted_outcomes(&config),
            vec![
                FetchOutcome::failed(2, "network"),
                FetchOutcome::missing_size(),
            ]
        );
    }
}
