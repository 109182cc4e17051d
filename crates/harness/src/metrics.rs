//! Prometheus metrics for the harness.
//!
//! Registers the core orchestration metrics in a process-wide registry so a
//! run can dump them once it finishes.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Scripted outcomes the simulated client started with.
pub static SCRIPTED_OUTCOMES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "demandflow_harness_scripted_outcomes",
        "Number of scripted outcomes loaded into the simulated ad client",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(SCRIPTED_OUTCOMES.clone()))
        .unwrap();

    // Core metrics (fetches, retries, runs)
    for metric in demandflow_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}
