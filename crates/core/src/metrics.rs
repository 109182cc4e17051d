//! Prometheus metrics for the orchestrator.
//!
//! This module provides metrics for:
//! - Demand fetches (attempts per stage and outcome, retries)
//! - Orchestration runs (terminal outcome, duration)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Demand fetch metrics
// =============================================================================

/// Demand fetch completions by stage and outcome.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "demandflow_fetch_attempts_total",
            "Total demand fetch completions",
        ),
        &["stage", "result"], // "success", "missing_size", "failure"
    )
    .unwrap()
});

/// Demand fetches reissued after a failure.
pub static FETCH_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "demandflow_fetch_retries_total",
            "Total demand fetches reissued after a failure",
        ),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Run metrics
// =============================================================================

/// Orchestration runs by terminal outcome.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("demandflow_runs_total", "Total orchestration runs"),
        &["outcome"], // "succeeded", "failed"
    )
    .unwrap()
});

/// Run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "demandflow_run_duration_seconds",
            "Duration of orchestration runs",
        )
        .buckets(vec![0.1, 0.5, 1.0, 3.0, 6.0, 15.0, 30.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(FETCH_RETRIES.clone()),
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
    ]
}
