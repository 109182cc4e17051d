//! Demand request orchestrator implementation.
//!
//! Drives a run through two chained demand fetches:
//! - Stage one: fetch with the configured payload, retried up to the budget
//! - Stage two: fetch again with the escalation size appended, same budget
//!
//! Completions are handled one at a time by a single driver task. Every
//! failure is followed by the backoff delay before the retry decision is made.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::request::{AdRequestClient, AdSize, FetchOutcome, HostView, RequestPayload};

use super::config::OrchestratorConfig;
use super::gate::{CompletionGate, GateError};
use super::policy::RetryPolicy;
use super::tracker::StageTransactionTracker;
use super::types::{OrchestratorError, RunReport, RunState, Stage, StageReport};

/// Callback invoked on every run state change.
pub type RunUpdateCallback = Arc<dyn Fn(Uuid, RunState) + Send + Sync>;

/// Next action for the driver after a completion has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Issue a demand fetch for the stage.
    Fetch(Stage),
    /// Both stages succeeded.
    Complete,
    /// The run cannot continue.
    Abort(OrchestratorError),
}

/// State of a single run, independent of how completions are delivered.
#[derive(Debug)]
struct RunMachine {
    policy: RetryPolicy,
    escalation_size: AdSize,
    state: RunState,
    payload: RequestPayload,
    stage_one: StageTransactionTracker,
    stage_two: StageTransactionTracker,
    stage_one_report: StageReport,
    stage_two_report: StageReport,
}

impl RunMachine {
    fn new(policy: RetryPolicy, escalation_size: AdSize, payload: RequestPayload) -> Self {
        Self {
            policy,
            escalation_size,
            state: RunState::pending(Stage::One),
            payload,
            stage_one: StageTransactionTracker::active(Stage::One),
            stage_two: StageTransactionTracker::inactive(Stage::Two),
            stage_one_report: StageReport::default(),
            stage_two_report: StageReport::default(),
        }
    }

    fn begin(&self) -> Step {
        Step::Fetch(Stage::One)
    }

    /// The stage whose completion is awaited. Stage one wins during handoff.
    fn active_stage(&self) -> Option<Stage> {
        if self.stage_one.is_active() {
            Some(Stage::One)
        } else if self.stage_two.is_active() {
            Some(Stage::Two)
        } else {
            None
        }
    }

    fn tracker_mut(&mut self, stage: Stage) -> Option<&mut StageTransactionTracker> {
        match stage {
            Stage::One => Some(&mut self.stage_one),
            Stage::Two => Some(&mut self.stage_two),
            Stage::Done => None,
        }
    }

    fn report_mut(&mut self, stage: Stage) -> Option<&mut StageReport> {
        match stage {
            Stage::One => Some(&mut self.stage_one_report),
            Stage::Two => Some(&mut self.stage_two_report),
            Stage::Done => None,
        }
    }

    fn calls(&self, stage: Stage) -> u32 {
        match stage {
            Stage::One => self.stage_one_report.calls,
            Stage::Two => self.stage_two_report.calls,
            Stage::Done => 0,
        }
    }

    /// Count a fetch about to be issued for `stage`.
    fn record_call(&mut self, stage: Stage) {
        if let Some(report) = self.report_mut(stage) {
            report.calls += 1;
        }
    }

    /// A fetch completed with a resolved creative size.
    fn on_success(&mut self, size: AdSize) -> Step {
        match self.active_stage() {
            Some(Stage::One) => {
                self.stage_one.deactivate();
                self.stage_one_report.creative_size = Some(size);
                self.payload.add_additional_size(self.escalation_size);
                self.stage_two.activate();
                let next = Stage::One.next();
                self.state = RunState::pending(next);
                Step::Fetch(next)
            }
            Some(Stage::Two) => {
                self.stage_two.deactivate();
                self.stage_two_report.creative_size = Some(size);
                self.state = RunState::Succeeded;
                Step::Complete
            }
            _ => self.abort(OrchestratorError::InconsistentState(
                "success delivered while no stage is active".to_string(),
            )),
        }
    }

    /// A fetch failed (or resolved no size) and the backoff has elapsed.
    fn on_failure(&mut self) -> Step {
        let Some(stage) = self.active_stage() else {
            return self.abort(OrchestratorError::InconsistentState(
                "failure delivered while no stage is active".to_string(),
            ));
        };

        let attempts = self.calls(stage);
        let policy = self.policy;
        let Some(tracker) = self.tracker_mut(stage) else {
            return self.abort(OrchestratorError::InconsistentState(format!(
                "no tracker for {}",
                stage
            )));
        };

        if policy.allows_retry(tracker.attempts().unwrap_or_default()) {
            match tracker.record_failure() {
                Ok(_) => {
                    self.state = RunState::retrying(stage);
                    Step::Fetch(stage)
                }
                Err(e) => self.abort(e),
            }
        } else {
            tracker.deactivate();
            self.abort(OrchestratorError::BudgetExhausted { stage, attempts })
        }
    }

    fn abort(&mut self, err: OrchestratorError) -> Step {
        self.state = RunState::Failed;
        Step::Abort(err)
    }
}

/// Handle to a started run.
pub struct RunHandle {
    run_id: Uuid,
    gate: CompletionGate<RunReport>,
    state: watch::Receiver<RunState>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current state of the run.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.gate.is_signaled()
    }

    /// The gate signaled with the final report.
    pub fn gate(&self) -> &CompletionGate<RunReport> {
        &self.gate
    }

    /// Block the current thread until the run finishes.
    ///
    /// See [`CompletionGate::wait`] for the restrictions on calling context.
    pub fn wait(&self) -> RunReport {
        self.gate.wait()
    }

    pub async fn wait_async(&self) -> RunReport {
        self.gate.wait_async().await
    }

    pub async fn wait_timeout(&self, timeout: std::time::Duration) -> Result<RunReport, GateError> {
        self.gate.wait_timeout(timeout).await
    }
}

/// The demand request orchestrator - runs the two-stage fetch sequence.
pub struct DemandRequestOrchestrator {
    config: OrchestratorConfig,
    client: Arc<dyn AdRequestClient>,
    host_view: Option<Arc<dyn HostView>>,
    on_update: Option<RunUpdateCallback>,
}

impl DemandRequestOrchestrator {
    /// Create a new orchestrator.
    pub fn new(config: OrchestratorConfig, client: Arc<dyn AdRequestClient>) -> Self {
        Self {
            config,
            client,
            host_view: None,
            on_update: None,
        }
    }

    /// Resize `view` whenever a stage resolves a creative size.
    pub fn with_host_view(mut self, view: Arc<dyn HostView>) -> Self {
        self.host_view = Some(view);
        self
    }

    /// Observe run state changes.
    pub fn with_update_callback(mut self, callback: RunUpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start a run for `payload` (spawns the driver task).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, payload: RequestPayload) -> RunHandle {
        let run_id = Uuid::new_v4();
        let gate = CompletionGate::new();
        let (state_tx, state_rx) = watch::channel(RunState::pending(Stage::One));

        info!(
            "Starting run {} for config {} via {} (budget {}, backoff {}ms)",
            run_id,
            payload.config_id,
            self.client.name(),
            self.config.retry_budget,
            self.config.backoff_ms
        );

        let driver = RunDriver {
            run_id,
            config: self.config.clone(),
            client: Arc::clone(&self.client),
            host_view: self.host_view.clone(),
            on_update: self.on_update.clone(),
            machine: RunMachine::new(
                self.config.retry_policy(),
                self.config.escalation_size,
                payload,
            ),
            gate: gate.clone(),
            state_tx,
            started_at: Utc::now(),
            started: Instant::now(),
        };
        tokio::spawn(driver.run());

        RunHandle {
            run_id,
            gate,
            state: state_rx,
        }
    }

    /// Start a run and wait for it to finish.
    pub async fn run(&self, payload: RequestPayload) -> Result<RunReport, OrchestratorError> {
        self.start(payload).wait_async().await.into_result()
    }
}

/// Driver task owning one run.
struct RunDriver {
    run_id: Uuid,
    config: OrchestratorConfig,
    client: Arc<dyn AdRequestClient>,
    host_view: Option<Arc<dyn HostView>>,
    on_update: Option<RunUpdateCallback>,
    machine: RunMachine,
    gate: CompletionGate<RunReport>,
    state_tx: watch::Sender<RunState>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl RunDriver {
    async fn run(mut self) {
        self.notify(self.machine.state);
        let mut step = self.machine.begin();
        loop {
            self.publish_state();
            match step {
                Step::Fetch(stage) => {
                    let completion = self.issue(stage);
                    step = match completion.await {
                        Ok(outcome) => self.handle_outcome(stage, outcome).await,
                        Err(_) => self.machine.abort(OrchestratorError::InconsistentState(
                            format!("{} completion callback dropped without being called", stage),
                        )),
                    };
                }
                Step::Complete => {
                    self.finish(None);
                    return;
                }
                Step::Abort(err) => {
                    self.finish(Some(err));
                    return;
                }
            }
        }
    }

    /// Issue a fetch for `stage`, returning the receiver its completion lands on.
    fn issue(&mut self, stage: Stage) -> oneshot::Receiver<FetchOutcome> {
        self.machine.record_call(stage);
        let payload = self.machine.payload.clone();
        debug!(
            "Run {}: issuing {} fetch #{} (sizes: {:?})",
            self.run_id,
            stage,
            self.machine.calls(stage),
            payload.sizes().map(|s| s.to_string()).collect::<Vec<_>>()
        );

        let (tx, rx) = oneshot::channel();
        self.client.fetch(
            payload,
            Box::new(move |outcome| {
                // Receiver is gone only if the driver task was dropped.
                let _ = tx.send(outcome);
            }),
        );
        rx
    }

    async fn handle_outcome(&mut self, stage: Stage, outcome: FetchOutcome) -> Step {
        metrics::FETCH_ATTEMPTS
            .with_label_values(&[stage.label(), outcome.label()])
            .inc();

        match outcome {
            FetchOutcome::Success(Some(size)) => {
                info!("Run {}: {} loaded creative {}", self.run_id, stage, size);
                let step = self.machine.on_success(size);
                if matches!(step, Step::Fetch(_) | Step::Complete) {
                    if let Some(view) = &self.host_view {
                        view.resize(size).await;
                    }
                }
                if step == Step::Fetch(Stage::Two) {
                    info!(
                        "Run {}: escalating to {} with additional size {}",
                        self.run_id, Stage::Two, self.config.escalation_size
                    );
                }
                step
            }
            FetchOutcome::Success(None) => {
                warn!(
                    "Run {}: {} loaded but no creative size was resolved",
                    self.run_id, stage
                );
                self.handle_failure(stage).await
            }
            FetchOutcome::Failure(failure) => {
                warn!("Run {}: {} fetch failed: {}", self.run_id, stage, failure);
                self.handle_failure(stage).await
            }
        }
    }

    async fn handle_failure(&mut self, stage: Stage) -> Step {
        tokio::time::sleep(self.config.backoff()).await;

        let step = self.machine.on_failure();
        if let Step::Fetch(retry_stage) = &step {
            metrics::FETCH_RETRIES
                .with_label_values(&[retry_stage.label()])
                .inc();
            info!(
                "Run {}: retrying {} (attempt {} of {})",
                self.run_id,
                retry_stage,
                self.machine.calls(*retry_stage) + 1,
                self.machine.policy.max_attempts()
            );
        } else {
            debug!("Run {}: no retry left for {}", self.run_id, stage);
        }
        step
    }

    fn publish_state(&self) {
        let state = self.machine.state;
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            debug!("Run {} -> {}", self.run_id, state);
            self.notify(state);
        }
    }

    fn notify(&self, state: RunState) {
        if let Some(callback) = &self.on_update {
            callback(self.run_id, state);
        }
    }

    fn finish(&mut self, error: Option<OrchestratorError>) {
        self.publish_state();

        let report = RunReport {
            run_id: self.run_id,
            state: self.machine.state,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stage_one: self.machine.stage_one_report.clone(),
            stage_two: self.machine.stage_two_report.clone(),
            payload: self.machine.payload.clone(),
            error,
        };

        let outcome = report.state.as_str();
        metrics::RUNS_TOTAL.with_label_values(&[outcome]).inc();
        metrics::RUN_DURATION
            .with_label_values(&[outcome])
            .observe(self.started.elapsed().as_secs_f64());

        match &report.error {
            None => info!(
                "Run {} succeeded after {} fetches",
                self.run_id,
                report.total_calls()
            ),
            Some(err) => error!("Run {} failed: {}", self.run_id, err),
        }

        if !self.gate.signal(report) {
            warn!("Run {}: completion gate was already signaled", self.run_id);
        }
    }
}
