//! Scripted ad request client for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::request::{AdRequestClient, FetchCallback, FetchOutcome, RequestPayload};

/// A recorded demand fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    /// The payload the fetch was issued with.
    pub payload: RequestPayload,
    /// When the fetch was issued.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ScriptState {
    outcomes: VecDeque<FetchOutcome>,
    fetches: Vec<RecordedFetch>,
    drop_callbacks: bool,
}

/// Ad request client that replays a script of outcomes.
///
/// Each `fetch` pops the next scripted outcome and delivers it on a spawned
/// Tokio task, optionally after a fixed latency. Once the script runs out,
/// every fetch fails.
///
/// # Example
///
/// ```rust,ignore
/// let client = ScriptedAdClient::new();
/// client.push(FetchOutcome::failed(3, "no fill"));
/// client.push(FetchOutcome::loaded(AdSize::new(300, 250)));
///
/// // ... run the orchestrator ...
///
/// assert_eq!(client.fetch_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedAdClient {
    state: Arc<Mutex<ScriptState>>,
    latency: Duration,
}

impl Default for ScriptedAdClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAdClient {
    /// Create a client with an empty script.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState::default())),
            latency: Duration::ZERO,
        }
    }

    /// Create a client that replays `outcomes` in order.
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = FetchOutcome>) -> Self {
        let client = Self::new();
        client.lock().outcomes.extend(outcomes);
        client
    }

    /// Delay every completion by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Append an outcome to the script.
    pub fn push(&self, outcome: FetchOutcome) {
        self.lock().outcomes.push_back(outcome);
    }

    /// Append `count` copies of `outcome` to the script.
    pub fn push_repeated(&self, outcome: FetchOutcome, count: usize) {
        let mut state = self.lock();
        state
            .outcomes
            .extend(std::iter::repeat_n(outcome, count));
    }

    /// Drop completion callbacks instead of invoking them.
    pub fn set_drop_callbacks(&self, drop_callbacks: bool) {
        self.lock().drop_callbacks = drop_callbacks;
    }

    /// Get all recorded fetches.
    pub fn fetches(&self) -> Vec<RecordedFetch> {
        self.lock().fetches.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches.len()
    }

    /// Scripted outcomes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.lock().outcomes.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AdRequestClient for ScriptedAdClient {
    /// Must be called from within a Tokio runtime.
    fn fetch(&self, payload: RequestPayload, on_complete: FetchCallback) {
        let (outcome, drop_callback) = {
            let mut state = self.lock();
            state.fetches.push(RecordedFetch {
                payload,
                timestamp: Utc::now(),
            });
            let outcome = state
                .outcomes
                .pop_front()
                .unwrap_or_else(|| FetchOutcome::failed(-1, "script exhausted"));
            (outcome, state.drop_callbacks)
        };

        if drop_callback {
            drop(on_complete);
            return;
        }

        let latency = self.latency;
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            on_complete(outcome);
        });
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
