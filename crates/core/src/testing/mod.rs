//! Testing utilities and mock implementations.
//!
//! This module provides test doubles for the external collaborators of the
//! orchestrator, so runs can be exercised without a real ad server.
//!
//! # Example
//!
//! ```rust,ignore
//! use demandflow_core::testing::{RecordingHostView, ScriptedAdClient};
//!
//! let client = ScriptedAdClient::with_outcomes([
//!     FetchOutcome::loaded(AdSize::new(300, 250)),
//!     FetchOutcome::loaded(AdSize::new(728, 90)),
//! ]);
//! let view = RecordingHostView::new();
//!
//! // Hand both to a DemandRequestOrchestrator...
//! ```

mod mock_ad_client;
mod mock_host_view;

pub use mock_ad_client::{RecordedFetch, ScriptedAdClient};
pub use mock_host_view::RecordingHostView;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::request::{AdSize, FetchOutcome, RequestPayload};

    /// Primary banner size used across tests.
    pub const BANNER: AdSize = AdSize::new(300, 250);

    /// Leaderboard size appended between stages.
    pub const LEADERBOARD: AdSize = AdSize::new(728, 90);

    /// A banner request payload with no additional sizes.
    pub fn banner_payload() -> RequestPayload {
        RequestPayload::new("1001-1", BANNER)
    }

    /// A generic load failure.
    pub fn load_failure() -> FetchOutcome {
        FetchOutcome::failed(3, "no fill")
    }
}
