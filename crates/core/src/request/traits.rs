use async_trait::async_trait;

use super::types::{AdSize, FetchOutcome, RequestPayload};

/// Completion callback handed to [`AdRequestClient::fetch`].
pub type FetchCallback = Box<dyn FnOnce(FetchOutcome) + Send + 'static>;

/// Issues demand fetches against an ad-serving backend.
///
/// Implementations are asynchronous: `fetch` returns immediately and the
/// callback is invoked later, exactly once, from whatever context the client
/// dispatches completions on.
pub trait AdRequestClient: Send + Sync {
    /// Start a demand fetch for `payload`.
    fn fetch(&self, payload: RequestPayload, on_complete: FetchCallback);

    /// Name of this client implementation.
    fn name(&self) -> &'static str;
}

/// The view hosting the loaded creative.
#[async_trait]
pub trait HostView: Send + Sync {
    /// Resize the view to the creative size resolved for the loaded ad.
    async fn resize(&self, size: AdSize);
}
