//! Recording host view for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::request::{AdSize, HostView};

/// Host view that records every resize.
#[derive(Debug, Clone, Default)]
pub struct RecordingHostView {
    resizes: Arc<RwLock<Vec<AdSize>>>,
}

impl RecordingHostView {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sizes the view was resized to, oldest first.
    pub async fn resizes(&self) -> Vec<AdSize> {
        self.resizes.read().await.clone()
    }

    /// The size the view currently has, if it was ever resized.
    pub async fn current_size(&self) -> Option<AdSize> {
        self.resizes.read().await.last().copied()
    }
}

#[async_trait]
impl HostView for RecordingHostView {
    async fn resize(&self, size: AdSize) {
        self.resizes.write().await.push(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_resizes() {
        let view = RecordingHostView::new();
        assert_eq!(view.current_size().await, None);

        view.resize(AdSize::new(300, 250)).await;
        view.resize(AdSize::new(728, 90)).await;

        assert_eq!(
            view.resizes().await,
            vec![AdSize::new(300, 250), AdSize::new(728, 90)]
        );
        assert_eq!(view.current_size().await, Some(AdSize::new(728, 90)));
    }
}
