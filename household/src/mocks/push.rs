//! Recording push gateway.

use crate::error::{HouseholdError, Result};
use crate::providers::{PushGateway, PushMessage};
use std::future::Future;
use std::sync::{Arc, Mutex};

/// [`PushGateway`] that records every batch instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct MockPushGateway {
    batches: Arc<Mutex<Vec<Vec<PushMessage>>>>,
    should_fail: bool,
}

impl MockPushGateway {
    /// Create a gateway that accepts every batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway that records then rejects every batch.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Every batch sent so far.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<PushMessage>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Every message sent so far, across batches.
    #[must_use]
    pub fn messages(&self) -> Vec<PushMessage> {
        self.batches().into_iter().flatten().collect()
    }

    /// Forget recorded batches.
    pub fn clear(&self) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.clear();
        }
    }
}

impl PushGateway for MockPushGateway {
    fn send(&self, messages: Vec<PushMessage>) -> impl Future<Output = Result<()>> + Send {
        let batches = Arc::clone(&self.batches);
        let should_fail = self.should_fail;

        async move {
            batches
                .lock()
                .map_err(|_| HouseholdError::Backend("push lock poisoned".to_string()))?
                .push(messages);

            if should_fail {
                return Err(HouseholdError::PushDeliveryFailed("mock rejection".to_string()));
            }
            Ok(())
        }
    }
}
