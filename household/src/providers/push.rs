//! Push delivery trait.

use crate::error::Result;
use crate::state::PushToken;
use serde::{Deserialize, Serialize};

/// One push message, as accepted by the delivery service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Recipient device token.
    pub to: PushToken,
    /// Sound name.
    pub sound: String,
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Payload read by the receiving app.
    pub data: serde_json::Value,
}

/// Push delivery service.
///
/// Delivery is fire-and-forget: a successful return means the service
/// accepted the batch, nothing more.
pub trait PushGateway: Send + Sync {
    /// Send one batch of messages in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HouseholdError::PushDeliveryFailed`] if the request
    /// fails or the service answers with a non-success status.
    fn send(
        &self,
        messages: Vec<PushMessage>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
