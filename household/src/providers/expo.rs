//! Expo push delivery over HTTP.

use crate::config::PushConfig;
use crate::error::{HouseholdError, Result};
use crate::providers::{PushGateway, PushMessage};
use reqwest::Client;

/// Push gateway for the Expo push service.
///
/// Posts each batch as a JSON array to [`PushConfig::endpoint`]. Only the
/// status code of the answer is looked at.
///
/// # Example
///
/// ```no_run
/// # use homelist_household::{PushConfig, providers::ExpoPushGateway};
/// let gateway = ExpoPushGateway::new(PushConfig::default())?;
/// # Ok::<(), homelist_household::HouseholdError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ExpoPushGateway {
    endpoint: String,
    http_client: Client,
}

impl ExpoPushGateway {
    /// Build a gateway with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`HouseholdError::Backend`] if the HTTP client cannot be built.
    pub fn new(config: PushConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HouseholdError::Backend(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(config, http_client))
    }

    /// Build a gateway around an existing client.
    #[must_use]
    pub fn with_client(config: PushConfig, http_client: Client) -> Self {
        Self {
            endpoint: config.endpoint,
            http_client,
        }
    }

    /// Target URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PushGateway for ExpoPushGateway {
    #[tracing::instrument(skip(self, messages), fields(count = messages.len()))]
    async fn send(&self, messages: Vec<PushMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&messages)
            .send()
            .await
            .map_err(|e| HouseholdError::PushDeliveryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(%status, "Push service rejected batch");
            return Err(HouseholdError::PushDeliveryFailed(format!(
                "push service answered {status}"
            )));
        }

        tracing::debug!("Push batch accepted");
        Ok(())
    }
}
