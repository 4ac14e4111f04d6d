//! On-device notification trait.

use crate::error::Result;

/// Shows a notification on this device immediately.
pub trait LocalNotifier: Send + Sync {
    /// Display a notification.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the platform refuses the notification.
    fn notify(
        &self,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
