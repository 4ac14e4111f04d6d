//! Recording local notifier and device registration.

use crate::error::{HouseholdError, Result};
use crate::providers::{DeviceRegistration, LocalNotifier};
use crate::state::PushToken;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// A notification shown on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Payload.
    pub data: serde_json::Value,
}

/// [`LocalNotifier`] that records notifications.
#[derive(Debug, Clone, Default)]
pub struct MockLocalNotifier {
    shown: Arc<Mutex<Vec<LocalNotification>>>,
    should_fail: bool,
}

impl MockLocalNotifier {
    /// Create a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier that refuses everything.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Notifications shown so far.
    #[must_use]
    pub fn shown(&self) -> Vec<LocalNotification> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl LocalNotifier for MockLocalNotifier {
    fn notify(&self, title: &str, body: &str, data: serde_json::Value) -> impl Future<Output = Result<()>> + Send {
        let shown = Arc::clone(&self.shown);
        let should_fail = self.should_fail;
        let notification = LocalNotification {
            title: title.to_string(),
            body: body.to_string(),
            data,
        };

        async move {
            if should_fail {
                return Err(HouseholdError::Backend("notifications disabled".to_string()));
            }
            shown
                .lock()
                .map_err(|_| HouseholdError::Backend("notifier lock poisoned".to_string()))?
                .push(notification);
            Ok(())
        }
    }
}

/// [`DeviceRegistration`] with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceRegistration {
    token: Option<PushToken>,
}

impl MockDeviceRegistration {
    /// A device that registers with `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(PushToken::new(token)),
        }
    }

    /// A device where permission was denied.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { token: None }
    }
}

impl DeviceRegistration for MockDeviceRegistration {
    fn push_token(&self) -> impl Future<Output = Option<PushToken>> + Send {
        let token = self.token.clone();
        async move { token }
    }
}
