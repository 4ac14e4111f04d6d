//! Device push registration trait.

use crate::state::PushToken;

/// Acquires this device's push token.
///
/// Implementations request notification permission as needed. Denied
/// permission or a device that cannot receive pushes yields `None`.
pub trait DeviceRegistration: Send + Sync {
    /// The device token, if one could be obtained.
    fn push_token(&self) -> impl std::future::Future<Output = Option<PushToken>> + Send;
}
