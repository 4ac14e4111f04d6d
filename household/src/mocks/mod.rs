//! In-memory provider implementations.
//!
//! Every provider trait in [`crate::providers`] has a deterministic,
//! in-memory counterpart here for unit tests, integration tests and demos.

pub mod documents;
pub mod identity;
pub mod notifier;
pub mod push;

pub use documents::MockDocumentStore;
pub use identity::MockIdentityProvider;
pub use notifier::{LocalNotification, MockDeviceRegistration, MockLocalNotifier};
pub use push::MockPushGateway;
