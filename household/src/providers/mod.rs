//! Household providers.
//!
//! Traits for every external service the household logic talks to. The
//! membership manager, list synchronizer and fan-out depend only on these
//! traits; applications plug in real backends, tests plug in [`crate::mocks`].
//!
//! ```text
//! ┌─────────────────────┐     ┌───────────────────┐
//! │ FamilyMembership    │────▶│ IdentityProvider  │
//! │ sync::*             │────▶│ DocumentStore     │
//! │ fanout::fan_out     │────▶│ PushGateway       │
//! │                     │────▶│ LocalNotifier     │
//! └─────────────────────┘     └───────────────────┘
//! ```

pub mod device;
pub mod documents;
pub mod expo;
pub mod identity;
pub mod notifier;
pub mod push;

pub use device::DeviceRegistration;
pub use documents::{CollectionPath, CollectionSubscription, Document, DocumentPath, DocumentStore};
pub use expo::ExpoPushGateway;
pub use identity::IdentityProvider;
pub use notifier::LocalNotifier;
pub use push::{PushGateway, PushMessage};
