//! # Homelist Household
//!
//! Families, the shared shopping list and the notifications that keep every
//! member's device in step.
//!
//! ## Components
//!
//! - **Accounts** ([`accounts::Accounts`]): email/password registration and
//!   login against an identity backend
//! - **Family membership** ([`membership::FamilyMembership`]): create, join,
//!   leave and delete families, and resolve which family an identity is in
//! - **Shared list** ([`sync`]): live item subscription plus add, toggle and
//!   delete, each followed by a notification to the other members
//! - **Fan-out** ([`fanout`]): one push batch per change, never to the actor
//! - **List view** ([`reducers::ShoppingListReducer`],
//!   [`shopping_list::ShoppingListSession`]): the list screen as a reducer run
//!   by a `homelist_runtime::Store`
//!
//! Every backend sits behind a trait in [`providers`]. In-memory versions
//! live in [`mocks`] (enabled by the default `test-utils` feature).
//!
//! ## Example
//!
//! ```rust,ignore
//! use homelist_household::*;
//!
//! let membership = FamilyMembership::new(identity, documents.clone());
//! let mut session = Session::new().with_push_token(token);
//!
//! let family = membership.create_family(&mut session, "Smiths", "secret1").await?;
//!
//! let env = HouseholdEnvironment::new(documents, push, notifier);
//! sync::add_item(&env, &session, &family, ItemDraft::new("Milk", "2")).await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod accounts;
pub mod actions;
pub mod config;
pub mod environment;
pub mod error;
pub mod fanout;
pub mod membership;
pub mod providers;
pub mod reducers;
pub mod shopping_list;
pub mod state;
pub mod sync;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use accounts::Accounts;
pub use actions::ListAction;
pub use config::{HouseholdConfig, PushConfig};
pub use environment::HouseholdEnvironment;
pub use error::{HouseholdError, Result};
pub use fanout::{ListNotice, NotificationPayload};
pub use membership::{DeleteReport, FamilyMembership};
pub use reducers::ShoppingListReducer;
pub use shopping_list::ShoppingListSession;
pub use state::{
    Family, FamilyId, FamilyRef, Identity, IdentityId, Item, ItemDraft, ItemId, ListState,
    Member, PushToken, Quantity, Session, Unit, UserProfile,
};
pub use sync::ItemSubscription;
