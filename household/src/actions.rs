//! Shopping-list actions.

use crate::error::HouseholdError;
use crate::state::{Item, ItemDraft, ItemId};

/// Every input to the shopping-list reducer.
///
/// - **Commands**: what the user asked for (`AddItem`, `ToggleBought`, ...)
/// - **Events**: what happened (`SnapshotReceived`, `MutationFailed`, ...)
#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════════
    /// Add an item from form input.
    AddItem {
        /// Form input.
        draft: ItemDraft,
    },

    /// Flip an item's bought flag.
    ToggleBought {
        /// Item to flip.
        item_id: ItemId,
    },

    /// Delete an item.
    DeleteItem {
        /// Item to delete.
        item_id: ItemId,
    },

    /// Clear the last error.
    DismissError,

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════
    /// The live subscription delivered a new full list.
    SnapshotReceived {
        /// Items in store order.
        items: Vec<Item>,
    },

    /// A mutation was written.
    MutationSucceeded,

    /// A mutation failed and nothing was notified.
    MutationFailed {
        /// Cause.
        error: HouseholdError,
    },
}
