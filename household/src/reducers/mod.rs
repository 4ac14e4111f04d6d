//! Reducers for household screens.

pub mod list;

pub use list::{ListEnvironment, ShoppingListReducer};
