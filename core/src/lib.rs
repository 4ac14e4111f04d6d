//! # Homelist Core
//!
//! Core traits and types shared by every Homelist crate.
//!
//! Feature logic (the shared shopping list, for instance) is written as a
//! reducer: a pure function that updates view state in place and describes
//! the I/O it needs as [`effect::Effect`] values. The runtime crate executes
//! those effects and feeds any produced action back into the reducer.
//!
//! ## Core Concepts
//!
//! - **State**: View state for a feature
//! - **Action**: Every input to a reducer (user intents and backend outcomes)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions, not execution
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use homelist_core::*;
//!
//! impl Reducer for BasketReducer {
//!     type State = BasketState;
//!     type Action = BasketAction;
//!     type Environment = BasketEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut BasketState,
//!         action: BasketAction,
//!         env: &BasketEnvironment,
//!     ) -> SmallVec<[Effect<BasketAction>; 4]> {
//!         SmallVec::new()
//!     }
//! }
//! ```

pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the core trait for feature logic.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait.
    ///
    /// # Type Parameters
    ///
    /// - `State`: The view state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects.
        ///
        /// Validates the action, updates state in place and returns the
        /// effects the runtime must execute. Must not perform I/O itself.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed.
    ///
    /// Effects are NOT executed immediately. They are returned from reducers
    /// and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap a future producing an optional follow-up action.
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// `true` for [`Effect::None`].
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - dependency injection traits.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time for testability.
    ///
    /// Timestamps written to the document store (`createdAt`, `dateAdded`,
    /// `updatedAt`) all come from an injected clock.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};

    #[test]
    fn effect_debug_hides_future_body() {
        let effect: Effect<u8> = Effect::future(async { Some(1) });
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }

    #[test]
    fn only_none_is_none() {
        assert!(Effect::<u8>::None.is_none());
        assert!(!Effect::<u8>::future(async { None }).is_none());
    }

    #[test]
    fn future_effect_yields_action() {
        let effect: Effect<u8> = Effect::future(async { Some(7) });
        let Effect::Future(fut) = effect else {
            unreachable!("constructed as a future");
        };
        assert_eq!(tokio_test::block_on(fut), Some(7));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
