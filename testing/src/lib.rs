//! # Homelist Testing
//!
//! Testing utilities for Homelist reducers and services.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`test_clock`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - One-line tracing setup for tests ([`init_test_tracing`])
//!
//! ## Example
//!
//! ```ignore
//! use homelist_testing::test_clock;
//! use homelist_runtime::Store;
//!
//! #[tokio::test]
//! async fn adds_item() {
//!     let store = Store::new(ListState::default(), reducer, env_with(test_clock()));
//!     store.send(ListAction::SnapshotReceived { items: vec![] }).await?;
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use homelist_core::environment::Clock;
use std::sync::{Arc, Mutex};


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, Mutex, Utc};

    /// Fixed clock for deterministic tests.
    ///
    /// Returns the same instant until [`FixedClock::advance`] moves it.
    /// Clones share the same instant.
    ///
    /// # Example
    ///
    /// ```
    /// use homelist_testing::mocks::FixedClock;
    /// use homelist_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(before, clock.now());
    ///
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(clock.now() - before, Duration::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub use mocks::{FixedClock, test_clock};
