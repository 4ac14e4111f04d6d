//! Shared-list environment.
//!
//! Dependencies needed by the list synchronizer and its reducer.

use crate::config::HouseholdConfig;
use crate::providers::{DocumentStore, LocalNotifier, PushGateway};
use homelist_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Shared-list environment.
///
/// # Type Parameters
///
/// - `D`: Document store
/// - `P`: Push gateway
/// - `N`: Local notifier
#[derive(Clone)]
pub struct HouseholdEnvironment<D, P, N>
where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    /// Document store holding families and items.
    pub documents: D,

    /// Push delivery to other members' devices.
    pub push: P,

    /// Notifications on this device.
    pub notifier: N,

    /// Source of `dateAdded` timestamps.
    pub clock: Arc<dyn Clock>,

    /// Fallback names and push settings.
    pub config: HouseholdConfig,
}

impl<D, P, N> HouseholdEnvironment<D, P, N>
where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    /// Create an environment using the system clock and default config.
    #[must_use]
    pub fn new(documents: D, push: P, notifier: N) -> Self {
        Self {
            documents,
            push,
            notifier,
            clock: Arc::new(SystemClock),
            config: HouseholdConfig::default(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: HouseholdConfig) -> Self {
        self.config = config;
        self
    }
}
