//! Household configuration.
//!
//! Values are supplied by the application; nothing here reads the
//! environment.

use std::time::Duration;

/// Default push delivery endpoint.
pub const EXPO_PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Push delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// URL that accepts a JSON array of push messages.
    ///
    /// Default: [`EXPO_PUSH_ENDPOINT`]
    pub endpoint: String,

    /// Sound attached to every message.
    ///
    /// Default: `"default"`
    pub sound: String,

    /// Request timeout.
    ///
    /// Default: 10 seconds
    pub timeout: Duration,
}

impl PushConfig {
    /// Create push configuration for a custom endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the message sound.
    #[must_use]
    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = sound.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: EXPO_PUSH_ENDPOINT.to_string(),
            sound: "default".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Defaults applied to list and family operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseholdConfig {
    /// Recorded as `addedBy` when the actor has no display name.
    ///
    /// Default: `"Unknown"`
    pub unknown_author: String,

    /// Names the actor in purchase and removal notices when they have no
    /// display name.
    ///
    /// Default: `"Someone"`
    pub anonymous_actor: String,

    /// Shown when a family document is missing or has no name.
    ///
    /// Default: `"My Family"`
    pub default_family_name: String,

    /// Push delivery settings.
    pub push: PushConfig,
}

impl HouseholdConfig {
    /// Set the author recorded for anonymous additions.
    #[must_use]
    pub fn with_unknown_author(mut self, author: impl Into<String>) -> Self {
        self.unknown_author = author.into();
        self
    }

    /// Set the fallback family display name.
    #[must_use]
    pub fn with_default_family_name(mut self, name: impl Into<String>) -> Self {
        self.default_family_name = name.into();
        self
    }

    /// Set push delivery settings.
    #[must_use]
    pub fn with_push(mut self, push: PushConfig) -> Self {
        self.push = push;
        self
    }
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            unknown_author: "Unknown".to_string(),
            anonymous_actor: "Someone".to_string(),
            default_family_name: "My Family".to_string(),
            push: PushConfig::default(),
        }
    }
}
