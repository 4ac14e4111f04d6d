//! Error types for household operations.

use thiserror::Error;

/// Result type alias for household operations.
pub type Result<T> = std::result::Result<T, HouseholdError>;

/// Error taxonomy for accounts, family membership and the shared list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HouseholdError {
    // ═══════════════════════════════════════════════════════════
    // Input Errors (raised before any backend call)
    // ═══════════════════════════════════════════════════════════

    /// A required field was empty.
    #[error("Missing information: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Family Membership
    // ═══════════════════════════════════════════════════════════

    /// No family exists under this name.
    #[error("No family named {name:?}")]
    FamilyNotFound {
        /// Name that was looked up
        name: String,
    },

    /// A family with this name already exists.
    #[error("Family {name:?} already exists")]
    FamilyAlreadyExists {
        /// Name that was taken
        name: String,
    },

    /// The supplied family password does not match.
    #[error("Wrong family password")]
    WrongPassword,

    /// Only the family creator may perform this operation.
    #[error("Only the family creator can do this")]
    NotCreator,

    /// Some items could not be removed while deleting a family.
    ///
    /// The family document is kept so the deletion can be retried.
    #[error("Could not delete {failed} of {total} items")]
    CascadeIncomplete {
        /// Items whose deletion failed
        failed: usize,
        /// Items found under the family
        total: usize,
    },

    // ═══════════════════════════════════════════════════════════
    // Identity
    // ═══════════════════════════════════════════════════════════

    /// No identity is signed in.
    #[error("Not signed in")]
    NotSignedIn,

    /// Email/password pair rejected by the identity backend.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("Email already in use")]
    EmailInUse,

    // ═══════════════════════════════════════════════════════════
    // Backend
    // ═══════════════════════════════════════════════════════════

    /// Document does not exist at the given path.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// A stored document could not be encoded or decoded.
    #[error("Malformed document: {0}")]
    Serialization(String),

    /// Network or store failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The push delivery service rejected or failed a request.
    #[error("Push delivery failed: {0}")]
    PushDeliveryFailed(String),
}

impl HouseholdError {
    /// Returns `true` if this error is due to user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use homelist_household::HouseholdError;
    /// assert!(HouseholdError::WrongPassword.is_user_error());
    /// assert!(!HouseholdError::Backend("timeout".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::FamilyNotFound { .. }
                | Self::FamilyAlreadyExists { .. }
                | Self::WrongPassword
                | Self::NotCreator
                | Self::InvalidCredentials
                | Self::EmailInUse
        )
    }

    /// Message suitable for an alert.
    ///
    /// Backend failures collapse into one generic retry suggestion.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::FamilyNotFound { .. } => {
                "We couldn't find a family with that name.".to_string()
            },
            Self::FamilyAlreadyExists { .. } => {
                "Try a different name or join the existing family.".to_string()
            },
            Self::WrongPassword => "Wrong password. Please try again.".to_string(),
            Self::NotCreator => "Only the family creator can do this.".to_string(),
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::EmailInUse => "An account with this email already exists.".to_string(),
            Self::CascadeIncomplete { failed, .. } => {
                format!("{failed} items could not be deleted. Please try again.")
            },
            Self::NotSignedIn
            | Self::DocumentNotFound(_)
            | Self::Serialization(_)
            | Self::Backend(_)
            | Self::PushDeliveryFailed(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<serde_json::Error> for HouseholdError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_get_generic_message() {
        let message = HouseholdError::Backend("connection reset".into()).user_message();
        assert_eq!(message, "Something went wrong. Please try again.");
        assert!(!message.contains("connection reset"));
    }

    #[test]
    fn cascade_message_reports_failed_count() {
        let error = HouseholdError::CascadeIncomplete {
            failed: 2,
            total: 5,
        };
        assert_eq!(error.to_string(), "Could not delete 2 of 5 items");
        assert!(error.user_message().starts_with("2 items"));
        assert!(!error.is_user_error());
    }
}
