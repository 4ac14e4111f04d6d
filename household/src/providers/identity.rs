//! Identity backend trait.

use crate::error::Result;
use crate::state::Identity;
use tokio::sync::watch;

/// Identity backend.
///
/// Holds the credential store and knows which identity is signed in on this
/// device. Household operations never read that ambiently; callers copy the
/// identity into a [`crate::state::Session`].
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HouseholdError::EmailInUse`] if the email is taken,
    /// or a backend error.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Identity>> + Send;

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HouseholdError::InvalidCredentials`] on a bad pair.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Identity>> + Send;

    /// Create and sign in a fresh anonymous identity.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the identity service is unreachable.
    fn sign_in_anonymously(&self) -> impl std::future::Future<Output = Result<Identity>> + Send;

    /// Sign out the current identity.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the identity service is unreachable.
    fn sign_out(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Set the signed-in identity's display name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HouseholdError::NotSignedIn`] without an identity.
    fn update_display_name(
        &self,
        display_name: &str,
    ) -> impl std::future::Future<Output = Result<Identity>> + Send;

    /// Identity currently signed in on this device.
    fn current(&self) -> Option<Identity>;

    /// Observe sign-in and sign-out.
    ///
    /// The receiver starts at the current value.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}
