//! Email/password accounts.

use crate::error::{HouseholdError, Result};
use crate::providers::IdentityProvider;
use crate::state::{Identity, Session};
use tokio::sync::watch;

/// Account registration and login on top of an [`IdentityProvider`].
#[derive(Debug, Clone)]
pub struct Accounts<I: IdentityProvider> {
    identity: I,
}

impl<I: IdentityProvider> Accounts<I> {
    /// Wrap an identity provider.
    #[must_use]
    pub const fn new(identity: I) -> Self {
        Self { identity }
    }

    /// Create an account and give it a display name.
    ///
    /// # Errors
    ///
    /// - [`HouseholdError::Validation`] if any field is blank
    /// - [`HouseholdError::EmailInUse`] if the email is registered already
    /// - Backend errors from the identity provider
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str, display_name: &str) -> Result<Identity> {
        let missing = || HouseholdError::Validation("Please fill in all fields.".to_string());
        let email = Some(email.trim()).filter(|s| !s.is_empty()).ok_or_else(missing)?;
        let display_name = Some(display_name.trim()).filter(|s| !s.is_empty()).ok_or_else(missing)?;
        if password.is_empty() {
            return Err(missing());
        }

        self.identity.create_account(email, password).await?;
        let identity = self.identity.update_display_name(display_name).await?;
        tracing::info!(identity = %identity.id, "Account registered");
        Ok(identity)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// - [`HouseholdError::Validation`] if either field is blank
    /// - [`HouseholdError::InvalidCredentials`] on a bad pair
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(HouseholdError::Validation(
                "Please enter your email and password.".to_string(),
            ));
        }
        self.identity.sign_in(email, password).await
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns backend errors from the identity provider.
    pub async fn logout(&self) -> Result<()> {
        self.identity.sign_out().await
    }

    /// A session for whoever is signed in right now.
    #[must_use]
    pub fn session(&self) -> Session {
        Session {
            identity: self.identity.current(),
            push_token: None,
        }
    }

    /// Observe sign-in and sign-out.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.watch()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockIdentityProvider;

    #[tokio::test]
    async fn register_requires_every_field() {
        let accounts = Accounts::new(MockIdentityProvider::new());
        for (email, password, name) in [("", "pw", "A"), ("a@x", "", "A"), ("a@x", "pw", " ")] {
            assert!(matches!(
                accounts.register(email, password, name).await,
                Err(HouseholdError::Validation(_))
            ));
        }
        assert!(accounts.session().identity.is_none());
    }

    #[tokio::test]
    async fn register_then_login() {
        let accounts = Accounts::new(MockIdentityProvider::new());
        let registered = accounts.register("a@example.com", "pw", "Alice").await.unwrap();
        assert_eq!(registered.display_name.as_deref(), Some("Alice"));
        assert_eq!(accounts.session().identity, Some(registered.clone()));

        assert_eq!(
            accounts.register("a@example.com", "pw", "Again").await,
            Err(HouseholdError::EmailInUse)
        );

        accounts.logout().await.unwrap();
        assert!(accounts.watch().borrow().is_none());

        assert_eq!(
            accounts.login("a@example.com", "nope").await,
            Err(HouseholdError::InvalidCredentials)
        );
        let back = accounts.login(" a@example.com ", "pw").await.unwrap();
        assert_eq!(back.id, registered.id);
    }
}
