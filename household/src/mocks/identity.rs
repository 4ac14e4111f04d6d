//! In-memory identity backend.

use crate::error::{HouseholdError, Result};
use crate::providers::IdentityProvider;
use crate::state::Identity;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

/// In-memory [`IdentityProvider`] for one device.
///
/// Clones share accounts and the signed-in state.
#[derive(Debug, Clone)]
pub struct MockIdentityProvider {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    current: Arc<watch::Sender<Option<Identity>>>,
    online: bool,
}

impl MockIdentityProvider {
    /// Create a provider with no accounts and nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            current: Arc::new(current),
            online: true,
        }
    }

    /// Create a provider with `identity` already signed in.
    #[must_use]
    pub fn signed_in_as(identity: Identity) -> Self {
        let provider = Self::new();
        provider.current.send_replace(Some(identity));
        provider
    }

    /// Create a provider whose every call fails with a backend error.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            online: false,
            ..Self::new()
        }
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online {
            Ok(())
        } else {
            Err(HouseholdError::Backend("identity service unreachable".to_string()))
        }
    }

    fn lock_accounts(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Account>>> {
        self.accounts
            .lock()
            .map_err(|_| HouseholdError::Backend("identity lock poisoned".to_string()))
    }

    fn register(&self, email: &str, password: &str) -> Result<Identity> {
        self.ensure_online()?;
        let mut accounts = self.lock_accounts()?;
        if accounts.contains_key(email) {
            return Err(HouseholdError::EmailInUse);
        }
        let identity = Identity::registered(uuid::Uuid::new_v4().simple().to_string(), email);
        accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        drop(accounts);
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<Identity> {
        self.ensure_online()?;
        let identity = self
            .lock_accounts()?
            .get(email)
            .filter(|account| account.password == password)
            .map(|account| account.identity.clone())
            .ok_or(HouseholdError::InvalidCredentials)?;
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn rename(&self, display_name: &str) -> Result<Identity> {
        self.ensure_online()?;
        let mut identity = self.current().ok_or(HouseholdError::NotSignedIn)?;
        identity.display_name = Some(display_name.to_string());

        if let Some(email) = identity.email.as_deref() {
            if let Some(account) = self.lock_accounts()?.get_mut(email) {
                account.identity.display_name = Some(display_name.to_string());
            }
        }

        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MockIdentityProvider {
    fn create_account(&self, email: &str, password: &str) -> impl Future<Output = Result<Identity>> + Send {
        let result = self.register(email, password);
        async move { result }
    }

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<Identity>> + Send {
        let result = self.authenticate(email, password);
        async move { result }
    }

    fn sign_in_anonymously(&self) -> impl Future<Output = Result<Identity>> + Send {
        let result = self.ensure_online().map(|()| {
            let identity = Identity::anonymous(format!("anon-{}", uuid::Uuid::new_v4().simple()));
            self.current.send_replace(Some(identity.clone()));
            identity
        });
        async move { result }
    }

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send {
        let result = self.ensure_online().map(|()| {
            self.current.send_replace(None);
        });
        async move { result }
    }

    fn update_display_name(&self, display_name: &str) -> impl Future<Output = Result<Identity>> + Send {
        let result = self.rename(display_name);
        async move { result }
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}
