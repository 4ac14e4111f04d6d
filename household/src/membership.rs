//! Family membership.
//!
//! Families are documents at `families/{id}`; an identity's current family is
//! a pointer in its profile at `users/{id}`. Every operation takes the
//! caller's [`Session`] explicitly.

use crate::config::HouseholdConfig;
use crate::error::{HouseholdError, Result};
use crate::providers::{CollectionPath, DocumentPath, DocumentStore, IdentityProvider};
use crate::state::{Family, FamilyId, FamilyRef, Identity, Member, Session, UserProfile};
use crate::utils::{family_name, hash_password, require};
use homelist_core::environment::{Clock, SystemClock};
use serde_json::{Value, json};
use std::sync::Arc;

const MISSING_FAMILY_FIELDS: &str = "Please enter both a family name and password.";

/// Outcome of a successful family deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
    /// Items removed before the family document.
    pub items_deleted: usize,
}

/// Creates, joins, leaves and deletes families.
///
/// # Type Parameters
///
/// - `I`: Identity provider, used to sign in anonymously when needed
/// - `D`: Document store
#[derive(Clone)]
pub struct FamilyMembership<I, D>
where
    I: IdentityProvider,
    D: DocumentStore,
{
    identity: I,
    documents: D,
    clock: Arc<dyn Clock>,
    config: HouseholdConfig,
}

impl<I, D> FamilyMembership<I, D>
where
    I: IdentityProvider,
    D: DocumentStore,
{
    /// Create a manager using the system clock and default config.
    #[must_use]
    pub fn new(identity: I, documents: D) -> Self {
        Self {
            identity,
            documents,
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

    /// The document store.
    #[must_use]
    pub const fn documents(&self) -> &D {
        &self.documents
    }

    /// Return the session identity, signing in anonymously first if there
    /// is none.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error if anonymous sign-in fails.
    pub async fn ensure_signed_in(&self, session: &mut Session) -> Result<Identity> {
        if let Some(identity) = &session.identity {
            return Ok(identity.clone());
        }

        let identity = self.identity.sign_in_anonymously().await?;
        tracing::info!(identity = %identity.id, "Signed in anonymously");
        session.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Create a family with the caller as its only member.
    ///
    /// The family id is the trimmed name. Creation is atomic: if two callers
    /// race for the same name, exactly one succeeds.
    ///
    /// # Errors
    ///
    /// - [`HouseholdError::Validation`] if name or password is blank, or the
    ///   name contains `/`
    /// - [`HouseholdError::FamilyAlreadyExists`] if the name is taken
    /// - Backend errors from the identity provider or document store
    #[tracing::instrument(skip(self, session, password))]
    pub async fn create_family(&self, session: &mut Session, name: &str, password: &str) -> Result<Family> {
        let name = family_name(name, MISSING_FAMILY_FIELDS)?;
        require(password, MISSING_FAMILY_FIELDS)?;
        let actor = self.ensure_signed_in(session).await?;

        let family = Family {
            id: FamilyId::new(name),
            name: name.to_string(),
            password_hash: hash_password(password),
            creator_id: actor.id.clone(),
            members: vec![Member {
                id: actor.id.clone(),
                display_name: actor.display_name.clone().unwrap_or_default(),
                expo_push_token: session.stored_token(),
            }],
            created_at: self.clock.now(),
        };

        let created = self
            .documents
            .create(&DocumentPath::family(&family.id), serde_json::to_value(&family)?)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to create family"))?;
        if !created {
            return Err(HouseholdError::FamilyAlreadyExists {
                name: name.to_string(),
            });
        }

        self.point_profile_at(&actor, &family).await?;
        tracing::info!(family = %family.id, "Family created");
        Ok(family)
    }

    /// Join an existing family.
    ///
    /// A new member is appended. A returning member keeps their place; only
    /// their push token is refreshed if this device's token differs.
    ///
    /// # Errors
    ///
    /// - [`HouseholdError::Validation`] if name or password is blank, or the
    ///   name contains `/`
    /// - [`HouseholdError::FamilyNotFound`] if no family has this name
    /// - [`HouseholdError::WrongPassword`] on a hash mismatch (nothing is written)
    /// - Backend errors from the identity provider or document store
    #[tracing::instrument(skip(self, session, password))]
    pub async fn join_family(&self, session: &mut Session, name: &str, password: &str) -> Result<Family> {
        let name = family_name(name, MISSING_FAMILY_FIELDS)?;
        require(password, MISSING_FAMILY_FIELDS)?;
        let actor = self.ensure_signed_in(session).await?;

        let family_id = FamilyId::new(name);
        let mut family = self
            .load_family(&family_id)
            .await?
            .ok_or_else(|| HouseholdError::FamilyNotFound {
                name: name.to_string(),
            })?;

        if family.password_hash != hash_password(password) {
            tracing::debug!(family = %family.id, "Join rejected: wrong password");
            return Err(HouseholdError::WrongPassword);
        }

        if family.name.is_empty() {
            family.name = name.to_string();
        }

        let token = session.stored_token();
        let roster_changed = match family.members.iter_mut().find(|m| m.id == actor.id) {
            None => {
                family.members.push(Member {
                    id: actor.id.clone(),
                    display_name: actor.display_name.clone().unwrap_or_default(),
                    expo_push_token: token,
                });
                true
            },
            Some(member) if member.expo_push_token != token => {
                member.expo_push_token = token;
                true
            },
            Some(_) => false,
        };

        if roster_changed {
            self.write_members(&family).await?;
        }

        self.point_profile_at(&actor, &family).await?;
        tracing::info!(family = %family.id, roster_changed, "Joined family");
        Ok(family)
    }

    /// Remove the caller from `family` and clear their profile pointer.
    ///
    /// Not being a member is not an error.
    ///
    /// # Errors
    ///
    /// - [`HouseholdError::NotSignedIn`] without a session identity
    /// - Backend errors from the document store
    #[tracing::instrument(skip(self, session, family), fields(family = %family.id))]
    pub async fn leave_family(&self, session: &Session, family: &Family) -> Result<()> {
        let actor = session.actor()?;

        if family.member(&actor.id).is_some() {
            let mut remaining = family.clone();
            remaining.members.retain(|m| m.id != actor.id);
            self.write_members(&remaining).await?;
        }

        self.clear_profile(actor).await?;
        tracing::info!("Left family");
        Ok(())
    }

    /// Delete `family` and every item in it. Creator only.
    ///
    /// Items are deleted one by one and the family document last. If any
    /// item cannot be deleted the family document is kept, so running the
    /// deletion again finishes the job. On success the caller's own profile
    /// pointer is cleared; other members' profiles are left as they are.
    ///
    /// # Errors
    ///
    /// - [`HouseholdError::NotCreator`] if the caller did not create the family
    /// - [`HouseholdError::CascadeIncomplete`] if some items survived
    /// - Backend errors from the document store
    #[tracing::instrument(skip(self, session, family), fields(family = %family.id))]
    pub async fn delete_family(&self, session: &Session, family: &Family) -> Result<DeleteReport> {
        let actor = session.actor()?;
        if !family.is_creator(&actor.id) {
            return Err(HouseholdError::NotCreator);
        }

        let items = CollectionPath::items(&family.id);
        let documents = self.documents.list(&items).await?;
        let total = documents.len();

        let mut failed = 0;
        for document in documents {
            if let Err(e) = self.documents.delete(&items.document(&document.id)).await {
                tracing::warn!(item = %document.id, error = %e, "Failed to delete item");
                failed += 1;
            }
        }

        if failed > 0 {
            tracing::error!(failed, total, "Family deletion incomplete");
            return Err(HouseholdError::CascadeIncomplete { failed, total });
        }

        self.documents.delete(&DocumentPath::family(&family.id)).await?;
        self.clear_profile(actor).await?;

        tracing::info!(items_deleted = total, "Family deleted");
        Ok(DeleteReport { items_deleted: total })
    }

    /// The family `identity` currently belongs to.
    ///
    /// Requires the profile to name both a family id and a family name, and
    /// that family to still exist. A pointer left behind by a deleted family
    /// stays in the profile but resolves to `None`.
    ///
    /// # Errors
    ///
    /// Returns backend errors from the document store.
    #[tracing::instrument(skip(self, identity), fields(identity = %identity.id))]
    pub async fn resolve_current_family(&self, identity: &Identity) -> Result<Option<FamilyRef>> {
        let Some(profile) = self.load_profile(identity).await? else {
            return Ok(None);
        };
        let Some(pointer) = profile.family_ref() else {
            return Ok(None);
        };

        let exists = self
            .documents
            .get(&DocumentPath::family(&pointer.family_id))
            .await?
            .is_some();
        if !exists {
            tracing::debug!(family = %pointer.family_id, "Profile points at a deleted family");
            return Ok(None);
        }
        Ok(Some(pointer))
    }

    /// The stored profile for `identity`, if one was ever written.
    ///
    /// # Errors
    ///
    /// Returns backend errors, or [`HouseholdError::Serialization`] for a
    /// malformed profile.
    pub async fn load_profile(&self, identity: &Identity) -> Result<Option<UserProfile>> {
        self.documents
            .get(&DocumentPath::user(&identity.id))
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(HouseholdError::from)
    }

    /// Read a family document.
    ///
    /// # Errors
    ///
    /// Returns backend errors, or [`HouseholdError::Serialization`] for a
    /// malformed family document.
    pub async fn load_family(&self, id: &FamilyId) -> Result<Option<Family>> {
        self.documents
            .get(&DocumentPath::family(id))
            .await?
            .map(|data| Family::from_document(id.clone(), data))
            .transpose()
    }

    /// Display name of a family, falling back to the configured default
    /// when the family is missing, unnamed or unreadable.
    pub async fn family_display_name(&self, id: &FamilyId) -> String {
        match self.load_family(id).await {
            Ok(Some(family)) if !family.name.is_empty() => family.name,
            Ok(_) => self.config.default_family_name.clone(),
            Err(e) => {
                tracing::warn!(family = %id, error = %e, "Could not read family name");
                self.config.default_family_name.clone()
            },
        }
    }

    async fn write_members(&self, family: &Family) -> Result<()> {
        self.documents
            .update(
                &DocumentPath::family(&family.id),
                json!({ "members": family.members }),
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to update members"))
    }

    async fn point_profile_at(&self, actor: &Identity, family: &Family) -> Result<()> {
        self.write_profile(
            actor,
            json!({
                "id": actor.id,
                "familyId": family.id,
                "familyName": family.name,
                "displayName": actor.display_name,
                "updatedAt": self.clock.now(),
            }),
        )
        .await
    }

    async fn clear_profile(&self, actor: &Identity) -> Result<()> {
        self.write_profile(
            actor,
            json!({
                "familyId": Value::Null,
                "familyName": Value::Null,
                "updatedAt": self.clock.now(),
            }),
        )
        .await
    }

    async fn write_profile(&self, actor: &Identity, fields: Value) -> Result<()> {
        self.documents
            .merge(&DocumentPath::user(&actor.id), fields)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to write profile"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockDocumentStore, MockIdentityProvider};
    use crate::state::{IdentityId, PushToken};
    use crate::utils::INVALID_FAMILY_NAME;
    use homelist_testing::test_clock;

    fn manager(store: &MockDocumentStore) -> FamilyMembership<MockIdentityProvider, MockDocumentStore> {
        FamilyMembership::new(MockIdentityProvider::new(), store.clone()).with_clock(test_clock())
    }

    fn alice() -> Session {
        Session::new()
            .with_identity(Identity::registered("a", "a@example.com").with_display_name("Alice"))
            .with_push_token(PushToken::new("tok-a"))
    }

    #[tokio::test]
    async fn blank_input_is_rejected_before_sign_in() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let mut session = Session::new();

        let result = membership.create_family(&mut session, "  ", "secret1").await;
        assert_eq!(result, Err(HouseholdError::Validation(MISSING_FAMILY_FIELDS.to_string())));
        let result = membership.join_family(&mut session, "Smiths", "").await;
        assert!(matches!(result, Err(HouseholdError::Validation(_))));

        assert!(session.identity.is_none());
        assert_eq!(store.document_count(), 0);
    }

    #[tokio::test]
    async fn nested_family_names_are_rejected() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let mut owner = alice();
        let family = membership.create_family(&mut owner, "Smiths", "secret1").await.unwrap();
        let before = store.document_count();

        let mut mallory = Session::new();
        let invalid = Err(HouseholdError::Validation(INVALID_FAMILY_NAME.to_string()));
        assert_eq!(
            membership.create_family(&mut mallory, "Smiths/items/evil", "x").await,
            invalid
        );
        assert_eq!(
            membership.join_family(&mut mallory, "Smiths/items/evil", "x").await,
            invalid
        );
        assert_eq!(membership.join_family(&mut mallory, "..", "x").await, invalid);

        assert!(mallory.identity.is_none());
        assert_eq!(store.document_count(), before);
        let items = store.list(&CollectionPath::items(&family.id)).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn create_signs_in_anonymously_and_writes_documents() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let mut session = Session::new();

        let family = membership.create_family(&mut session, " Smiths ", " secret1 ").await.unwrap();
        let actor = session.identity.clone().unwrap();
        assert!(actor.anonymous);
        assert_eq!(family.id, FamilyId::new("Smiths"));
        assert!(family.is_creator(&actor.id));
        assert_eq!(family.members.len(), 1);
        assert_eq!(family.members[0].expo_push_token, "");
        assert_eq!(family.password_hash, hash_password("secret1"));

        let stored = store.peek(&DocumentPath::family(&family.id)).unwrap();
        assert_eq!(stored["creatorId"], actor.id.as_str());
        assert_eq!(stored["createdAt"], "2025-01-01T00:00:00Z");

        let profile = membership.load_profile(&actor).await.unwrap().unwrap();
        assert_eq!(profile.family_id, Some(FamilyId::new("Smiths")));
        assert_eq!(profile.family_name.as_deref(), Some("Smiths"));
    }

    #[tokio::test]
    async fn second_create_reports_existing_family() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        membership.create_family(&mut alice(), "Smiths", "secret1").await.unwrap();

        let mut other = Session::new().with_identity(Identity::anonymous("b"));
        let result = membership.create_family(&mut other, "Smiths", "other").await;
        assert_eq!(
            result,
            Err(HouseholdError::FamilyAlreadyExists {
                name: "Smiths".to_string()
            })
        );

        let family = membership.load_family(&FamilyId::new("Smiths")).await.unwrap().unwrap();
        assert_eq!(family.creator_id, IdentityId::new("a"));
        assert_eq!(membership.load_profile(&Identity::anonymous("b")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_creates_have_one_winner() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let mut first = alice();
        let mut second = Session::new().with_identity(Identity::anonymous("b"));

        let (a, b) = tokio::join!(
            membership.create_family(&mut first, "Smiths", "one"),
            membership.create_family(&mut second, "Smiths", "two"),
        );
        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    }

    #[tokio::test]
    async fn join_unknown_family() {
        let membership = manager(&MockDocumentStore::new());
        let result = membership.join_family(&mut alice(), "Nobody", "x").await;
        assert_eq!(
            result,
            Err(HouseholdError::FamilyNotFound {
                name: "Nobody".to_string()
            })
        );
    }

    #[tokio::test]
    async fn rejoin_refreshes_token_in_place() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        membership.create_family(&mut alice(), "Smiths", "secret1").await.unwrap();

        let mut bob = Session::new()
            .with_identity(Identity::anonymous("b"))
            .with_push_token(PushToken::new("tok-b1"));
        membership.join_family(&mut bob, "Smiths", "secret1").await.unwrap();

        bob.push_token = Some(PushToken::new("tok-b2"));
        let family = membership.join_family(&mut bob, "Smiths", "secret1").await.unwrap();
        assert_eq!(family.members.len(), 2);
        assert_eq!(family.members[1].expo_push_token, "tok-b2");

        let again = membership.join_family(&mut bob, "Smiths", "secret1").await.unwrap();
        assert_eq!(again, family);
    }

    #[tokio::test]
    async fn leave_is_a_no_op_for_non_members() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let family = membership.create_family(&mut alice(), "Smiths", "secret1").await.unwrap();

        let outsider = Session::new().with_identity(Identity::anonymous("z"));
        membership.leave_family(&outsider, &family).await.unwrap();

        let stored = membership.load_family(&family.id).await.unwrap().unwrap();
        assert_eq!(stored.members.len(), 1);
    }

    #[tokio::test]
    async fn only_creator_can_delete() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let family = membership.create_family(&mut alice(), "Smiths", "secret1").await.unwrap();

        let mut bob = Session::new().with_identity(Identity::anonymous("b"));
        membership.join_family(&mut bob, "Smiths", "secret1").await.unwrap();
        assert_eq!(
            membership.delete_family(&bob, &family).await,
            Err(HouseholdError::NotCreator)
        );
        assert!(membership.load_family(&family.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn incomplete_cascade_keeps_family_for_retry() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let session = {
            let mut session = alice();
            membership.create_family(&mut session, "Smiths", "secret1").await.unwrap();
            session
        };
        let family = membership.load_family(&FamilyId::new("Smiths")).await.unwrap().unwrap();
        let items = CollectionPath::items(&family.id);
        store.add(&items, json!({ "name": "Milk" })).await.unwrap();
        store.add(&items, json!({ "name": "Eggs" })).await.unwrap();

        store.fail_writes_under("families/Smiths/items/");
        assert_eq!(
            membership.delete_family(&session, &family).await,
            Err(HouseholdError::CascadeIncomplete { failed: 2, total: 2 })
        );
        assert!(membership.load_family(&family.id).await.unwrap().is_some());

        store.clear_failures();
        let report = membership.delete_family(&session, &family).await.unwrap();
        assert_eq!(report.items_deleted, 2);
        assert!(store.list(&items).await.unwrap().is_empty());
        assert!(membership.load_family(&family.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn display_name_falls_back() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        assert_eq!(membership.family_display_name(&FamilyId::new("Nobody")).await, "My Family");

        membership.create_family(&mut alice(), "Smiths", "secret1").await.unwrap();
        assert_eq!(membership.family_display_name(&FamilyId::new("Smiths")).await, "Smiths");
    }

    #[tokio::test]
    async fn resolve_ignores_half_written_profile() {
        let store = MockDocumentStore::new();
        let membership = manager(&store);
        let identity = Identity::anonymous("x");
        store
            .merge(&DocumentPath::user(&identity.id), json!({ "id": "x", "familyId": "Smiths" }))
            .await
            .unwrap();
        assert_eq!(membership.resolve_current_family(&identity).await.unwrap(), None);
    }
}
