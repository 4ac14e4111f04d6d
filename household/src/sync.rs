//! Shared list synchronization.
//!
//! The live subscription is the only source of displayed items: mutations
//! write to the store and the resulting snapshot brings the change back.
//! After a successful write the other members are notified; a failed
//! notification is logged and never undoes or fails the write.

use crate::environment::HouseholdEnvironment;
use crate::error::{HouseholdError, Result};
use crate::fanout::{ListNotice, fan_out};
use crate::providers::{
    CollectionPath, CollectionSubscription, DocumentPath, DocumentStore, LocalNotifier, PushGateway,
};
use crate::state::{Family, FamilyId, Item, ItemDraft, ItemId, Session};
use crate::utils::{parse_quantity, require};
use serde_json::json;

/// Live item list of one family.
///
/// Every call to [`ItemSubscription::next`] yields the complete list. Close
/// the subscription when the list is no longer shown; dropping it has the
/// same effect.
#[derive(Debug)]
pub struct ItemSubscription {
    family_id: FamilyId,
    inner: CollectionSubscription,
}

impl ItemSubscription {
    /// Family being watched.
    #[must_use]
    pub const fn family_id(&self) -> &FamilyId {
        &self.family_id
    }

    /// Wait for the next full list, in store order.
    ///
    /// Documents that cannot be decoded are skipped. Returns `None` after
    /// [`ItemSubscription::close`].
    pub async fn next(&mut self) -> Option<Vec<Item>> {
        let documents = self.inner.next().await?;
        Some(
            documents
                .into_iter()
                .filter_map(|document| {
                    let id = document.id.clone();
                    Item::from_document(document)
                        .inspect_err(|e| tracing::warn!(item = %id, error = %e, "Skipping malformed item"))
                        .ok()
                })
                .collect(),
        )
    }

    /// Stop delivery and release the backend listener.
    pub fn close(&mut self) {
        if !self.inner.is_closed() {
            tracing::debug!(family = %self.family_id, "Closing item subscription");
        }
        self.inner.close();
    }
}

/// Open a live subscription on `family_id`'s items.
///
/// # Errors
///
/// Returns the store's error if the listener cannot be registered.
#[tracing::instrument(skip(documents))]
pub async fn subscribe<D: DocumentStore>(documents: &D, family_id: &FamilyId) -> Result<ItemSubscription> {
    let inner = documents.subscribe(&CollectionPath::items(family_id)).await?;
    Ok(ItemSubscription {
        family_id: family_id.clone(),
        inner,
    })
}

/// Add an item to the family list.
///
/// The draft's name is trimmed; its quantity becomes a number when it
/// parses as one. On success the other members get an "item added" push and
/// the actor gets a local confirmation.
///
/// # Errors
///
/// - [`HouseholdError::Validation`] if name or quantity is blank
/// - [`HouseholdError::NotSignedIn`] without a session identity
/// - [`HouseholdError::Backend`] if the write fails (nobody is notified)
#[tracing::instrument(skip(env, session, family, draft), fields(family = %family.id))]
pub async fn add_item<D, P, N>(
    env: &HouseholdEnvironment<D, P, N>,
    session: &Session,
    family: &Family,
    draft: ItemDraft,
) -> Result<ItemId>
where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    const MISSING: &str = "Please enter an item name and quantity.";
    let name = require(&draft.name, MISSING)?.to_string();
    let quantity = parse_quantity(require(&draft.quantity, MISSING)?);
    let actor = session.actor()?;
    let added_by = actor.name_or(&env.config.unknown_author).to_string();

    let item = Item {
        id: ItemId::default(),
        name: name.clone(),
        quantity,
        unit: draft.unit,
        due_date: draft.due_date,
        date_added: env.clock.now(),
        bought: false,
        added_by: added_by.clone(),
        added_by_id: Some(actor.id.clone()),
    };

    let id = env
        .documents
        .add(&CollectionPath::items(&family.id), serde_json::to_value(&item)?)
        .await
        .map_err(backend_failure("add item"))?;
    let id = ItemId::new(id);
    tracing::debug!(item = %id, "Item added");

    let notice = ListNotice::item_added(family, &name, &added_by).with_sound(&env.config.push.sound);
    notify_members(env, session, family, &notice).await;

    let confirmation = ListNotice::added_confirmation(family, &name);
    if let Err(e) = env
        .notifier
        .notify(&confirmation.title, &confirmation.body, confirmation.data)
        .await
    {
        tracing::warn!(error = %e, "Local confirmation failed");
    }

    Ok(id)
}

/// Flip an item's bought flag from `previous`, returning the new value.
///
/// Only marking an item bought notifies the other members; un-marking is
/// silent.
///
/// # Errors
///
/// - [`HouseholdError::NotSignedIn`] without a session identity
/// - [`HouseholdError::Backend`] if the write fails (nobody is notified)
#[tracing::instrument(skip(env, session, family), fields(family = %family.id))]
pub async fn toggle_bought<D, P, N>(
    env: &HouseholdEnvironment<D, P, N>,
    session: &Session,
    family: &Family,
    item_id: &ItemId,
    item_name: &str,
    previous: bool,
) -> Result<bool>
where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    let actor = session.actor()?;
    let bought = !previous;

    env.documents
        .update(&DocumentPath::item(&family.id, item_id), json!({ "bought": bought }))
        .await
        .map_err(backend_failure("update item"))?;

    if bought {
        let purchased_by = actor.name_or(&env.config.anonymous_actor);
        let notice = ListNotice::item_purchased(family, item_name, purchased_by).with_sound(&env.config.push.sound);
        notify_members(env, session, family, &notice).await;
    }

    Ok(bought)
}

/// Delete an item and tell the other members.
///
/// # Errors
///
/// - [`HouseholdError::NotSignedIn`] without a session identity
/// - [`HouseholdError::Backend`] if the delete fails (nobody is notified)
#[tracing::instrument(skip(env, session, family), fields(family = %family.id))]
pub async fn delete_item<D, P, N>(
    env: &HouseholdEnvironment<D, P, N>,
    session: &Session,
    family: &Family,
    item_id: &ItemId,
    item_name: &str,
) -> Result<()>
where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    let actor = session.actor()?;

    env.documents
        .delete(&DocumentPath::item(&family.id, item_id))
        .await
        .map_err(backend_failure("delete item"))?;

    let removed_by = actor.name_or(&env.config.anonymous_actor);
    let notice = ListNotice::item_removed(family, item_name, removed_by).with_sound(&env.config.push.sound);
    notify_members(env, session, family, &notice).await;

    Ok(())
}

async fn notify_members<D, P, N>(
    env: &HouseholdEnvironment<D, P, N>,
    session: &Session,
    family: &Family,
    notice: &ListNotice,
) where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    let Some(actor) = session.identity.as_ref() else {
        return;
    };
    if let Err(e) = fan_out(&env.push, &family.members, &actor.id, notice).await {
        tracing::warn!(error = %e, "Notification fan-out failed");
    }
}

fn backend_failure(operation: &'static str) -> impl Fn(HouseholdError) -> HouseholdError {
    move |error| {
        tracing::error!(error = %error, "Failed to {operation}");
        match error {
            HouseholdError::Backend(_) => error,
            other => HouseholdError::Backend(other.to_string()),
        }
    }
}
