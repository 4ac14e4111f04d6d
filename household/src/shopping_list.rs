//! A live shopping-list screen.
//!
//! Couples an [`ItemSubscription`] to a [`Store`] running the
//! [`ShoppingListReducer`]: a background task feeds every snapshot into the
//! store as [`ListAction::SnapshotReceived`].

use crate::actions::ListAction;
use crate::error::Result;
use crate::providers::{DocumentStore, LocalNotifier, PushGateway};
use crate::reducers::{ListEnvironment, ShoppingListReducer};
use crate::state::{Item, ListState};
use crate::sync::{self, ItemSubscription};
use homelist_runtime::Store;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long [`ShoppingListSession::close`] waits for in-flight mutations.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Store type driving one list screen.
pub type ListStore<D, P, N> = Store<ListState, ListAction, ListEnvironment<D, P, N>, ShoppingListReducer<D, P, N>>;

/// An open shopping-list screen.
///
/// Call [`ShoppingListSession::close`] when the screen goes away. Dropping
/// the session also stops the subscription.
pub struct ShoppingListSession<D, P, N>
where
    D: DocumentStore + Clone + 'static,
    P: PushGateway + Clone + 'static,
    N: LocalNotifier + Clone + 'static,
{
    store: ListStore<D, P, N>,
    pump: Option<JoinHandle<()>>,
    snapshots: watch::Receiver<u64>,
}

impl<D, P, N> ShoppingListSession<D, P, N>
where
    D: DocumentStore + Clone + 'static,
    P: PushGateway + Clone + 'static,
    N: LocalNotifier + Clone + 'static,
{
    /// Subscribe to the family's items and start feeding the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the subscription cannot be opened.
    #[tracing::instrument(skip(env), fields(family = %env.family.id))]
    pub async fn open(env: ListEnvironment<D, P, N>) -> Result<Self> {
        let subscription = sync::subscribe(&env.household.documents, &env.family.id).await?;
        let store = Store::new(ListState::default(), ShoppingListReducer::new(), env);
        let (revision, snapshots) = watch::channel(0);
        let pump = tokio::spawn(pump_snapshots(subscription, store.clone(), revision));

        Ok(Self {
            store,
            pump: Some(pump),
            snapshots,
        })
    }

    /// The underlying store, for sending commands and reading state.
    #[must_use]
    pub const fn store(&self) -> &ListStore<D, P, N> {
        &self.store
    }

    /// Send a command and wait until its mutation has reported back.
    ///
    /// # Errors
    ///
    /// Returns [`homelist_runtime::StoreError`] if the store is shutting down.
    pub async fn dispatch(&self, action: ListAction) -> std::result::Result<(), homelist_runtime::StoreError> {
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(())
    }

    /// Current items.
    pub async fn items(&self) -> Vec<Item> {
        self.store.state(|state| state.items.clone()).await
    }

    /// Wait until the list state satisfies `predicate`, re-checking after
    /// every snapshot. Returns `false` on timeout.
    pub async fn wait_until<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&ListState) -> bool,
    {
        let mut snapshots = self.snapshots.clone();
        let check = async {
            loop {
                if self.store.state(&predicate).await {
                    return true;
                }
                if snapshots.changed().await.is_err() {
                    return self.store.state(&predicate).await;
                }
            }
        };
        tokio::time::timeout(timeout, check).await.unwrap_or(false)
    }

    /// Stop the subscription, release its backend listener and let
    /// in-flight mutations finish. Commands sent afterwards are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`homelist_runtime::StoreError::ShutdownTimeout`] if mutations
    /// are still running after [`CLOSE_TIMEOUT`].
    pub async fn close(&mut self) -> std::result::Result<(), homelist_runtime::StoreError> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
        }

        self.store
            .shutdown(CLOSE_TIMEOUT)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Shopping list closed with mutations pending"))?;
        tracing::debug!("Shopping list closed");
        Ok(())
    }
}

impl<D, P, N> Drop for ShoppingListSession<D, P, N>
where
    D: DocumentStore + Clone + 'static,
    P: PushGateway + Clone + 'static,
    N: LocalNotifier + Clone + 'static,
{
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn pump_snapshots<D, P, N>(
    mut subscription: ItemSubscription,
    store: ListStore<D, P, N>,
    revision: watch::Sender<u64>,
) where
    D: DocumentStore + Clone + 'static,
    P: PushGateway + Clone + 'static,
    N: LocalNotifier + Clone + 'static,
{
    while let Some(items) = subscription.next().await {
        if store.send(ListAction::SnapshotReceived { items }).await.is_err() {
            break;
        }
        revision.send_modify(|r| *r += 1);
    }
    subscription.close();
}
