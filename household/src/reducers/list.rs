//! Shopping-list reducer.
//!
//! Holds the view of one family's list. Items only ever come from
//! subscription snapshots; mutations run as effects and report back with
//! `MutationSucceeded` or `MutationFailed`.

use crate::actions::ListAction;
use crate::environment::HouseholdEnvironment;
use crate::providers::{DocumentStore, LocalNotifier, PushGateway};
use crate::state::{Family, ListState, Session};
use crate::sync;
use homelist_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Environment of the shopping-list reducer: the backends plus who is
/// looking at which family.
#[derive(Clone)]
pub struct ListEnvironment<D, P, N>
where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    /// Backends and configuration.
    pub household: HouseholdEnvironment<D, P, N>,
    /// The viewer.
    pub session: Session,
    /// The family whose list is shown, with the roster used for fan-out.
    pub family: Family,
}

impl<D, P, N> ListEnvironment<D, P, N>
where
    D: DocumentStore,
    P: PushGateway,
    N: LocalNotifier,
{
    /// Bundle the pieces.
    #[must_use]
    pub const fn new(household: HouseholdEnvironment<D, P, N>, session: Session, family: Family) -> Self {
        Self {
            household,
            session,
            family,
        }
    }
}

/// Shopping-list reducer.
pub struct ShoppingListReducer<D, P, N> {
    _phantom: std::marker::PhantomData<(D, P, N)>,
}

impl<D, P, N> ShoppingListReducer<D, P, N> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<D, P, N> Default for ShoppingListReducer<D, P, N> {
    fn default() -> Self {
        Self::new()
    }
}

fn completion(result: crate::Result<impl Sized>) -> Option<ListAction> {
    Some(match result {
        Ok(_) => ListAction::MutationSucceeded,
        Err(error) => ListAction::MutationFailed { error },
    })
}

impl<D, P, N> Reducer for ShoppingListReducer<D, P, N>
where
    D: DocumentStore + Clone + 'static,
    P: PushGateway + Clone + 'static,
    N: LocalNotifier + Clone + 'static,
{
    type State = ListState;
    type Action = ListAction;
    type Environment = ListEnvironment<D, P, N>;

    fn reduce(
        &self,
        state: &mut ListState,
        action: ListAction,
        env: &ListEnvironment<D, P, N>,
    ) -> SmallVec<[Effect<ListAction>; 4]> {
        match action {
            ListAction::SnapshotReceived { items } => {
                state.items = items;
                smallvec![Effect::None]
            },

            ListAction::AddItem { draft } => {
                state.pending += 1;
                let env = env.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    completion(sync::add_item(&env.household, &env.session, &env.family, draft).await)
                }))]
            },

            ListAction::ToggleBought { item_id } => {
                let Some(item) = state.item(&item_id) else {
                    tracing::warn!(item = %item_id, "Toggle for an item not in the list");
                    return smallvec![Effect::None];
                };
                let (name, previous) = (item.name.clone(), item.bought);
                state.pending += 1;
                let env = env.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    completion(
                        sync::toggle_bought(&env.household, &env.session, &env.family, &item_id, &name, previous)
                            .await,
                    )
                }))]
            },

            ListAction::DeleteItem { item_id } => {
                let Some(item) = state.item(&item_id) else {
                    tracing::warn!(item = %item_id, "Delete for an item not in the list");
                    return smallvec![Effect::None];
                };
                let name = item.name.clone();
                state.pending += 1;
                let env = env.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    completion(sync::delete_item(&env.household, &env.session, &env.family, &item_id, &name).await)
                }))]
            },

            ListAction::MutationSucceeded => {
                state.pending = state.pending.saturating_sub(1);
                smallvec![Effect::None]
            },

            ListAction::MutationFailed { error } => {
                state.pending = state.pending.saturating_sub(1);
                tracing::debug!(error = %error, "List mutation failed");
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            ListAction::DismissError => {
                state.last_error = None;
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::HouseholdError;
    use crate::mocks::{MockDocumentStore, MockLocalNotifier, MockPushGateway};
    use crate::state::{FamilyId, Identity, IdentityId, Item, ItemDraft, ItemId, Quantity, Unit};
    use homelist_core::environment::Clock;
    use homelist_testing::{ReducerTest, assertions, test_clock};

    type Env = ListEnvironment<MockDocumentStore, MockPushGateway, MockLocalNotifier>;
    type Subject = ShoppingListReducer<MockDocumentStore, MockPushGateway, MockLocalNotifier>;

    fn env() -> Env {
        let household = HouseholdEnvironment::new(
            MockDocumentStore::new(),
            MockPushGateway::new(),
            MockLocalNotifier::new(),
        )
        .with_clock(test_clock());
        let family = Family {
            id: FamilyId::new("Smiths"),
            name: "Smiths".to_string(),
            password_hash: String::new(),
            creator_id: IdentityId::new("a"),
            members: Vec::new(),
            created_at: test_clock().now(),
        };
        ListEnvironment::new(household, Session::new().with_identity(Identity::anonymous("a")), family)
    }

    fn milk(bought: bool) -> Item {
        Item {
            id: ItemId::new("i1"),
            name: "Milk".to_string(),
            quantity: Quantity::Number(2.0),
            unit: Unit::L,
            due_date: None,
            date_added: test_clock().now(),
            bought,
            added_by: "Alice".to_string(),
            added_by_id: Some(IdentityId::new("a")),
        }
    }

    #[test]
    fn snapshot_replaces_items() {
        ReducerTest::new(Subject::new())
            .with_env(env())
            .given_state(ListState {
                items: vec![milk(false)],
                ..ListState::default()
            })
            .when_action(ListAction::SnapshotReceived { items: vec![] })
            .then_state(|state| assert!(state.items.is_empty()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn add_starts_a_mutation() {
        ReducerTest::new(Subject::new())
            .with_env(env())
            .given_state(ListState::default())
            .when_action(ListAction::AddItem {
                draft: ItemDraft::new("Milk", "2"),
            })
            .then_state(|state| {
                assert_eq!(state.pending, 1);
                assert!(state.items.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn toggle_unknown_item_does_nothing() {
        ReducerTest::new(Subject::new())
            .with_env(env())
            .given_state(ListState::default())
            .when_action(ListAction::ToggleBought {
                item_id: ItemId::new("missing"),
            })
            .then_state(|state| assert_eq!(state.pending, 0))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn failure_is_kept_until_dismissed() {
        ReducerTest::new(Subject::new())
            .with_env(env())
            .given_state(ListState {
                items: vec![milk(false)],
                ..ListState::default()
            })
            .when_action(ListAction::DeleteItem {
                item_id: ItemId::new("i1"),
            })
            .when_action(ListAction::MutationFailed {
                error: HouseholdError::Backend("offline".to_string()),
            })
            .then_state(|state| {
                assert_eq!(state.pending, 0);
                assert_eq!(
                    state.last_error,
                    Some(HouseholdError::Backend("offline".to_string()))
                );
            })
            .run();

        ReducerTest::new(Subject::new())
            .with_env(env())
            .given_state(ListState {
                last_error: Some(HouseholdError::WrongPassword),
                ..ListState::default()
            })
            .when_action(ListAction::DismissError)
            .then_state(|state| assert_eq!(state.last_error, None))
            .run();
    }

    #[tokio::test]
    async fn toggle_effect_reports_success() {
        let env = env();
        let id = env
            .household
            .documents
            .add(
                &crate::providers::CollectionPath::items(&env.family.id),
                serde_json::to_value(milk(false)).unwrap(),
            )
            .await
            .unwrap();
        let mut state = ListState {
            items: vec![Item {
                id: ItemId::new(id.clone()),
                ..milk(false)
            }],
            ..ListState::default()
        };

        let mut effects = Subject::new().reduce(
            &mut state,
            ListAction::ToggleBought {
                item_id: ItemId::new(id),
            },
            &env,
        );
        let Some(Effect::Future(future)) = effects.pop() else {
            unreachable!("toggle produces one future");
        };
        assert_eq!(future.await, Some(ListAction::MutationSucceeded));
    }
}
