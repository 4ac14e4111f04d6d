//! Shopping list demo binary
//!
//! Alice and Bob share one in-memory document store: Alice creates the
//! "Smiths" family, Bob joins, and both work on the same list.
//!
//! Push messages are recorded in memory unless `HOMELIST_PUSH_ENDPOINT` is
//! set, in which case they are posted to that endpoint.

use homelist_household::mocks::{
    MockDeviceRegistration, MockDocumentStore, MockIdentityProvider, MockLocalNotifier, MockPushGateway,
};
use homelist_household::providers::{ExpoPushGateway, PushGateway};
use homelist_household::reducers::ListEnvironment;
use homelist_household::{
    Accounts, FamilyMembership, HouseholdConfig, HouseholdEnvironment, ItemDraft, ListAction, PushConfig,
    ShoppingListSession, Unit, sync,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WAIT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,homelist_household=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Shopping List Demo ===\n");

    match std::env::var("HOMELIST_PUSH_ENDPOINT") {
        Ok(endpoint) => {
            let push = PushConfig::new(endpoint);
            let gateway = ExpoPushGateway::new(push.clone())?;
            run(gateway, HouseholdConfig::default().with_push(push)).await
        },
        Err(_) => {
            let gateway = MockPushGateway::new();
            run(gateway.clone(), HouseholdConfig::default()).await?;

            println!("\nPush messages recorded:");
            for message in gateway.messages() {
                println!("  -> {}: {} | {}", message.to, message.title, message.body);
            }
            Ok(())
        },
    }
}

async fn run<P>(push: P, config: HouseholdConfig) -> anyhow::Result<()>
where
    P: PushGateway + Clone + 'static,
{
    let documents = MockDocumentStore::new();

    // Two devices, each with its own sign-in state.
    let alice_identity = MockIdentityProvider::new();
    let bob_identity = MockIdentityProvider::new();

    let alice_accounts = Accounts::new(alice_identity.clone());
    alice_accounts.register("alice@example.com", "hunter22", "Alice").await?;
    let mut alice = alice_accounts.session();
    alice
        .register_device(&MockDeviceRegistration::with_token("ExponentPushToken[alice]"))
        .await;

    let bob_accounts = Accounts::new(bob_identity.clone());
    bob_accounts.register("bob@example.com", "hunter33", "Bob").await?;
    let mut bob = bob_accounts.session();
    bob.register_device(&MockDeviceRegistration::with_token("ExponentPushToken[bob]"))
        .await;

    let alice_family = FamilyMembership::new(alice_identity, documents.clone()).with_config(config.clone());
    let bob_family = FamilyMembership::new(bob_identity, documents.clone()).with_config(config.clone());

    println!(">>> Alice creates \"Smiths\"");
    alice_family.create_family(&mut alice, "Smiths", "secret1").await?;

    println!(">>> Bob joins with the wrong password");
    if let Err(e) = bob_family.join_family(&mut bob, "Smiths", "secret2").await {
        println!("    {}", e.user_message());
    }

    println!(">>> Bob joins");
    let family = bob_family.join_family(&mut bob, "Smiths", "secret1").await?;
    println!("    Members: {}", family.members.len());

    let env = |push: P| {
        HouseholdEnvironment::new(documents.clone(), push, MockLocalNotifier::new()).with_config(config.clone())
    };
    let alice_env = env(push.clone());
    let bob_env = env(push);

    // Alice's list screen.
    let mut screen = ShoppingListSession::open(ListEnvironment::new(alice_env, alice.clone(), family.clone())).await?;

    println!("\n>>> Alice adds milk and bread");
    screen
        .dispatch(ListAction::AddItem {
            draft: ItemDraft::new("Milk", "2").with_unit(Unit::L),
        })
        .await?;
    screen
        .dispatch(ListAction::AddItem {
            draft: ItemDraft::new("Bread", "1").with_unit(Unit::Pack),
        })
        .await?;
    screen.wait_until(WAIT, |state| state.items.len() == 2).await;
    print_list(&screen.items().await);

    println!("\n>>> Bob buys the milk");
    let milk = screen
        .items()
        .await
        .into_iter()
        .find(|item| item.name == "Milk")
        .ok_or_else(|| anyhow::anyhow!("milk missing from the list"))?;
    sync::toggle_bought(&bob_env, &bob, &family, &milk.id, &milk.name, milk.bought).await?;
    screen
        .wait_until(WAIT, |state| state.item(&milk.id).is_some_and(|item| item.bought))
        .await;
    print_list(&screen.items().await);

    screen.close().await?;

    println!("\n>>> Alice deletes the family");
    let report = alice_family.delete_family(&alice, &family).await?;
    println!("    Items deleted: {}", report.items_deleted);

    let bob_now = bob.actor()?.clone();
    match bob_family.resolve_current_family(&bob_now).await? {
        Some(current) => println!("    Bob is still in {}", current.family_name),
        None => println!("    Bob has no family"),
    }

    Ok(())
}

fn print_list(items: &[homelist_household::Item]) {
    for item in items {
        let mark = if item.bought { "x" } else { " " };
        println!("    [{mark}] {} ({:?} {}) by {}", item.name, item.quantity, item.unit, item.added_by);
    }
}
