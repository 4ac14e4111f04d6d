//! Notification fan-out.
//!
//! A list change is announced to every other member of the family whose
//! device registered a push token, in a single push batch. Delivery is best
//! effort: nothing is retried and no per-recipient outcome is reported.

use crate::error::Result;
use crate::providers::{PushGateway, PushMessage};
use crate::state::{Family, FamilyId, IdentityId, Member, PushToken};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Kind of list change carried in a notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListEvent {
    /// An item was added.
    ItemAdded,
    /// An item was marked bought.
    ItemPurchased,
    /// An item was deleted.
    ItemRemoved,
}

/// Title, body and payload of one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNotice {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Payload for the receiving app.
    pub data: Value,
    /// Sound name.
    pub sound: String,
}

impl ListNotice {
    fn new(title: &str, body: String, data: Value) -> Self {
        Self {
            title: title.to_string(),
            body,
            data,
            sound: "default".to_string(),
        }
    }

    /// Sent to other members after `added_by` added an item.
    #[must_use]
    pub fn item_added(family: &Family, item_name: &str, added_by: &str) -> Self {
        Self::new(
            "🛒 New Item Added",
            format!("{added_by} added \"{item_name}\" to {} shopping list", family.label()),
            json!({
                "familyName": family.id,
                "itemName": item_name,
                "addedBy": added_by,
                "screen": "ShoppingList",
                "action": ListEvent::ItemAdded,
            }),
        )
    }

    /// Sent to other members after `purchased_by` marked an item bought.
    #[must_use]
    pub fn item_purchased(family: &Family, item_name: &str, purchased_by: &str) -> Self {
        Self::new(
            "✅ Item Purchased",
            format!("{purchased_by} bought \"{item_name}\" from {} list", family.label()),
            json!({
                "familyName": family.id,
                "itemName": item_name,
                "purchasedBy": purchased_by,
                "action": ListEvent::ItemPurchased,
            }),
        )
    }

    /// Sent to other members after `removed_by` deleted an item.
    #[must_use]
    pub fn item_removed(family: &Family, item_name: &str, removed_by: &str) -> Self {
        Self::new(
            "🗑️ Item Removed",
            format!("{removed_by} removed \"{item_name}\" from {} list", family.label()),
            json!({
                "familyName": family.id,
                "itemName": item_name,
                "removedBy": removed_by,
                "action": ListEvent::ItemRemoved,
            }),
        )
    }

    /// Shown on the actor's own device after an add.
    #[must_use]
    pub fn added_confirmation(family: &Family, item_name: &str) -> Self {
        Self::new(
            "✅ Item Added",
            format!("\"{item_name}\" has been added to the list"),
            json!({
                "familyName": family.id,
                "itemName": item_name,
            }),
        )
    }

    /// Set the sound.
    #[must_use]
    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = sound.into();
        self
    }

    fn message_to(&self, token: PushToken) -> PushMessage {
        PushMessage {
            to: token,
            sound: self.sound.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            data: self.data.clone(),
        }
    }
}

/// Push tokens of every member except `exclude` that registered one.
///
/// Roster order is kept.
#[must_use]
pub fn fan_out_targets(members: &[Member], exclude: &IdentityId) -> Vec<PushToken> {
    members
        .iter()
        .filter(|member| &member.id != exclude && member.has_push_token())
        .map(|member| PushToken::new(member.expo_push_token.clone()))
        .collect()
}

/// Send `notice` to every member but `exclude`.
///
/// Makes no request when nobody is reachable; otherwise makes exactly one.
/// Returns the number of recipients.
///
/// # Errors
///
/// Returns the gateway's error. Callers that treat notifications as
/// best-effort log and drop it.
#[tracing::instrument(skip(gateway, members, notice), fields(title = %notice.title))]
pub async fn fan_out<P: PushGateway>(
    gateway: &P,
    members: &[Member],
    exclude: &IdentityId,
    notice: &ListNotice,
) -> Result<usize> {
    let targets = fan_out_targets(members, exclude);
    if targets.is_empty() {
        tracing::debug!("No other member can receive pushes");
        return Ok(0);
    }

    let count = targets.len();
    let messages = targets
        .into_iter()
        .map(|token| notice.message_to(token))
        .collect();
    gateway.send(messages).await?;

    tracing::debug!(recipients = count, "Fan-out sent");
    Ok(count)
}

/// A received notification payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Family the change happened in.
    #[serde(default)]
    pub family_name: Option<String>,
    /// Item concerned.
    #[serde(default)]
    pub item_name: Option<String>,
    /// Kind of change.
    #[serde(default)]
    pub action: Option<ListEvent>,
    /// Screen to open.
    #[serde(default)]
    pub screen: Option<String>,
}

impl NotificationPayload {
    /// Read a payload, ignoring anything unrecognised.
    #[must_use]
    pub fn from_data(data: &Value) -> Self {
        serde_json::from_value(data.clone()).unwrap_or_default()
    }

    /// Family to switch to when the notification is opened while viewing
    /// `current`; `None` if it is the same family or the payload names none.
    #[must_use]
    pub fn target_family(&self, current: &FamilyId) -> Option<FamilyId> {
        self.family_name
            .as_deref()
            .filter(|name| !name.is_empty() && *name != current.as_str())
            .map(FamilyId::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockPushGateway;
    use chrono::Utc;
    use proptest::prelude::*;

    fn member(id: &str, token: &str) -> Member {
        Member {
            id: IdentityId::new(id),
            display_name: id.to_uppercase(),
            expo_push_token: token.to_string(),
        }
    }

    fn smiths(members: Vec<Member>) -> Family {
        Family {
            id: FamilyId::new("Smiths"),
            name: "Smiths".to_string(),
            password_hash: String::new(),
            creator_id: IdentityId::new("a"),
            members,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn targets_skip_actor_and_missing_tokens() {
        let members = vec![member("a", "tok-a"), member("b", "tok-b"), member("c", "")];
        let targets = fan_out_targets(&members, &IdentityId::new("a"));
        assert_eq!(targets, vec![PushToken::new("tok-b")]);
    }

    #[tokio::test]
    async fn lone_member_sends_nothing() {
        let gateway = MockPushGateway::new();
        let members = vec![member("a", "tok-a")];
        let notice = ListNotice::item_added(&smiths(members.clone()), "Milk", "A");
        let sent = fan_out(&gateway, &members, &IdentityId::new("a"), &notice).await.unwrap();
        assert_eq!(sent, 0);
        assert!(gateway.batches().is_empty());
    }

    #[tokio::test]
    async fn one_batch_for_all_targets() {
        let gateway = MockPushGateway::new();
        let members = vec![member("a", "tok-a"), member("b", "tok-b"), member("c", "tok-c")];
        let notice = ListNotice::item_purchased(&smiths(members.clone()), "Milk", "A");
        fan_out(&gateway, &members, &IdentityId::new("a"), &notice).await.unwrap();

        let batches = gateway.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0].iter().all(|m| m.title == "✅ Item Purchased"));
        assert_eq!(batches[0][0].body, "A bought \"Milk\" from Smiths list");
    }

    #[tokio::test]
    async fn gateway_failure_is_returned() {
        let gateway = MockPushGateway::failing();
        let members = vec![member("a", ""), member("b", "tok-b")];
        let notice = ListNotice::item_removed(&smiths(members.clone()), "Milk", "A");
        assert!(fan_out(&gateway, &members, &IdentityId::new("a"), &notice).await.is_err());
    }

    #[test]
    fn notice_texts_and_payloads() {
        let family = smiths(vec![]);
        let added = ListNotice::item_added(&family, "Milk", "Alice");
        assert_eq!(added.body, "Alice added \"Milk\" to Smiths shopping list");
        assert_eq!(added.data["screen"], "ShoppingList");
        assert_eq!(added.data["action"], "item_added");
        assert_eq!(added.data["addedBy"], "Alice");

        let removed = ListNotice::item_removed(&family, "Milk", "Someone");
        assert_eq!(removed.title, "🗑️ Item Removed");
        assert_eq!(removed.data["removedBy"], "Someone");

        let confirmation = ListNotice::added_confirmation(&family, "Milk");
        assert_eq!(confirmation.body, "\"Milk\" has been added to the list");
        assert!(confirmation.data.get("action").is_none());
    }

    #[test]
    fn payload_targets_other_family_only() {
        let notice = ListNotice::item_added(&smiths(vec![]), "Milk", "Alice");
        let payload = NotificationPayload::from_data(&notice.data);
        assert_eq!(payload.action, Some(ListEvent::ItemAdded));
        assert_eq!(payload.target_family(&FamilyId::new("Smiths")), None);
        assert_eq!(
            payload.target_family(&FamilyId::new("Joneses")),
            Some(FamilyId::new("Smiths"))
        );
        assert_eq!(
            NotificationPayload::from_data(&Value::String("junk".into())),
            NotificationPayload::default()
        );
    }

    proptest! {
        #[test]
        fn target_count_matches_reachable_others(
            tokens in proptest::collection::vec(any::<bool>(), 1..12),
            actor in 0usize..12,
        ) {
            let members: Vec<Member> = tokens
                .iter()
                .enumerate()
                .map(|(i, has)| member(&format!("m{i}"), if *has { "tok" } else { "" }))
                .collect();
            let actor = actor % members.len();
            let exclude = IdentityId::new(format!("m{actor}"));

            let with_token = tokens.iter().filter(|has| **has).count();
            let expected = with_token - usize::from(tokens[actor]);

            let targets = fan_out_targets(&members, &exclude);
            prop_assert_eq!(targets.len(), expected);
            if members.len() == 1 {
                prop_assert!(targets.is_empty());
            }
        }
    }
}
