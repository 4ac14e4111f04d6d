//! Household data model.
//!
//! Documents are stored with camelCase field names. Document ids (family id,
//! item id) are not part of the stored body; they are attached when a
//! document is read back.

use crate::error::{HouseholdError, Result};
use crate::providers::{DeviceRegistration, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identity id assigned by the identity backend.
    IdentityId
);
string_id!(
    /// Family id. Equal to the trimmed name the creator typed.
    FamilyId
);
string_id!(
    /// Item id assigned by the document store.
    ItemId
);
string_id!(
    /// Device push token.
    PushToken
);

impl PushToken {
    /// `true` when no device token was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Backend-assigned id.
    pub id: IdentityId,
    /// Name shown to other members.
    pub display_name: Option<String>,
    /// Email, absent for anonymous identities.
    pub email: Option<String>,
    /// Created by an anonymous sign-in.
    pub anonymous: bool,
}

impl Identity {
    /// An email account without a display name.
    #[must_use]
    pub fn registered(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(id),
            display_name: None,
            email: Some(email.into()),
            anonymous: false,
        }
    }

    /// An anonymous account.
    #[must_use]
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(id),
            display_name: None,
            email: None,
            anonymous: true,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// The display name, or `fallback` when unset or blank.
    #[must_use]
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(fallback)
    }
}

/// Per-device context threaded into every membership and list call.
///
/// Replaces any notion of an ambient "current user".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Signed-in identity, if any.
    pub identity: Option<Identity>,
    /// This device's push token, if registration succeeded.
    pub push_token: Option<PushToken>,
}

impl Session {
    /// A session with no identity and no push token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Attach a push token.
    #[must_use]
    pub fn with_push_token(mut self, token: PushToken) -> Self {
        self.push_token = Some(token);
        self
    }

    /// The signed-in identity.
    ///
    /// # Errors
    ///
    /// Returns [`HouseholdError::NotSignedIn`] if the session has none.
    pub fn actor(&self) -> Result<&Identity> {
        self.identity.as_ref().ok_or(HouseholdError::NotSignedIn)
    }

    /// Push token as stored in a member record (empty when absent).
    #[must_use]
    pub fn stored_token(&self) -> String {
        self.push_token
            .as_ref()
            .map(|token| token.as_str().to_string())
            .unwrap_or_default()
    }

    /// Ask the device for a push token and keep it on the session.
    ///
    /// A device without a token leaves the session usable; fan-out simply
    /// never reaches it.
    pub async fn register_device<R: DeviceRegistration>(&mut self, registration: &R) {
        self.push_token = registration.push_token().await;
        if self.push_token.is_none() {
            tracing::info!("No push token for this device; notifications disabled");
        }
    }
}

/// A family member as embedded in the family document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member identity.
    pub id: IdentityId,
    /// Name at the time of joining.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    /// Device push token, empty when the member has none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expo_push_token: String,
}

impl Member {
    /// `true` if notifications can reach this member.
    #[must_use]
    pub fn has_push_token(&self) -> bool {
        !self.expo_push_token.is_empty()
    }
}

/// A family: a named group sharing one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    /// Document id.
    #[serde(skip)]
    pub id: FamilyId,
    /// Display name.
    pub name: String,
    /// Hex SHA-256 of the trimmed password.
    #[serde(rename = "password")]
    pub password_hash: String,
    /// Identity that created the family.
    pub creator_id: IdentityId,
    /// Members in join order.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Family {
    /// Decode a family document body.
    ///
    /// # Errors
    ///
    /// Returns [`HouseholdError::Serialization`] if the body is malformed.
    pub fn from_document(id: FamilyId, data: serde_json::Value) -> Result<Self> {
        let mut family: Self = serde_json::from_value(data)?;
        family.id = id;
        Ok(family)
    }

    /// `true` if `id` created this family.
    #[must_use]
    pub fn is_creator(&self, id: &IdentityId) -> bool {
        &self.creator_id == id
    }

    /// Member record for `id`.
    #[must_use]
    pub fn member(&self, id: &IdentityId) -> Option<&Member> {
        self.members.iter().find(|member| &member.id == id)
    }

    /// Label used in notification bodies.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// Which family an identity points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRef {
    /// Family id.
    pub family_id: FamilyId,
    /// Family display name.
    pub family_name: String,
}

/// Per-identity profile at `users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity id.
    pub id: IdentityId,
    /// Current family, if any.
    #[serde(default)]
    pub family_id: Option<FamilyId>,
    /// Current family name, if any.
    #[serde(default)]
    pub family_name: Option<String>,
    /// Display name at the last write.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Last write time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// The family pointer, present only when both id and name are set.
    #[must_use]
    pub fn family_ref(&self) -> Option<FamilyRef> {
        let family_id = self.family_id.as_ref().filter(|id| !id.as_str().is_empty())?;
        let family_name = self.family_name.as_ref().filter(|name| !name.is_empty())?;
        Some(FamilyRef {
            family_id: family_id.clone(),
            family_name: family_name.clone(),
        })
    }
}

/// Unit of measure for an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Pieces.
    #[default]
    #[serde(rename = "pcs")]
    Pcs,
    /// Kilograms.
    #[serde(rename = "kg")]
    Kg,
    /// Grams.
    #[serde(rename = "g")]
    G,
    /// Litres.
    #[serde(rename = "L")]
    L,
    /// Millilitres.
    #[serde(rename = "mL")]
    Ml,
    /// Packs.
    #[serde(rename = "pack")]
    Pack,
    /// Boxes.
    #[serde(rename = "box")]
    Box,
}

impl Unit {
    /// Every unit, in picker order.
    pub const ALL: [Self; 7] = [
        Self::Pcs,
        Self::Kg,
        Self::G,
        Self::L,
        Self::Ml,
        Self::Pack,
        Self::Box,
    ];

    /// Stored symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Pcs => "pcs",
            Self::Kg => "kg",
            Self::G => "g",
            Self::L => "L",
            Self::Ml => "mL",
            Self::Pack => "pack",
            Self::Box => "box",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = HouseholdError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.symbol() == s)
            .ok_or_else(|| HouseholdError::Validation(format!("Unknown unit {s:?}")))
    }
}

/// Item quantity: numeric when the input parsed as a number, else free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// Numeric quantity.
    Number(f64),
    /// Free-text quantity such as "a few".
    Text(String),
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A shopping-list entry at `families/{family}/items/{item}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Document id.
    #[serde(skip)]
    pub id: ItemId,
    /// Item name.
    pub name: String,
    /// Amount to buy.
    pub quantity: Quantity,
    /// Unit of `quantity`.
    #[serde(default)]
    pub unit: Unit,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// When the item was added.
    pub date_added: DateTime<Utc>,
    /// Whether someone bought it.
    #[serde(default)]
    pub bought: bool,
    /// Display name of whoever added it.
    #[serde(default)]
    pub added_by: String,
    /// Identity of whoever added it.
    #[serde(default)]
    pub added_by_id: Option<IdentityId>,
}

impl Item {
    /// Decode an item document.
    ///
    /// # Errors
    ///
    /// Returns [`HouseholdError::Serialization`] if the body is malformed.
    pub fn from_document(document: Document) -> Result<Self> {
        let mut item: Self = serde_json::from_value(document.data)?;
        item.id = ItemId::new(document.id);
        Ok(item)
    }

    /// Past its due date and still not bought.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.bought && self.due_date.is_some_and(|due| due < now)
    }
}

/// Form input for a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    /// Raw name input.
    pub name: String,
    /// Raw quantity input.
    pub quantity: String,
    /// Selected unit.
    pub unit: Unit,
    /// Selected due date.
    pub due_date: Option<DateTime<Utc>>,
}

impl ItemDraft {
    /// A draft in the default unit with no due date.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            unit: Unit::default(),
            due_date: None,
        }
    }

    /// Set the unit.
    #[must_use]
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Set the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }
}

/// View state of the shopping-list screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    /// Latest snapshot, in store order.
    pub items: Vec<Item>,
    /// Last failed mutation, until dismissed.
    pub last_error: Option<HouseholdError>,
    /// Mutations sent but not yet answered.
    pub pending: usize,
}

impl ListState {
    /// Look up an item in the current snapshot.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Items still to buy.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.iter().filter(|item| !item.bought).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn family_document_uses_stored_field_names() {
        let family = Family {
            id: FamilyId::new("Smiths"),
            name: "Smiths".to_string(),
            password_hash: "abc".to_string(),
            creator_id: IdentityId::new("a"),
            members: vec![Member {
                id: IdentityId::new("a"),
                display_name: "Alice".to_string(),
                expo_push_token: String::new(),
            }],
            created_at: at(0),
        };

        let value = serde_json::to_value(&family).unwrap();
        assert_eq!(value["password"], "abc");
        assert_eq!(value["creatorId"], "a");
        assert_eq!(value["members"][0]["expoPushToken"], "");
        assert!(value.get("id").is_none());

        let back = Family::from_document(FamilyId::new("Smiths"), value).unwrap();
        assert_eq!(back, family);
        assert!(back.is_creator(&IdentityId::new("a")));
        assert!(back.member(&IdentityId::new("b")).is_none());
    }

    #[test]
    fn member_tolerates_null_fields() {
        let member: Member = serde_json::from_value(json!({
            "id": "b",
            "displayName": null,
        }))
        .unwrap();
        assert_eq!(member.display_name, "");
        assert!(!member.has_push_token());
    }

    #[test]
    fn item_round_trips_mixed_quantity() {
        let document = Document {
            id: "i1".to_string(),
            data: json!({
                "name": "Apples",
                "quantity": "a few",
                "unit": "kg",
                "dateAdded": "2025-01-01T00:00:00Z",
                "bought": false,
                "addedBy": "Alice",
                "addedById": "a",
            }),
        };
        let item = Item::from_document(document).unwrap();
        assert_eq!(item.id, ItemId::new("i1"));
        assert_eq!(item.quantity, Quantity::Text("a few".to_string()));
        assert_eq!(item.unit, Unit::Kg);
        assert_eq!(item.due_date, None);
    }

    #[test]
    fn overdue_requires_past_due_and_not_bought() {
        let mut item = Item {
            id: ItemId::new("i1"),
            name: "Milk".to_string(),
            quantity: Quantity::Number(2.0),
            unit: Unit::L,
            due_date: Some(at(1)),
            date_added: at(0),
            bought: false,
            added_by: "Alice".to_string(),
            added_by_id: None,
        };
        assert!(!item.is_overdue(at(0)));
        assert!(item.is_overdue(at(2)));
        item.bought = true;
        assert!(!item.is_overdue(at(2)));
        item.bought = false;
        item.due_date = None;
        assert!(!item.is_overdue(at(2)));
    }

    #[test]
    fn units_use_stored_symbols() {
        assert_eq!(serde_json::to_value(Unit::Ml).unwrap(), json!("mL"));
        assert_eq!("L".parse::<Unit>().unwrap(), Unit::L);
        assert!("litre".parse::<Unit>().is_err());
        assert_eq!(Unit::default(), Unit::Pcs);
    }

    #[test]
    fn profile_pointer_needs_id_and_name() {
        let mut profile = UserProfile {
            id: IdentityId::new("a"),
            family_id: Some(FamilyId::new("Smiths")),
            family_name: None,
            display_name: None,
            updated_at: None,
        };
        assert_eq!(profile.family_ref(), None);

        profile.family_name = Some("Smiths".to_string());
        assert_eq!(
            profile.family_ref().map(|r| r.family_name),
            Some("Smiths".to_string())
        );
    }

    #[test]
    fn session_actor_requires_identity() {
        let session = Session::new();
        assert_eq!(session.actor(), Err(HouseholdError::NotSignedIn));
        assert_eq!(session.stored_token(), "");

        let session = session
            .with_identity(Identity::anonymous("anon-1"))
            .with_push_token(PushToken::new("ExponentPushToken[x]"));
        assert_eq!(session.actor().map(|a| a.anonymous), Ok(true));
        assert_eq!(session.stored_token(), "ExponentPushToken[x]");
    }

    #[test]
    fn display_name_fallback() {
        let identity = Identity::anonymous("anon-1");
        assert_eq!(identity.name_or("Unknown"), "Unknown");
        assert_eq!(identity.with_display_name("Bob").name_or("Unknown"), "Bob");
    }
}
