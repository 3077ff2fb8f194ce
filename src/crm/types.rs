//! Raw CRM wire shapes
//!
//! The CRM returns loosely-typed payloads: relations arrive either as a bare
//! id or as an expanded object, contacts carry arbitrary custom fields keyed
//! by opaque hashes, and list endpoints may return `null` instead of an
//! empty array. Everything untyped is absorbed here; nothing past the fetch
//! pipeline sees these shapes.

use serde::{Deserialize, Serialize};

/// A workflow board (one per job category)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBoard {
    pub id: u64,
    pub name: String,
}

/// A named step within a board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPhase {
    pub id: u64,
    pub name: String,
}

/// A relation field that the API returns either as a bare id or as a
/// simplified object with a `value` id inside
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation {
    Id(u64),
    Object {
        value: u64,
        #[serde(default)]
        name: Option<String>,
    },
}

impl Relation {
    pub fn id(&self) -> u64 {
        match self {
            Relation::Id(id) => *id,
            Relation::Object { value, .. } => *value,
        }
    }
}

/// An open project record as listed by the CRM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: u64,
    pub title: String,
    pub phase_id: u64,
    #[serde(default)]
    pub person_id: Option<Relation>,
}

impl RawRecord {
    /// Linked contact id, normalized across both relation shapes
    pub fn contact_id(&self) -> Option<u64> {
        self.person_id.as_ref().map(Relation::id)
    }
}

/// Phone entry on a contact; the first listed one is the display number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneEntry {
    pub value: String,
}

/// Organization reference embedded in a contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A contact record, including whatever custom fields the deployment added
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContact {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub phone: Vec<PhoneEntry>,
    #[serde(default)]
    pub org_id: Option<OrgRef>,
    #[serde(default)]
    pub postal_address: Option<String>,
    /// Custom fields keyed by opaque field hashes
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RawContact {
    /// Ordered address fallback: deployment-specific custom field, then the
    /// organization address, then the generic postal address. First
    /// non-empty value wins.
    pub fn best_address(&self, custom_field_key: Option<&str>) -> Option<String> {
        let custom = custom_field_key.and_then(|key| {
            self.extra
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });

        non_blank(custom)
            .or_else(|| non_blank(self.org_id.as_ref().and_then(|o| o.address.clone())))
            .or_else(|| non_blank(self.postal_address.clone()))
    }

    /// First listed phone number, if any
    pub fn first_phone(&self) -> Option<String> {
        non_blank(self.phone.first().map(|p| p.value.clone()))
    }
}
