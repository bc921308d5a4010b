//! Domain event types exchanged between the user and order sides.
//!
//! The wire form is a flat JSON object:
//!
//! ```text
//! {"eventType": "USER_UPDATED", "id": 42, "username": "alice", "email": "alice@example.com"}
//! ```
//!
//! Unknown fields are ignored. Kinds this build does not know about decode to
//! [`EventKind::Unrecognized`] so that consumers can log and drop them instead
//! of failing the whole payload.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::CodecError;

// ============================================================================
// Event Kind
// ============================================================================

/// Kind of change a [`DomainEvent`] describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A user profile was registered.
    Created,
    /// A user profile was changed.
    Updated,
    /// A kind this build does not understand. Holds the raw tag.
    Unrecognized(String),
}

impl EventKind {
    /// Returns the wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Created => "USER_CREATED",
            EventKind::Updated => "USER_UPDATED",
            EventKind::Unrecognized(raw) => raw,
        }
    }

    /// Parses a wire tag. Never fails: unknown tags are preserved.
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "USER_CREATED" => EventKind::Created,
            "USER_UPDATED" => EventKind::Updated,
            other => EventKind::Unrecognized(other.to_string()),
        }
    }

    /// Returns `true` if this build knows how to handle the kind.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Unrecognized(_))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(EventKind::from_wire(&tag))
    }
}

// ============================================================================
// Domain Event
// ============================================================================

/// Notification that a user profile changed.
///
/// Produced once per committed mutation. Delivery is at-least-once, so the
/// same event may be observed more than once downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    #[serde(rename = "eventType")]
    pub kind: EventKind,
    /// Id of the entity that changed.
    #[serde(rename = "id")]
    pub entity_id: i64,
    /// Username of the entity; dependent records are keyed by it.
    #[serde(rename = "username")]
    pub subject_name: String,
    /// Contact address of the entity.
    #[serde(rename = "email")]
    pub subject_contact: String,
}

impl DomainEvent {
    /// Create a "user created" event.
    pub fn created(
        entity_id: i64,
        subject_name: impl Into<String>,
        subject_contact: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Created,
            entity_id,
            subject_name: subject_name.into(),
            subject_contact: subject_contact.into(),
        }
    }

    /// Create a "user updated" event.
    pub fn updated(
        entity_id: i64,
        subject_name: impl Into<String>,
        subject_contact: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Updated,
            entity_id,
            subject_name: subject_name.into(),
            subject_contact: subject_contact.into(),
        }
    }

    /// Broker partition key. Keeps events for one entity in order.
    pub fn partition_key(&self) -> String {
        self.entity_id.to_string()
    }

    /// Encode to the JSON wire form.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::Encode)
    }

    /// Decode from the JSON wire form.
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(payload).map_err(CodecError::Decode)
    }
}
