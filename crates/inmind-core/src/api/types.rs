use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::state::Entities;

/// Opaque conversation identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
pub(crate) struct StartRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Serialize)]
pub(crate) struct MessageRequest<'a> {
    pub user_message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartedConversation {
    pub conversation_id: ConversationId,
    #[serde(rename = "message")]
    pub greeting: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub conversation_id: ConversationId,
    pub response: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default, deserialize_with = "deserialize_entities")]
    pub entities: Entities,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub user_id: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelHealth {
    pub status: String,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Deserialize)]
pub(crate) struct Acknowledgement {
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityValue {
    One(String),
    Many(Vec<String>),
}

/// Entities are a flat string map on the wire, but some backends group
/// several values per type. Those are joined into one display string.
fn deserialize_entities<'de, D>(deserializer: D) -> Result<Entities, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, EntityValue>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                EntityValue::One(v) => v,
                EntityValue::Many(vs) => vs.join(", "),
            };
            (key, value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_response_maps_message_to_greeting() {
        let json = r#"{"conversation_id": "c1", "message": "Hi, how can I help?"}"#;
        let started: StartedConversation = serde_json::from_str(json).unwrap();
        assert_eq!(started.conversation_id.as_str(), "c1");
        assert_eq!(started.greeting, "Hi, how can I help?");
    }

    #[test]
    fn test_reply_with_flat_entities() {
        let json = r#"{
            "conversation_id": "c1",
            "response": "Here are some options",
            "intent": "product_search",
            "entities": {"category": "shoes"},
            "state": "searching"
        }"#;
        let reply: ChatReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.intent.as_deref(), Some("product_search"));
        assert_eq!(reply.entities.get("category").map(String::as_str), Some("shoes"));
        assert_eq!(reply.state.as_deref(), Some("searching"));
    }

    #[test]
    fn test_reply_with_grouped_entities() {
        let json = r#"{
            "conversation_id": "c1",
            "response": "ok",
            "entities": {"color": ["red", "blue"], "brand": "acme"}
        }"#;
        let reply: ChatReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.entities.get("color").map(String::as_str), Some("red, blue"));
        assert_eq!(reply.entities.get("brand").map(String::as_str), Some("acme"));
        assert_eq!(reply.intent, None);
    }

    #[test]
    fn test_reply_with_null_entities() {
        let json = r#"{"conversation_id": "c1", "response": "ok", "entities": null}"#;
        let reply: ChatReply = serde_json::from_str(json).unwrap();
        assert!(reply.entities.is_empty());
    }

    #[test]
    fn test_request_bodies() {
        let start = serde_json::to_value(StartRequest { user_id: "user-001" }).unwrap();
        assert_eq!(start, serde_json::json!({"user_id": "user-001"}));

        let msg = serde_json::to_value(MessageRequest { user_message: "hi" }).unwrap();
        assert_eq!(msg, serde_json::json!({"user_message": "hi"}));
    }
}
