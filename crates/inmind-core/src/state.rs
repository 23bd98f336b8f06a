//! UI-agnostic conversation data types
//!
//! These are shared by every front-end that renders a conversation and
//! don't depend on any specific UI framework.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Entity-type name to extracted value, as returned by the backend.
pub type Entities = BTreeMap<String, String>;

/// Local rendering key for a message. Never sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message in the conversation log
///
/// Intent and entities only exist on assistant messages; the constructors
/// are the only way to build one, so a user message can't carry metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    role: ChatRole,
    content: String,
    intent: Option<String>,
    entities: Option<Entities>,
}

impl ChatMessage {
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: ChatRole::User,
            content: content.into(),
            intent: None,
            entities: None,
        }
    }

    /// Build an assistant message. An empty intent or an empty entity map
    /// is stored as absent.
    pub fn assistant(
        id: MessageId,
        content: impl Into<String>,
        intent: Option<String>,
        entities: Option<Entities>,
    ) -> Self {
        Self {
            id,
            role: ChatRole::Assistant,
            content: content.into(),
            intent: intent.filter(|i| !i.trim().is_empty()),
            entities: entities.filter(|e| !e.is_empty()),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }

    pub fn entities(&self) -> Option<&Entities> {
        self.entities.as_ref()
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}
