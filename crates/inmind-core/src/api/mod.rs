//! Typed boundary to the assistant backend

mod client;
mod types;

use std::fmt;

use async_trait::async_trait;

use crate::error::ClientError;

pub use client::{ApiClient, REQUEST_TIMEOUT};
pub use types::{
    ChatReply, ConversationId, ConversationSummary, HealthStatus, ModelHealth,
    StartedConversation,
};

/// Backend operations, used to give errors and log records their context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    ModelHealth,
    StartConversation,
    SendMessage,
    GetConversation,
    EndConversation,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Health => "health",
            Operation::ModelHealth => "model-health",
            Operation::StartConversation => "start-conversation",
            Operation::SendMessage => "send-message",
            Operation::GetConversation => "get-conversation",
            Operation::EndConversation => "end-conversation",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The conversation backend as seen by the session controller.
///
/// Each call is one round trip. Implementations must not retry or
/// reinterpret failures beyond attaching the operation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn health(&self) -> Result<HealthStatus, ClientError>;

    async fn model_health(&self) -> Result<ModelHealth, ClientError>;

    async fn start_conversation(&self, user_id: &str) -> Result<StartedConversation, ClientError>;

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<ChatReply, ClientError>;

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationSummary, ClientError>;

    /// Returns the backend's acknowledgement text.
    async fn end_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<String, ClientError>;
}
