use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{Acknowledgement, MessageRequest, StartRequest};
use super::{
    ChatBackend, ChatReply, ConversationId, ConversationSummary, HealthStatus, ModelHealth,
    Operation, StartedConversation,
};
use crate::error::ClientError;

/// Uniform timeout for every backend round trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the assistant backend's JSON API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/chat/conversations/{id}[/{suffix}]` with the id pushed as a
    /// single percent-encoded path segment.
    fn conversation_url(
        &self,
        operation: Operation,
        conversation_id: &ConversationId,
        suffix: Option<&str>,
    ) -> Result<Url, ClientError> {
        let id = conversation_id.as_str();
        if id.is_empty() {
            return Err(ClientError::InvalidInput {
                operation,
                reason: "conversation id is empty",
            });
        }
        // Dot segments would be dropped from the path instead of encoded
        if id == "." || id == ".." {
            return Err(ClientError::InvalidInput {
                operation,
                reason: "conversation id is a dot segment",
            });
        }

        let invalid_base = ClientError::InvalidInput {
            operation,
            reason: "base url cannot hold a path",
        };
        let mut url = Url::parse(&self.url("/chat/conversations")).map_err(|_| {
            ClientError::InvalidInput {
                operation,
                reason: "base url is not a valid url",
            }
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| invalid_base)?;
            segments.push(id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        debug!(%operation, "sending backend request");

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;

        if !status.is_success() {
            return Err(ClientError::Status {
                operation,
                status,
                body,
            });
        }

        debug!(%operation, %status, "backend request completed");
        serde_json::from_str(&body).map_err(|source| ClientError::Decode { operation, source })
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn health(&self) -> Result<HealthStatus, ClientError> {
        let request = self.client.get(self.url("/health"));
        self.execute(Operation::Health, request).await
    }

    async fn model_health(&self) -> Result<ModelHealth, ClientError> {
        let request = self.client.get(self.url("/ollama/health"));
        self.execute(Operation::ModelHealth, request).await
    }

    async fn start_conversation(&self, user_id: &str) -> Result<StartedConversation, ClientError> {
        let operation = Operation::StartConversation;
        if user_id.trim().is_empty() {
            return Err(ClientError::InvalidInput {
                operation,
                reason: "user id is empty",
            });
        }

        let request = self
            .client
            .post(self.url("/chat/conversations/start"))
            .json(&StartRequest { user_id });
        self.execute(operation, request).await
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<ChatReply, ClientError> {
        let operation = Operation::SendMessage;
        if text.trim().is_empty() {
            return Err(ClientError::InvalidInput {
                operation,
                reason: "message text is empty",
            });
        }

        let url = self.conversation_url(operation, conversation_id, Some("message"))?;
        let request = self
            .client
            .post(url)
            .json(&MessageRequest { user_message: text });
        self.execute(operation, request).await
    }

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationSummary, ClientError> {
        let operation = Operation::GetConversation;
        let url = self.conversation_url(operation, conversation_id, None)?;
        self.execute(operation, self.client.get(url)).await
    }

    async fn end_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<String, ClientError> {
        let operation = Operation::EndConversation;
        let url = self.conversation_url(operation, conversation_id, Some("end"))?;
        let ack: Acknowledgement = self.execute(operation, self.client.post(url)).await?;
        Ok(ack.message)
    }
}
