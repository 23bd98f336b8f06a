pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use api::{
    ApiClient, ChatBackend, ChatReply, ConversationId, ConversationSummary, HealthStatus,
    ModelHealth, Operation, StartedConversation,
};
pub use config::Config;
pub use error::{ClientError, ConfigError};
pub use session::{SessionController, SessionPhase};
pub use state::{ChatMessage, ChatRole, Entities, MessageId};
