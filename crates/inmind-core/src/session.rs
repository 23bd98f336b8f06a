//! Conversation session controller
//!
//! Owns the conversation id and the message log, sequences the start and
//! send round trips, and derives the pending/error flags the UI reads.
//! At most one request is in flight at a time; the controller is
//! re-entered exactly once per completed request through [`poll`] or
//! [`settle`].
//!
//! [`poll`]: SessionController::poll
//! [`settle`]: SessionController::settle

use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, error, info};

use crate::api::{ChatBackend, ChatReply, ConversationId, Operation, StartedConversation};
use crate::error::ClientError;
use crate::state::{ChatMessage, MessageId};

pub const START_FAILED_NOTICE: &str = "Failed to start conversation.";
pub const SEND_FAILED_NOTICE: &str = "Failed to send message. Please try again.";

const TASK_ENDED_EARLY: &str = "request task ended without a result";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Starting,
    Ready,
    Sending,
    /// The conversation could not be established. Only [`SessionController::start`]
    /// leaves this phase.
    Failed,
}

type Reply<T> = oneshot::Receiver<Result<T, ClientError>>;

enum InFlight {
    Start(Reply<StartedConversation>),
    Send(Reply<ChatReply>),
}

/// A finished request. `None` means the task ended without reporting.
enum Completed {
    Start(Option<Result<StartedConversation, ClientError>>),
    Send(Option<Result<ChatReply, ClientError>>),
}

pub struct SessionController {
    backend: Arc<dyn ChatBackend>,
    user_id: String,
    phase: SessionPhase,
    conversation_id: Option<ConversationId>,
    messages: Vec<ChatMessage>,
    in_flight: Option<InFlight>,
    last_error: Option<String>,
    next_message_id: u64,
}

impl SessionController {
    pub fn new(backend: Arc<dyn ChatBackend>, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            phase: SessionPhase::Uninitialized,
            conversation_id: None,
            messages: Vec::new(),
            in_flight: None,
            last_error: None,
            next_message_id: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the input surface should accept submissions.
    pub fn input_enabled(&self) -> bool {
        !(self.is_pending() || self.conversation_id.is_none())
    }

    /// Begin establishing the conversation.
    ///
    /// Only valid before the first start or after a failed one. Returns
    /// whether a request was issued. Must be called inside a tokio runtime.
    pub fn start(&mut self) -> bool {
        if !matches!(self.phase, SessionPhase::Uninitialized | SessionPhase::Failed) {
            debug!(phase = ?self.phase, "ignoring start request");
            return false;
        }

        self.phase = SessionPhase::Starting;
        self.last_error = None;

        let (tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let user_id = self.user_id.clone();
        tokio::spawn(async move {
            let _ = tx.send(backend.start_conversation(&user_id).await);
        });
        self.in_flight = Some(InFlight::Start(rx));

        debug!(user_id = %self.user_id, "starting conversation");
        true
    }

    /// Hand a user submission to the controller.
    ///
    /// Blank text, a submission while a request is pending, or a
    /// submission with no conversation are rejected without any state
    /// change. An accepted submission is appended to the log before the
    /// request is sent and stays there whatever the outcome.
    pub fn submit(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || !self.input_enabled() {
            return false;
        }
        let Some(conversation_id) = self.conversation_id.clone() else {
            return false;
        };

        let id = self.next_id();
        self.messages.push(ChatMessage::user(id, text));
        self.phase = SessionPhase::Sending;
        self.last_error = None;

        let (tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        tokio::spawn(async move {
            let _ = tx.send(backend.send_message(&conversation_id, &text).await);
        });
        self.in_flight = Some(InFlight::Send(rx));

        debug!(message_id = id.0, "message submitted");
        true
    }

    /// Apply the in-flight request's outcome if it has arrived.
    ///
    /// Never blocks. Returns whether the session changed.
    pub fn poll(&mut self) -> bool {
        let completed = match self.in_flight.as_mut() {
            None => return false,
            Some(InFlight::Start(rx)) => match rx.try_recv() {
                Err(TryRecvError::Empty) => return false,
                result => Completed::Start(result.ok()),
            },
            Some(InFlight::Send(rx)) => match rx.try_recv() {
                Err(TryRecvError::Empty) => return false,
                result => Completed::Send(result.ok()),
            },
        };

        self.in_flight = None;
        self.apply(completed);
        true
    }

    /// Wait for the in-flight request, if any, and apply its outcome.
    ///
    /// Returns whether there was a request to wait for.
    pub async fn settle(&mut self) -> bool {
        let completed = match self.in_flight.as_mut() {
            None => return false,
            Some(InFlight::Start(rx)) => Completed::Start(rx.await.ok()),
            Some(InFlight::Send(rx)) => Completed::Send(rx.await.ok()),
        };

        self.in_flight = None;
        self.apply(completed);
        true
    }

    fn apply(&mut self, completed: Completed) {
        match completed {
            Completed::Start(Some(Ok(started))) => self.on_started(started),
            Completed::Start(Some(Err(err))) => self.on_start_failed(&err, err.operation()),
            Completed::Start(None) => {
                self.on_start_failed(&TASK_ENDED_EARLY, Operation::StartConversation)
            }
            Completed::Send(Some(Ok(reply))) => self.on_replied(reply),
            Completed::Send(Some(Err(err))) => self.on_send_failed(&err, err.operation()),
            Completed::Send(None) => self.on_send_failed(&TASK_ENDED_EARLY, Operation::SendMessage),
        }
    }

    fn on_started(&mut self, started: StartedConversation) {
        info!(conversation_id = %started.conversation_id, "conversation started");

        let id = self.next_id();
        self.conversation_id = Some(started.conversation_id);
        self.messages.push(ChatMessage::assistant(id, started.greeting, None, None));
        self.phase = SessionPhase::Ready;
        self.last_error = None;
    }

    fn on_start_failed(&mut self, err: &dyn Display, operation: Operation) {
        error!(%operation, user_id = %self.user_id, error = %err, "failed to start conversation");

        self.phase = SessionPhase::Failed;
        self.last_error = Some(START_FAILED_NOTICE.to_string());
    }

    fn on_replied(&mut self, reply: ChatReply) {
        if self.conversation_id.as_ref() != Some(&reply.conversation_id) {
            debug!(
                expected = ?self.conversation_id,
                received = %reply.conversation_id,
                "reply names a different conversation id"
            );
        }

        let id = self.next_id();
        self.messages.push(ChatMessage::assistant(
            id,
            reply.response,
            reply.intent,
            Some(reply.entities),
        ));
        self.phase = SessionPhase::Ready;
        self.last_error = None;

        debug!(message_id = id.0, state = ?reply.state, "assistant reply received");
    }

    fn on_send_failed(&mut self, err: &dyn Display, operation: Operation) {
        error!(
            %operation,
            conversation_id = ?self.conversation_id,
            error = %err,
            "failed to send message"
        );

        self.phase = SessionPhase::Ready;
        self.last_error = Some(SEND_FAILED_NOTICE.to_string());
    }

    fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        id
    }
}
