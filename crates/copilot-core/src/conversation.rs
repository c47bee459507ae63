//! Turn state machine
//!
//! [`TurnMachine`] is the only writer of the [`Conversation`]. A submission is
//! accepted by [`TurnMachine::begin`], which hands back the one request to send,
//! and completed by [`TurnMachine::settle`] with whatever the transport
//! returned. [`TurnMachine::submit`] does both around a single await.
//!
//! ```text
//!   Idle --begin(text)--> Pending --settle(reply)--> Idle
//! ```

use tracing::{debug, info, warn};

use crate::client::{ChatRequest, ChatTransport, RawReply};
use crate::normalize::{normalize, Outcome};
use crate::notify::{NotificationKind, Notifications};
use crate::state::Turn;

/// Correlation fields sent with every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub session_id: String,
}

/// Authoritative conversation state. Read-only outside this crate.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    pending: bool,
    last_outcome: Option<Outcome>,
    last_error: Option<String>,
}

impl Conversation {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
}

pub struct TurnMachine {
    conversation: Conversation,
    session: Session,
}

impl TurnMachine {
    pub fn new(session: Session) -> Self {
        Self {
            conversation: Conversation::default(),
            session,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn phase(&self) -> Phase {
        if self.conversation.pending {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Takes effect from the next request on
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.session.user_id = user_id.into();
    }

    /// Takes effect from the next request on
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session.session_id = session_id.into();
    }

    /// Accept a submission and return the request to send.
    ///
    /// Returns `None` (and changes nothing) for blank text or while a request
    /// is already outstanding.
    pub fn begin(&mut self, text: &str) -> Option<ChatRequest> {
        let text = text.trim();

        if text.is_empty() {
            debug!("ignoring blank submission");
            return None;
        }
        if self.conversation.pending {
            debug!("ignoring submission while a request is outstanding");
            return None;
        }

        self.conversation.turns.push(Turn::user(text));
        self.conversation.pending = true;

        info!(
            turn = self.conversation.turns.len(),
            session_id = %self.session.session_id,
            "turn accepted"
        );

        Some(ChatRequest {
            message: text.to_string(),
            user_id: self.session.user_id.clone(),
            session_id: self.session.session_id.clone(),
        })
    }

    /// Apply the reply to the outstanding request.
    ///
    /// Appends the assistant turn, replaces the last outcome, and returns to
    /// idle. Failures (and successes carrying service warnings) are surfaced
    /// through `notifications`. A reply with nothing pending is dropped.
    pub fn settle(
        &mut self,
        reply: RawReply,
        notifications: &mut Notifications,
    ) -> Option<&Outcome> {
        if !self.conversation.pending {
            warn!("dropping reply with no request outstanding");
            return None;
        }

        let outcome = normalize(reply);
        self.conversation
            .turns
            .push(Turn::assistant(outcome.transcript_text()));

        match &outcome {
            Outcome::Success {
                request_id,
                warnings,
                ..
            } => {
                info!(request_id = request_id.as_deref().unwrap_or("-"), "turn answered");
                self.conversation.last_error = None;
                if !warnings.is_empty() {
                    notifications.notify(warnings.join("; "), NotificationKind::Warning);
                }
            }
            Outcome::Error { message } => {
                warn!(%message, "turn failed");
                self.conversation.last_error = Some(message.clone());
                notifications.notify(message.clone(), NotificationKind::Error);
            }
        }

        self.conversation.last_outcome = Some(outcome);
        self.conversation.pending = false;
        self.conversation.last_outcome.as_ref()
    }

    /// Run one whole turn against `transport`.
    ///
    /// Returns `None` when the submission is rejected. Holding `&mut self`
    /// across the await keeps a second submission out until this one settles.
    pub async fn submit<T>(
        &mut self,
        text: &str,
        transport: &T,
        notifications: &mut Notifications,
    ) -> Option<&Outcome>
    where
        T: ChatTransport + ?Sized,
    {
        let request = self.begin(text)?;
        let reply = transport.send(&request).await;
        self.settle(reply, notifications)
    }
}
