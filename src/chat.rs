//! Chat session controller.
//!
//! Transcripts are owned locally, one per `(session, model)` pair, and kept
//! in the injected [`KvStore`]. The backend is only asked for the
//! assistant's reply to a transcript; it never serves history.
//!
//! [`ChatView`] layers the optimistic send on top:
//!
//! ```text
//!          begin_send            commit_send
//!   Idle ─────────────▶ Pending ─────────────▶ Committed
//!                          │
//!                          │ rollback_send
//!                          ▼
//!                      RolledBack
//! ```
//!
//! The user's message is visible immediately after `begin_send`. A failed
//! send restores the pre-send transcript and keeps the input text so the
//! user can retry.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::backend::{Backend, SendChatRequest};
use crate::error::{Error, Result};
use crate::models::{ChatMessage, ChatModel};
use crate::store::{chat_key, read_json, write_json, KvStore};

/// Persisted transcript record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatHistory {
    fn empty(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            messages: Vec::new(),
        }
    }
}

pub struct ChatController {
    backend: Arc<dyn Backend>,
    store: Arc<dyn KvStore>,
}

impl ChatController {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn KvStore>) -> Self {
        Self { backend, store }
    }

    /// The cached transcript, or an empty one.
    ///
    /// An undecodable transcript reads as empty and is replaced by the next
    /// successful send. Only a failing store is an error.
    pub fn get_history(&self, session_id: &str, model: ChatModel) -> Result<ChatHistory> {
        let key = chat_key(session_id, model);
        match read_json::<ChatHistory>(self.store.as_ref(), &key) {
            Ok(history) => Ok(history.unwrap_or_else(|| ChatHistory::empty(session_id))),
            Err(Error::Json(e)) => {
                warn!("ignoring unreadable chat transcript {}: {}", key, e);
                Ok(ChatHistory::empty(session_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Send the candidate transcript and store the reconciled result.
    ///
    /// `messages` is the prior transcript plus the new user message. A
    /// non-empty `messages` list in the response is taken verbatim;
    /// otherwise the reply is appended to `messages`. The result replaces
    /// whatever was cached for the pair. Nothing is cached on failure.
    pub async fn send(
        &self,
        session_id: &str,
        messages: Vec<ChatMessage>,
        model: ChatModel,
    ) -> Result<ChatHistory> {
        if session_id.trim().is_empty() {
            return Err(Error::validation("No session selected"));
        }
        let request = SendChatRequest {
            session_id: session_id.to_string(),
            messages,
            model,
        };
        let response = self.backend.send_chat(&request).await?;

        let final_messages = match response.messages {
            Some(list) if !list.is_empty() => list,
            _ => {
                let mut list = request.messages;
                list.push(response.reply);
                list
            }
        };
        let history = ChatHistory {
            session_id: session_id.to_string(),
            messages: final_messages,
        };
        write_json(self.store.as_ref(), &chat_key(session_id, model), &history)?;
        debug!(
            "stored {} messages for {}/{}",
            history.messages.len(),
            session_id,
            model
        );
        Ok(history)
    }

    /// Forget the local transcript for the pair. The backend is not told.
    pub fn delete_history(&self, session_id: &str, model: ChatModel) -> Result<()> {
        self.store.remove(&chat_key(session_id, model))?;
        info!("deleted chat history for {}/{}", session_id, model);
        Ok(())
    }
}

/// Phase of the optimistic send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// Working state of a chat screen for one `(session, model)` pair.
#[derive(Debug, Clone)]
pub struct ChatView {
    session_id: String,
    model: ChatModel,
    messages: Vec<ChatMessage>,
    /// Text in the input box.
    pub input: String,
    phase: SendPhase,
    snapshot: Option<Vec<ChatMessage>>,
    last_error: Option<String>,
}

impl ChatView {
    /// Open the view on the cached transcript.
    pub fn open(controller: &ChatController, session_id: &str, model: ChatModel) -> Result<Self> {
        let history = controller.get_history(session_id, model)?;
        Ok(Self {
            session_id: session_id.to_string(),
            model,
            messages: history.messages,
            input: String::new(),
            phase: SendPhase::Idle,
            snapshot: None,
            last_error: None,
        })
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    pub fn model(&self) -> ChatModel {
        self.model
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Sending is possible when idle-ish and the input has text.
    pub fn can_send(&self) -> bool {
        self.phase != SendPhase::Pending
            && !self.session_id.trim().is_empty()
            && !self.input.trim().is_empty()
    }

    /// Speculatively append the user's message.
    ///
    /// Returns the candidate transcript to send.
    pub fn begin_send(&mut self) -> Result<Vec<ChatMessage>> {
        if self.phase == SendPhase::Pending {
            return Err(Error::validation("A message is already being sent"));
        }
        if self.session_id.trim().is_empty() {
            return Err(Error::validation("No session selected"));
        }
        let content = self.input.trim();
        if content.is_empty() {
            return Err(Error::validation("Message is empty"));
        }

        let message = ChatMessage::user(content);
        self.snapshot = Some(self.messages.clone());
        self.messages.push(message);
        self.phase = SendPhase::Pending;
        self.last_error = None;
        Ok(self.messages.clone())
    }

    /// Replace the speculative transcript with the reconciled one.
    pub fn commit_send(&mut self, history: ChatHistory) {
        self.messages = history.messages;
        self.snapshot = None;
        self.input.clear();
        self.phase = SendPhase::Committed;
    }

    /// Restore the pre-send transcript; the input is kept for retry.
    pub fn rollback_send(&mut self, error: &Error) {
        if let Some(snapshot) = self.snapshot.take() {
            self.messages = snapshot;
        }
        self.last_error = Some(error.to_string());
        self.phase = SendPhase::RolledBack;
    }

    /// Run a full optimistic send against `controller`.
    pub async fn send(&mut self, controller: &ChatController) -> Result<()> {
        let candidate = self.begin_send()?;
        match controller
            .send(&self.session_id, candidate, self.model)
            .await
        {
            Ok(history) => {
                self.commit_send(history);
                Ok(())
            }
            Err(e) => {
                self.rollback_send(&e);
                Err(e)
            }
        }
    }

    /// Clear the transcript locally and in the store.
    pub fn clear(&mut self, controller: &ChatController) -> Result<()> {
        controller.delete_history(&self.session_id, self.model)?;
        self.messages.clear();
        self.phase = SendPhase::Idle;
        Ok(())
    }
}
