//! In-memory message ledger; source of truth for message lifecycle state.

use crate::error::GigiCoreError;
use crate::types::Message;
use gigi_rs_protocol::{MessageId, MessageState, Role};
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered record of every message emitted in the current conversation.
///
/// Messages enter as `Pending` and transition to `Settled` or `Failed`
/// exactly once; a `Failed` entry leaves the ledger only through an
/// explicit removal when a user-initiated retry succeeds.
#[derive(Clone, Default)]
pub struct MessageLedger {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MessageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new pending message and return a copy of it.
    pub fn insert_pending(&self, role: Role, content: String, plain_text: String) -> Message {
        let message = Message::pending(role, content, plain_text);
        debug!(
            "ledger insert (message_id={}, role={})",
            message.id,
            message.role.as_str()
        );
        self.messages.write().push(message.clone());
        message
    }

    /// Transition a pending message to `Settled`.
    pub fn settle(&self, message_id: &MessageId) -> Result<(), GigiCoreError> {
        self.transition(message_id, MessageState::Settled)
    }

    /// Transition a pending message to `Failed`.
    pub fn fail(&self, message_id: &MessageId) -> Result<(), GigiCoreError> {
        self.transition(message_id, MessageState::Failed)
    }

    /// Remove a message from the ledger, returning it.
    pub fn remove(&self, message_id: &MessageId) -> Result<Message, GigiCoreError> {
        let mut messages = self.messages.write();
        let index = messages
            .iter()
            .position(|message| &message.id == message_id)
            .ok_or_else(|| GigiCoreError::UnknownMessage(message_id.clone()))?;
        debug!("ledger remove (message_id={})", message_id);
        Ok(messages.remove(index))
    }

    /// Look up a message by id.
    pub fn get(&self, message_id: &MessageId) -> Option<Message> {
        self.messages
            .read()
            .iter()
            .find(|message| &message.id == message_id)
            .cloned()
    }

    /// Return a copy of every message in insertion order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    /// Number of messages currently in the ledger.
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Drop every message, e.g. on session reset.
    pub fn clear(&self) {
        self.messages.write().clear();
    }

    /// Apply a terminal transition, enforcing that only pending messages move.
    fn transition(&self, message_id: &MessageId, to: MessageState) -> Result<(), GigiCoreError> {
        let mut messages = self.messages.write();
        let message = messages
            .iter_mut()
            .find(|message| &message.id == message_id)
            .ok_or_else(|| GigiCoreError::UnknownMessage(message_id.clone()))?;
        if message.state != MessageState::Pending {
            return Err(GigiCoreError::InvalidTransition {
                message_id: message_id.clone(),
                from: message.state,
            });
        }
        debug!("ledger transition (message_id={}, to={:?})", message_id, to);
        message.state = to;
        Ok(())
    }
}
