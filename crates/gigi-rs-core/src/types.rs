//! Core data types shared across the engine API.

use chrono::{DateTime, Utc};
use gigi_rs_protocol::{MessageId, MessageState, Role, SessionId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One turn in the conversation, as tracked by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Locally generated identifier, ordered by creation time.
    pub id: MessageId,
    /// Role that produced the message.
    pub role: Role,
    /// Rendered (post-formatting) text.
    pub content: String,
    /// Formatting-stripped text used for copy and speech synthesis.
    pub plain_text: String,
    /// Lifecycle state.
    pub state: MessageState,
    /// Timestamp for the message.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a new pending message.
    pub fn pending(role: Role, content: String, plain_text: String) -> Self {
        Self {
            id: MessageId::next(),
            role,
            content,
            plain_text,
            state: MessageState::Pending,
            created_at: Utc::now(),
        }
    }
}

/// One conversation instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Session identifier, stable until reset.
    pub session_id: SessionId,
    /// Count of user-authored messages sent (attempts, not successes).
    pub message_count: usize,
    /// Whether voice playback is enabled for this session.
    pub voice_enabled: bool,
    /// Session creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session with a new identifier.
    pub fn new(voice_enabled: bool) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            message_count: 0,
            voice_enabled,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, Session};
    use gigi_rs_protocol::{MessageState, Role};
    use pretty_assertions::assert_eq;

    #[test]
    fn pending_message_starts_pending() {
        let message = Message::pending(Role::User, "hi".to_string(), "hi".to_string());
        assert_eq!(message.state, MessageState::Pending);
        assert_eq!(message.role, Role::User);
    }

    #[test]
    fn new_sessions_get_distinct_ids() {
        let first = Session::new(true);
        let second = Session::new(true);
        assert!(first.session_id != second.session_id);
        assert_eq!(first.message_count, 0);
    }
}
