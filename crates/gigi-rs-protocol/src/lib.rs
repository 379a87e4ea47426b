//! Wire protocol types for the Gigi widget backend and engine events.
//!
//! Owns the request/response bodies for the fixed HTTP surface consumed by
//! the engine, the event envelope emitted toward the rendering layer, and
//! the shared identifier types.

mod wire;

pub use wire::{ChatRequest, ChatResponse, ReportRequest, TtsRequest};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Unique identifier for a conversation session.
pub type SessionId = Uuid;

/// Process-wide counter used to keep locally generated ids monotonic even
/// when two messages land on the same millisecond.
static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier for a message in the ledger.
///
/// Generated locally, unique within a session, and ordered by creation time.
/// Not guaranteed unique across sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    /// Generate the next message id for this process.
    pub fn next() -> Self {
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        let millis = Utc::now().timestamp_millis();
        Self(format!("m{millis:013}-{seq:06}"))
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Lifecycle state of a ledger message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Optimistically inserted, request still in flight.
    Pending,
    /// Terminal success state.
    Settled,
    /// Terminal failure state; leaves the ledger only via explicit retry.
    Failed,
}

/// Wrapper for events emitted toward the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Session id associated with the event.
    pub session_id: SessionId,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: EventPayload,
}

impl EventMsg {
    /// Build an event envelope for a session with a fresh id and timestamp.
    pub fn new(session_id: SessionId, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            created_at: Utc::now(),
            payload,
        }
    }
}

/// All state-change events the engine emits.
///
/// The rendering layer subscribes to these instead of the engine touching
/// presentation directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    /// A message was appended to the ledger.
    MessageAppended {
        message_id: MessageId,
        role: Role,
        state: MessageState,
    },
    /// A pending message settled successfully.
    MessageSettled { message_id: MessageId },
    /// A pending message failed; a retry affordance should be shown.
    MessageFailed { message_id: MessageId },
    /// A failed message was removed after a successful retry.
    MessageRemoved { message_id: MessageId },
    /// Input was rejected before any request was issued.
    InputRejected { reason: RejectReason },
    /// The send control should be disabled/enabled.
    SendLocked { locked: bool },
    /// The assistant typing indicator should be shown/hidden.
    TypingChanged { active: bool },
    /// Playback started for a message.
    PlaybackStarted { message_id: MessageId },
    /// Playback stopped for a message (any termination path).
    PlaybackStopped { message_id: MessageId },
    /// Speech synthesis or playback failed; non-blocking notice.
    PlaybackFailed { message_id: MessageId, message: String },
    /// The global voice preference changed.
    VoiceChanged { enabled: bool },
    /// The theme preference changed.
    ThemeChanged { theme: String },
    /// The session was reset; ledger and caches are empty again.
    SessionReset { session_id: SessionId },
    /// Connectivity state as reported by the embedding shell.
    ConnectivityChanged { online: bool },
    /// A report submission succeeded.
    ReportSubmitted,
    /// A report submission failed while online.
    ReportFailed { message: String },
    /// A report submission was queued for replay while offline.
    ReportQueued { queued: usize },
    /// The retry queue was drained after coming back online.
    RetryQueueDrained { attempted: usize, succeeded: usize },
}

/// Reasons the engine rejects input locally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Input was empty after trimming.
    Empty,
    /// Input exceeded the configured maximum length.
    TooLong,
    /// A chat request is already in flight.
    Busy,
}

/// Sink interface for engine events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: EventMsg);
}

/// Sink that drops every event; useful for headless usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EventMsg) {}
}
