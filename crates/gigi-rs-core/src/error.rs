//! Error types for the core engine crate.

use crate::audio::AudioError;
use crate::backend::BackendError;
use crate::store::StoreError;
use gigi_rs_protocol::{MessageId, MessageState};
use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum GigiCoreError {
    /// Message id is unknown to the ledger.
    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),
    /// A lifecycle transition was attempted from a non-pending state.
    #[error("invalid transition for message {message_id} from {from:?}")]
    InvalidTransition {
        message_id: MessageId,
        from: MessageState,
    },
    /// Retry was requested for a message that is not in the failed state.
    #[error("message is not retryable: {0}")]
    NotRetryable(MessageId),
    /// Backend request error.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// Local storage error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Audio sink or handle error.
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
