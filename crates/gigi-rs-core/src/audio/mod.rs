//! Audio playback seams, per-message cache, and single-flight coordination.
//!
//! The engine never touches an audio device: the embedding layer provides an
//! `AudioSink` that turns synthesized bytes into opaque `AudioHandle`s, and
//! the coordinator guarantees at most one handle is active session-wide.

mod cache;
mod playback;

pub use cache::{AudioCache, CachedAudio};
pub use playback::PlaybackCoordinator;

use gigi_rs_protocol::MessageId;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by audio sinks and handles.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The sink could not turn bytes into a playable resource.
    #[error("failed to load audio resource: {0}")]
    Load(String),
    /// Starting playback on a handle failed.
    #[error("failed to start playback: {0}")]
    Start(String),
}

/// An opaque playable audio resource.
///
/// Handles outlive their ledger entries without consequence; the cache
/// releases them on eviction.
pub trait AudioHandle: Send + Sync {
    /// Begin playback from the start of the resource.
    fn start(&self) -> Result<(), AudioError>;

    /// Stop playback immediately. Idempotent.
    fn stop(&self);

    /// Release the underlying resource. Called exactly once, on eviction
    /// or cache clear; the handle must not be started afterwards.
    fn release(&self);
}

/// Factory turning synthesized audio bytes into playable handles.
pub trait AudioSink: Send + Sync {
    /// Load raw audio bytes into a playable resource for a message.
    fn load(&self, message_id: &MessageId, audio: &[u8])
    -> Result<Arc<dyn AudioHandle>, AudioError>;
}
