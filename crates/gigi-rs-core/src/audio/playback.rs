//! Single-flight playback coordination.

use super::{AudioError, AudioHandle};
use gigi_rs_protocol::MessageId;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

/// Enforces at most one active audio resource session-wide.
///
/// There is no queueing of pending playback requests: starting playback for
/// message B while A is playing stops A first, and the most recent request
/// wins.
#[derive(Clone, Default)]
pub struct PlaybackCoordinator {
    current: Arc<Mutex<Option<(MessageId, Arc<dyn AudioHandle>)>>>,
}

impl PlaybackCoordinator {
    /// Create an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the message currently playing, if any.
    pub fn current(&self) -> Option<MessageId> {
        self.current.lock().as_ref().map(|(id, _)| id.clone())
    }

    /// Stop whatever is playing, returning the id that was stopped.
    pub fn stop(&self) -> Option<MessageId> {
        let mut current = self.current.lock();
        let (message_id, handle) = current.take()?;
        debug!("stopping playback (message_id={})", message_id);
        handle.stop();
        Some(message_id)
    }

    /// Start playback for a message with an already-loaded handle.
    ///
    /// Callers must stop the previous resource first; on start failure the
    /// slot is left clear so no control stays in a playing state with no
    /// active resource.
    pub fn begin(
        &self,
        message_id: MessageId,
        handle: Arc<dyn AudioHandle>,
    ) -> Result<(), AudioError> {
        let mut current = self.current.lock();
        if let Some((previous, handle)) = current.take() {
            debug!("pre-empting playback (message_id={})", previous);
            handle.stop();
        }
        handle.start()?;
        debug!("playback started (message_id={})", message_id);
        *current = Some((message_id, handle));
        Ok(())
    }

    /// Clear the playing slot after a natural end or element error.
    ///
    /// Returns true when the finished message was the one playing; a stale
    /// completion for an already-replaced resource is ignored.
    pub fn finished(&self, message_id: &MessageId) -> bool {
        let mut current = self.current.lock();
        match current.as_ref() {
            Some((playing, _)) if playing == message_id => {
                debug!("playback finished (message_id={})", message_id);
                *current = None;
                true
            }
            _ => false,
        }
    }
}
