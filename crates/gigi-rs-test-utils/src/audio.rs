use gigi_rs_core::audio::{AudioError, AudioHandle, AudioSink};
use gigi_rs_protocol::MessageId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Shared counters for everything the stub sink and its handles did.
#[derive(Default)]
pub struct AudioStats {
    pub loads: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub releases: AtomicUsize,
}

impl AudioStats {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Sink producing counting handles; can be flipped to fail loads.
#[derive(Default)]
pub struct StubAudioSink {
    pub stats: Arc<AudioStats>,
    fail_load: AtomicBool,
    pub loaded_ids: Mutex<Vec<MessageId>>,
}

impl StubAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }
}

impl AudioSink for StubAudioSink {
    fn load(
        &self,
        message_id: &MessageId,
        _audio: &[u8],
    ) -> Result<Arc<dyn AudioHandle>, AudioError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(AudioError::Load("unsupported codec".to_string()));
        }
        self.stats.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded_ids.lock().push(message_id.clone());
        Ok(Arc::new(StubAudioHandle {
            stats: self.stats.clone(),
        }))
    }
}

struct StubAudioHandle {
    stats: Arc<AudioStats>,
}

impl AudioHandle for StubAudioHandle {
    fn start(&self) -> Result<(), AudioError> {
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}
