//! Bounded per-message audio cache with oldest-first batch eviction.

use super::AudioHandle;
use gigi_rs_protocol::MessageId;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// One cached synthesized speech resource.
#[derive(Clone)]
pub struct CachedAudio {
    /// Weak reference into the ledger; entries may outlive ledger entries.
    pub message_id: MessageId,
    /// Playable resource, released on eviction.
    pub handle: Arc<dyn AudioHandle>,
    /// The text that was synthesized, kept for cache-key correctness.
    pub source_text: String,
}

/// Insertion-order bounded cache of synthesized audio.
///
/// Exceeding the bound evicts a batch of the oldest entries (by insertion
/// order, not recency of use) and releases their handles, so long sessions
/// cannot grow memory without bound.
#[derive(Clone)]
pub struct AudioCache {
    entries: Arc<Mutex<VecDeque<CachedAudio>>>,
    max_entries: usize,
    evict_batch: usize,
}

impl AudioCache {
    /// Create a cache with the given bound and eviction batch size.
    pub fn new(max_entries: usize, evict_batch: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_entries,
            evict_batch: evict_batch.min(max_entries),
        }
    }

    /// Look up a cached handle for a message, requiring the synthesized
    /// text to match so stale resources are never replayed.
    pub fn get(&self, message_id: &MessageId, text: &str) -> Option<Arc<dyn AudioHandle>> {
        self.entries
            .lock()
            .iter()
            .find(|entry| &entry.message_id == message_id && entry.source_text == text)
            .map(|entry| entry.handle.clone())
    }

    /// Insert a synthesized resource, evicting the oldest batch on overflow.
    pub fn insert(&self, entry: CachedAudio) {
        let mut entries = self.entries.lock();
        // Drop any stale resource for the same message before re-inserting.
        if let Some(index) = entries
            .iter()
            .position(|cached| cached.message_id == entry.message_id)
        {
            let stale = entries.remove(index);
            if let Some(stale) = stale {
                stale.handle.release();
            }
        }
        if entries.len() >= self.max_entries {
            info!(
                "audio cache full (len={}), evicting {} oldest entries",
                entries.len(),
                self.evict_batch
            );
            for evicted in entries.drain(..self.evict_batch) {
                evicted.handle.release();
            }
        }
        debug!("audio cache insert (message_id={})", entry.message_id);
        entries.push_back(entry);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Release and drop every cached resource.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        for entry in entries.drain(..) {
            entry.handle.release();
        }
    }
}
