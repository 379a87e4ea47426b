//! Persisted local state: user preferences and the durable retry queue.
//!
//! Both stores live under one storage root, the engine's stand-in for
//! browser-local storage. Reads degrade to defaults when files are missing
//! or corrupt; preference writes are best-effort and never raise.

use chrono::{DateTime, Utc};
use gigi_rs_protocol::ReportRequest;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Preferences file name under the storage root.
const PREFS_FILE: &str = "prefs.json";
/// Retry queue file name under the storage root.
const RETRY_QUEUE_FILE: &str = "retry_queue.jsonl";

/// Errors returned by the local stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persisted user preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    /// Whether voice playback is enabled.
    pub voice_enabled: bool,
    /// Theme name chosen by the user.
    pub theme: String,
    /// First-run onboarding flag.
    pub onboarded: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            voice_enabled: true,
            theme: "light".to_string(),
            onboarded: false,
        }
    }
}

/// JSON-file preference store.
pub struct PrefStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PrefStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(PREFS_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Load preferences, falling back to the given defaults when the file
    /// is missing or unreadable. Never raises.
    pub fn load(&self, defaults: Preferences) -> Preferences {
        if !self.path.exists() {
            debug!("no preference file, using defaults");
            return defaults;
        }
        match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(prefs) => prefs,
                Err(err) => {
                    warn!("corrupt preference file, using defaults: {err}");
                    defaults
                }
            },
            Err(err) => {
                warn!("failed to read preferences, using defaults: {err}");
                defaults
            }
        }
    }

    /// Persist preferences best-effort; failures are logged and swallowed.
    pub fn save(&self, prefs: &Preferences) {
        let _guard = self.write_lock.lock();
        if let Err(err) = self.write(prefs) {
            warn!("failed to persist preferences: {err}");
        }
    }

    fn write(&self, prefs: &Preferences) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// Operation kind for a queued retry entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetryKind {
    /// Report submission replay. Chat is never queued.
    Report,
}

/// A failed request awaiting replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryEntry {
    /// Operation kind.
    pub kind: RetryKind,
    /// The original request body.
    pub payload: ReportRequest,
    /// When the entry was queued.
    pub enqueued_at: DateTime<Utc>,
}

impl RetryEntry {
    /// Queue a report submission for replay.
    pub fn report(payload: ReportRequest) -> Self {
        Self {
            kind: RetryKind::Report,
            payload,
            enqueued_at: Utc::now(),
        }
    }
}

/// Append-only durable queue of failed submissions, one JSON object per
/// line, surviving a full reload of the embedding page.
pub struct RetryQueue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RetryQueue {
    /// Create a queue rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(RETRY_QUEUE_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Append an entry, returning the queue length afterwards.
    pub fn enqueue(&self, entry: &RetryEntry) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        drop(file);
        let queued = self.read_entries()?.len();
        info!("queued retry entry (kind={:?}, queued={})", entry.kind, queued);
        Ok(queued)
    }

    /// Read and clear the whole queue for a drain pass.
    ///
    /// The queue file is removed before any replay happens; this is a
    /// best-effort policy, entries are never retained for a second pass.
    pub fn take_all(&self) -> Result<Vec<RetryEntry>, StoreError> {
        let _guard = self.write_lock.lock();
        let entries = self.read_entries()?;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        info!("drained retry queue (entries={})", entries.len());
        Ok(entries)
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read_entries()?.len())
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Read every well-formed entry, skipping corrupt lines with a warning.
    fn read_entries(&self) -> Result<Vec<RetryEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RetryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!("skipping corrupt retry entry: {err}"),
            }
        }
        Ok(entries)
    }
}
