//! Core session engine for the Gigi widget.
//!
//! This crate owns the message ledger, audio cache and playback
//! coordination, the durable retry queue, and the session engine that
//! orchestrates them against the backend HTTP surface.

pub mod audio;
pub mod backend;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod ledger;
pub mod store;
pub mod types;

pub use audio::{AudioCache, AudioError, AudioHandle, AudioSink, PlaybackCoordinator};
pub use backend::{BackendClient, BackendError, HttpBackend};
pub use engine::{SendOutcome, SessionEngine};
pub use error::GigiCoreError;
pub use events::EventBus;
pub use ledger::MessageLedger;
pub use store::{PrefStore, Preferences, RetryEntry, RetryQueue, StoreError};
pub use types::{Message, Session};

/// Re-export of the event sink seam consumed by rendering layers.
pub use gigi_rs_protocol::EventSink;
