//! Test helpers shared across Gigi crates.

pub mod audio;
pub mod backend;
pub mod events;

pub use audio::{AudioStats, StubAudioSink};
pub use backend::{ChatScript, FailingBackend, FixedBackend, GatedBackend, ScriptedBackend};
pub use events::CollectingSink;
