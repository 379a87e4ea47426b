//! Configuration schema for the Gigi engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root config for the Gigi session engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GigiConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl GigiConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> GigiConfigBuilder {
        GigiConfigBuilder::new()
    }
}

/// Builder for assembling a `GigiConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct GigiConfigBuilder {
    config: GigiConfig,
}

impl GigiConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: GigiConfig::default(),
        }
    }

    /// Replace the backend endpoint configuration.
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.config.backend = backend;
        self
    }

    /// Replace the chat configuration.
    pub fn chat(mut self, chat: ChatConfig) -> Self {
        self.config.chat = chat;
        self
    }

    /// Replace the voice configuration.
    pub fn voice(mut self, voice: VoiceConfig) -> Self {
        self.config.voice = voice;
        self
    }

    /// Replace the audio cache configuration.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Replace the local storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Finalize and return the built `GigiConfig`.
    pub fn build(self) -> GigiConfig {
        self.config
    }
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the fixed endpoint paths are appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Chat behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum accepted message length in characters, after trimming.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Assistant message rendered for server-acknowledged errors.
    #[serde(default = "default_apology_message")]
    pub apology_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            apology_message: default_apology_message(),
        }
    }
}

fn default_max_message_length() -> usize {
    500
}

fn default_apology_message() -> String {
    "Sorry, something went wrong on my end. Please try again in a moment.".to_string()
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Voice identifier sent to the synthesis endpoint.
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Playback speed multiplier.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Whether voice playback is enabled before any stored preference.
    #[serde(default = "default_voice_enabled")]
    pub enabled_by_default: bool,
    /// Whether the server may serve synthesis from its own cache.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            speed: default_speed(),
            enabled_by_default: default_voice_enabled(),
            use_cache: default_use_cache(),
        }
    }
}

fn default_voice() -> String {
    "nova".to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_voice_enabled() -> bool {
    true
}

fn default_use_cache() -> bool {
    true
}

/// Audio cache bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached audio resources.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// How many of the oldest entries are evicted on overflow.
    #[serde(default = "default_evict_batch")]
    pub evict_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            evict_batch: default_evict_batch(),
        }
    }
}

fn default_max_entries() -> usize {
    50
}

fn default_evict_batch() -> usize {
    10
}

/// Local storage configuration for preferences and the retry queue.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Storage root directory; defaults to the user data dir when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the effective storage root, falling back to the user data dir.
    pub fn root(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(PathBuf::from(path));
        }
        directories::ProjectDirs::from("com", "gigi-market", "gigi")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }
}
