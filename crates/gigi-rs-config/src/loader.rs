//! JSON5 config loading with strict schema validation.
//!
//! Parses a single config source, rejects unknown keys with per-field error
//! paths, and applies semantic checks before decoding into `GigiConfig`.

use crate::{ConfigError, GigiConfig};
use log::{debug, info};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

impl GigiConfig {
    /// Load a config from a JSON5 file path.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a config from JSON5 contents.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        validate_schema(&value)?;
        let config: GigiConfig = serde_json::from_value(value)?;
        validate_semantics(&config)?;
        Ok(config)
    }
}

/// Validate the raw JSON value against the config schema.
fn validate_schema(value: &Value) -> Result<(), ConfigError> {
    let map = expect_object(value, "")?;
    let allowed = ["$schema", "backend", "chat", "voice", "cache", "storage"];
    ensure_allowed_keys(map, &allowed, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, "$schema")?;
    }
    if let Some(value) = map.get("backend") {
        validate_backend(value, "backend")?;
    }
    if let Some(value) = map.get("chat") {
        validate_chat(value, "chat")?;
    }
    if let Some(value) = map.get("voice") {
        validate_voice(value, "voice")?;
    }
    if let Some(value) = map.get("cache") {
        validate_cache(value, "cache")?;
    }
    if let Some(value) = map.get("storage") {
        validate_storage(value, "storage")?;
    }
    Ok(())
}

/// Validate the "backend" block.
fn validate_backend(value: &Value, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, path)?;
    ensure_allowed_keys(map, &["base_url", "timeout_secs"], path)?;
    if let Some(value) = map.get("base_url") {
        expect_string(value, &format!("{path}.base_url"))?;
    }
    if let Some(value) = map.get("timeout_secs") {
        expect_u64(value, &format!("{path}.timeout_secs"))?;
    }
    Ok(())
}

/// Validate the "chat" block.
fn validate_chat(value: &Value, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, path)?;
    ensure_allowed_keys(map, &["max_message_length", "apology_message"], path)?;
    if let Some(value) = map.get("max_message_length") {
        expect_u64(value, &format!("{path}.max_message_length"))?;
    }
    if let Some(value) = map.get("apology_message") {
        expect_string(value, &format!("{path}.apology_message"))?;
    }
    Ok(())
}

/// Validate the "voice" block.
fn validate_voice(value: &Value, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, path)?;
    ensure_allowed_keys(
        map,
        &["voice", "speed", "enabled_by_default", "use_cache"],
        path,
    )?;
    if let Some(value) = map.get("voice") {
        expect_string(value, &format!("{path}.voice"))?;
    }
    if let Some(value) = map.get("speed") {
        expect_f64(value, &format!("{path}.speed"))?;
    }
    if let Some(value) = map.get("enabled_by_default") {
        expect_bool(value, &format!("{path}.enabled_by_default"))?;
    }
    if let Some(value) = map.get("use_cache") {
        expect_bool(value, &format!("{path}.use_cache"))?;
    }
    Ok(())
}

/// Validate the "cache" block.
fn validate_cache(value: &Value, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, path)?;
    ensure_allowed_keys(map, &["max_entries", "evict_batch"], path)?;
    if let Some(value) = map.get("max_entries") {
        expect_u64(value, &format!("{path}.max_entries"))?;
    }
    if let Some(value) = map.get("evict_batch") {
        expect_u64(value, &format!("{path}.evict_batch"))?;
    }
    Ok(())
}

/// Validate the "storage" block.
fn validate_storage(value: &Value, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, path)?;
    ensure_allowed_keys(map, &["path"], path)?;
    if let Some(value) = map.get("path") {
        expect_string(value, &format!("{path}.path"))?;
    }
    Ok(())
}

/// Semantic checks that cannot be expressed as key/type validation.
fn validate_semantics(config: &GigiConfig) -> Result<(), ConfigError> {
    if config.chat.max_message_length == 0 {
        return Err(invalid_field(
            "chat.max_message_length",
            "must be at least 1",
        ));
    }
    if config.cache.max_entries == 0 {
        return Err(invalid_field("cache.max_entries", "must be at least 1"));
    }
    if config.cache.evict_batch == 0 || config.cache.evict_batch > config.cache.max_entries {
        return Err(invalid_field(
            "cache.evict_batch",
            "must be between 1 and cache.max_entries",
        ));
    }
    if !(config.voice.speed.is_finite() && config.voice.speed > 0.0) {
        return Err(invalid_field("voice.speed", "must be a positive number"));
    }
    if config.backend.base_url.trim().is_empty() {
        return Err(invalid_field("backend.base_url", "must not be empty"));
    }
    Ok(())
}

/// Build an `InvalidField` error with a dotted path.
fn invalid_field(path: &str, message: &str) -> ConfigError {
    ConfigError::InvalidField {
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(path, "expected string"))
    }
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(path, "expected bool"))
    }
}

/// Expect a JSON u64 or return a typed error.
fn expect_u64(value: &Value, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(path, "expected unsigned integer"))
    }
}

/// Expect a JSON number or return a typed error.
fn expect_f64(value: &Value, path: &str) -> Result<(), ConfigError> {
    if value.is_f64() || value.is_u64() || value.is_i64() {
        Ok(())
    } else {
        Err(invalid_field(path, "expected number"))
    }
}

/// Reject keys outside the allowed set for a block.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            let full = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };
            return Err(invalid_field(&full, "unknown key"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{ConfigError, GigiConfig};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    /// Verify that a minimal config parses with defaults.
    #[test]
    fn parse_minimal_config() {
        let config = GigiConfig::load_from_str("{}").expect("config");
        assert_eq!(config.chat.max_message_length, 500);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.evict_batch, 10);
        assert_eq!(config.voice.voice, "nova");
        assert!(config.voice.enabled_by_default);
    }

    /// Accept JSON5 syntax with comments and unquoted keys.
    #[test]
    fn parse_json5_overrides() {
        let json5 = r#"{
            // widget limits
            chat: { max_message_length: 280 },
            voice: { voice: "alloy", speed: 1.25 },
        }"#;
        let config = GigiConfig::load_from_str(json5).expect("config");
        assert_eq!(config.chat.max_message_length, 280);
        assert_eq!(config.voice.voice, "alloy");
        assert_eq!(config.voice.speed, 1.25);
    }

    /// Reject unexpected top-level config keys.
    #[test]
    fn rejects_unknown_top_level_key() {
        let err = GigiConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
        assert!(format!("{err}").contains("unknown key"));
    }

    /// Reject unexpected nested keys with a dotted path.
    #[test]
    fn rejects_unknown_nested_key() {
        let err = GigiConfig::load_from_str(r#"{ voice: { pitch: 2 } }"#).unwrap_err();
        assert!(format!("{err}").contains("voice.pitch"));
    }

    /// Reject a zero message length limit.
    #[test]
    fn rejects_zero_max_message_length() {
        let err = GigiConfig::load_from_str(r#"{ chat: { max_message_length: 0 } }"#).unwrap_err();
        match err {
            ConfigError::InvalidField { path, .. } => {
                assert_eq!(path, "chat.max_message_length");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Reject an eviction batch larger than the cache bound.
    #[test]
    fn rejects_oversized_evict_batch() {
        let err = GigiConfig::load_from_str(r#"{ cache: { max_entries: 5, evict_batch: 6 } }"#)
            .unwrap_err();
        assert!(format!("{err}").contains("cache.evict_batch"));
    }

    /// Reject non-positive playback speed.
    #[test]
    fn rejects_non_positive_speed() {
        let err = GigiConfig::load_from_str(r#"{ voice: { speed: 0 } }"#).unwrap_err();
        assert!(format!("{err}").contains("voice.speed"));
    }

    /// Load a config from a file on disk.
    #[test]
    fn loads_from_path() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("gigi.json5");
        fs::write(&path, r#"{ backend: { base_url: "https://market.test" } }"#).expect("write");
        let config = GigiConfig::load_from_path(&path).expect("config");
        assert_eq!(config.backend.base_url, "https://market.test");
    }
}
