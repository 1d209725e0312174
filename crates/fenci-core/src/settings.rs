//! Process-wide segmentation defaults.
//!
//! Three tables supply the values a `fenci::TokenizerConfig` starts from:
//!
//! - `[segment]`: HMM fallback on or off, and how a buffer that spells a
//!   dictionary word is emitted (`"split"` or `"join"`).
//! - `[dictionary]`: what repeated dictionary lines and explicit
//!   `add_word` frequencies do to an existing count.
//! - `[cache]`: whether snapshots are written, and their file prefix.
//!
//! The embedded `default_settings.toml` is used unless [`init_custom`]
//! supplies another document before the first [`settings`] call.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::dict::DuplicatePolicy;
use crate::segmenter::BufferPolicy;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Replace the embedded defaults. The document is validated here, so a
/// bad file is reported before any tokenizer reads it.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub segment: SegmentSettings,
    pub dictionary: DictionarySettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentSettings {
    pub hmm: bool,
    pub dictionary_buffer: BufferPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictionarySettings {
    pub duplicate_policy: DuplicatePolicy,
    pub user_word_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,
    pub file_prefix: String,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    let prefix = &s.cache.file_prefix;
    if prefix.is_empty() {
        return Err(SettingsError::InvalidValue {
            field: "cache.file_prefix".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if prefix.contains(['/', '\\']) || prefix == "." || prefix == ".." {
        return Err(SettingsError::InvalidValue {
            field: "cache.file_prefix".to_string(),
            reason: "must be a plain file name".to_string(),
        });
    }
    Ok(())
}
