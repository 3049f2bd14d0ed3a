//! # Settings File
//!
//! The per-user JSON settings document.
//!
//! - Missing keys are backfilled from defaults on load
//! - Unknown keys are kept and written back untouched
//! - Saving merges into the existing document rather than replacing it
//!
//! Environment overrides (`GEMINI_API_KEY`, `GROQ_API_KEY`,
//! `DESKPILOT_DEFAULT_MODEL`, `OLLAMA_BASE_URL`) apply to the in-memory
//! value only and are never written back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings file is not a JSON object: {0}")]
    NotAnObject(PathBuf),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Could not determine the user config directory")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardShortcuts {
    #[serde(default = "default_send_shortcut")]
    pub send_request: String,
    #[serde(default = "default_stop_shortcut")]
    pub stop_request: String,
}

fn default_send_shortcut() -> String {
    "Control-Return".to_string()
}

fn default_stop_shortcut() -> String {
    "Escape".to_string()
}

impl Default for KeyboardShortcuts {
    fn default() -> Self {
        Self {
            send_request: default_send_shortcut(),
            stop_request: default_stop_shortcut(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groq_api_key: Option<String>,

    #[serde(default = "default_ollama_url")]
    pub ollama_base_url: String,

    #[serde(default = "default_true")]
    pub play_sound_on_completion: bool,

    /// Provider used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default)]
    pub keyboard_shortcuts: KeyboardShortcuts,

    /// Keys this version does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_ollama_url() -> String {
    deskpilot_providers::ollama::DEFAULT_OLLAMA_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "gemini".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            groq_api_key: None,
            ollama_base_url: default_ollama_url(),
            play_sound_on_completion: true,
            default_model: default_model(),
            keyboard_shortcuts: KeyboardShortcuts::default(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// `<config dir>/deskpilot/settings.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("deskpilot").join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Load settings, falling back to defaults when the file is missing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        if !value.is_object() {
            return Err(SettingsError::NotAnObject(path.to_path_buf()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Load settings, writing the defaults first if the file does not exist.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            Self::default().save_to(path)?;
        }
        Self::load_from(path)
    }

    /// Merge these settings into the document at `path`.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut document = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            Err(_) => Map::new(),
        };

        if let Value::Object(ours) = serde_json::to_value(self)? {
            document.extend(ours);
        }
        // Cleared keys are not serialized, so drop any stale copy on disk
        if self.gemini_api_key.is_none() {
            document.remove("gemini_api_key");
        }
        if self.groq_api_key.is_none() {
            document.remove("groq_api_key");
        }

        std::fs::write(path, serde_json::to_string_pretty(&Value::Object(document))?)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Read one top-level key.
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self).ok()? {
            Value::Object(mut map) => map.remove(key),
            _ => None,
        }
    }

    /// Update one top-level key. The value is parsed as JSON, falling back
    /// to a plain string.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

        let mut map = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(key.to_string(), value);

        *self = serde_json::from_value(Value::Object(map)).map_err(|e| {
            SettingsError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            self.groq_api_key = Some(key);
        }

        if let Ok(model) = std::env::var("DESKPILOT_DEFAULT_MODEL") {
            debug!("Default model from env: {}", model);
            self.default_model = model;
        }

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.ollama_base_url = url;
        }

        self
    }
}
