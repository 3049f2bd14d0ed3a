//! # Runtime Configuration
//!
//! `PilotConfig` is assembled once at startup from the settings file and
//! code defaults, then passed into each component's constructor.

use crate::{CoreError, Result, Settings};
use deskpilot_providers::{ProviderId, ProviderSettings};
use deskpilot_vision::{CaptureSettings, TimingConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Pause between two successful commands
    pub command_delay: Duration,
    /// Capacity of the caller-facing request channel
    pub request_queue: usize,
    /// Capacity of the status channel; further lines are dropped
    pub status_queue: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            command_delay: Duration::from_millis(500),
            request_queue: 16,
            status_queue: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotConfig {
    pub providers: ProviderSettings,
    pub capture: CaptureSettings,
    pub timing: TimingConfig,
    pub orchestrator: OrchestratorConfig,
    /// Provider used when a request does not name one
    pub default_provider: ProviderId,
    pub play_sound_on_completion: bool,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            providers: ProviderSettings::default(),
            capture: CaptureSettings::default(),
            timing: TimingConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            default_provider: ProviderId::Gemini,
            play_sound_on_completion: true,
        }
    }
}

impl PilotConfig {
    /// Build the runtime configuration from the settings document.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let default_provider = settings.default_model.parse()?;

        let providers = ProviderSettings {
            gemini_api_key: settings.gemini_api_key.clone(),
            groq_api_key: settings.groq_api_key.clone(),
            ollama_base_url: settings.ollama_base_url.clone(),
            ..Default::default()
        };

        let config = Self {
            providers,
            default_provider,
            play_sound_on_completion: settings.play_sound_on_completion,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace every input delay with zero.
    pub fn with_instant_timing(mut self) -> Self {
        self.timing = TimingConfig::instant();
        self.orchestrator.command_delay = Duration::ZERO;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.request_queue == 0 {
            return Err(CoreError::ConfigError(
                "Request queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.orchestrator.status_queue == 0 {
            return Err(CoreError::ConfigError(
                "Status queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.providers.retry.max_attempts == 0 {
            return Err(CoreError::ConfigError(
                "Retry ceiling must be at least 1 attempt".to_string(),
            ));
        }

        Ok(())
    }
}
