//! # Provider Registry
//!
//! The single place where a [`ProviderId`] becomes a live gateway.

use crate::gemini::{DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL};
use crate::groq::{DEFAULT_GROQ_MODEL, DEFAULT_GROQ_URL};
use crate::ollama::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use crate::{
    GatewayFactory, GeminiBackend, GroqBackend, ModelGateway, OllamaBackend, ProviderError,
    ProviderId, Result, RetryPolicy, VisionGateway,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Credentials, endpoints and models for every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub gemini_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub gemini_base_url: String,
    pub groq_base_url: String,
    pub ollama_base_url: String,
    pub gemini_model: String,
    pub groq_model: String,
    pub ollama_model: String,
    pub retry: RetryPolicy,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            groq_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_URL.to_string(),
            groq_base_url: DEFAULT_GROQ_URL.to_string(),
            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ProviderSettings {
    /// The configured API key for a provider, ignoring blank values.
    pub fn credential(&self, id: ProviderId) -> Option<&str> {
        let key = match id {
            ProviderId::Gemini => self.gemini_api_key.as_deref(),
            ProviderId::Groq => self.groq_api_key.as_deref(),
            ProviderId::Ollama => None,
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    /// Whether a provider can be instantiated with these settings.
    pub fn is_configured(&self, id: ProviderId) -> bool {
        !id.requires_credential() || self.credential(id).is_some()
    }

    fn require_credential(&self, id: ProviderId) -> Result<String> {
        self.credential(id).map(str::to_string).ok_or_else(|| {
            ProviderError::MissingCredential(format!("no API key configured for {}", id))
        })
    }
}

/// Builds gateways from [`ProviderSettings`].
pub struct ProviderRegistry {
    settings: ProviderSettings,
}

impl ProviderRegistry {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }
}

impl GatewayFactory for ProviderRegistry {
    fn create(&self, id: ProviderId) -> Result<Box<dyn ModelGateway>> {
        let s = &self.settings;
        let gateway: Box<dyn ModelGateway> = match id {
            ProviderId::Gemini => {
                let backend = GeminiBackend::new(s.require_credential(id)?)
                    .with_base_url(&s.gemini_base_url)
                    .with_model(&s.gemini_model);
                Box::new(VisionGateway::new(backend, s.retry))
            }
            ProviderId::Groq => {
                let backend = GroqBackend::new(s.require_credential(id)?)
                    .with_base_url(&s.groq_base_url)
                    .with_model(&s.groq_model);
                Box::new(VisionGateway::new(backend, s.retry))
            }
            ProviderId::Ollama => {
                let backend = OllamaBackend::new()
                    .with_base_url(&s.ollama_base_url)
                    .with_model(&s.ollama_model);
                Box::new(VisionGateway::new(backend, s.retry))
            }
        };

        info!("Initialized {} provider", id);
        Ok(gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_fails_fast() {
        let registry = ProviderRegistry::new(ProviderSettings::default());
        assert!(matches!(
            registry.create(ProviderId::Gemini),
            Err(ProviderError::MissingCredential(_))
        ));
        assert!(matches!(
            registry.create(ProviderId::Groq),
            Err(ProviderError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let settings = ProviderSettings {
            gemini_api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(!settings.is_configured(ProviderId::Gemini));
        assert!(settings.is_configured(ProviderId::Ollama));
    }

    #[test]
    fn test_create_each_provider() {
        let registry = ProviderRegistry::new(ProviderSettings {
            gemini_api_key: Some("g".into()),
            groq_api_key: Some("q".into()),
            ..Default::default()
        });

        for id in ProviderId::ALL {
            let gateway = registry.create(id).unwrap();
            assert_eq!(gateway.id(), id);
        }
    }
}
