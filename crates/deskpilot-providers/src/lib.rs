//! # Deskpilot Providers
//!
//! Vision-model adapters that turn a goal and a screenshot into an
//! instruction set.
//!
//! ## Supported Providers
//!
//! ### Cloud
//! - Google Gemini (native `generateContent`, raw PNG)
//! - Groq (OpenAI-compatible, thumbnailed JPEG)
//!
//! ### Local
//! - Ollama (`/api/generate`)
//!
//! Every provider is a [`VisionBackend`] wrapped in a [`VisionGateway`],
//! which owns prompt construction, retries, JSON extraction and bounds
//! checking. The orchestrator only ever sees the [`ModelGateway`] trait.

pub mod gateway;
pub mod gemini;
pub mod groq;
pub mod instructions;
pub mod ollama;
pub mod prompt;
pub mod registry;
pub mod retry;
pub mod traits;

pub use gateway::VisionGateway;
pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use instructions::{
    extract_instructions, parse_instructions, Command, CommandKind, InstructionSet,
};
pub use ollama::OllamaBackend;
pub use prompt::{build_prompt, PromptStyle};
pub use registry::{ProviderRegistry, ProviderSettings};
pub use retry::RetryPolicy;
pub use traits::{GatewayFactory, GatewayOutcome, ModelGateway, VisionBackend};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<u64> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Image encoding failed: {0}")]
    Encoding(#[from] deskpilot_vision::CaptureError),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// Errors that retrying cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthError(_)
                | Self::MissingCredential(_)
                | Self::UnknownProvider(_)
                | Self::ConfigError(_)
        )
    }

    /// Map a non-success HTTP status to an error.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => Self::RateLimited { retry_after: None },
            401 | 403 => Self::AuthError(body),
            _ => Self::ApiError {
                status,
                message: body,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Identifier of a backing vision model integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    Groq,
    #[serde(alias = "ollama-llama3.2-vision")]
    Ollama,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::Gemini, ProviderId::Groq, ProviderId::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }

    /// Whether this provider needs an API key.
    pub fn requires_credential(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            "ollama" | "ollama-llama3.2-vision" => Ok(Self::Ollama),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parse() {
        assert_eq!("gemini".parse::<ProviderId>().unwrap(), ProviderId::Gemini);
        assert_eq!(" Groq ".parse::<ProviderId>().unwrap(), ProviderId::Groq);
        assert_eq!(
            "ollama-llama3.2-vision".parse::<ProviderId>().unwrap(),
            ProviderId::Ollama
        );
        assert!(matches!(
            "openai".parse::<ProviderId>(),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_provider_id_display_roundtrip() {
        for id in ProviderId::ALL {
            assert_eq!(id.to_string().parse::<ProviderId>().unwrap(), id);
        }
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(ProviderError::from_status(401, "bad key".into()).is_fatal());
        assert!(!ProviderError::from_status(500, "oops".into()).is_fatal());
    }
}
