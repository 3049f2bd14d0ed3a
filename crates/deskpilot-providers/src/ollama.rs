//! # Ollama Backend
//!
//! Local models through Ollama's `/api/generate`. No credential needed.

use crate::{ProviderError, ProviderId, Result, VisionBackend};
use async_trait::async_trait;
use deskpilot_vision::{ImageEncoding, ScreenSnapshot};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2-vision";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api";

const OLLAMA_ENCODING: ImageEncoding = ImageEncoding::Jpeg {
    max_dimension: 1920,
    quality: 75,
};

/// Ollama vision backend
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionBackend for OllamaBackend {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    async fn complete(&self, prompt: &str, snapshot: &ScreenSnapshot) -> Result<String> {
        debug!("Ollama request with model: {}", self.model);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            images: vec![snapshot.to_base64(OLLAMA_ENCODING)?],
            stream: false,
        };

        let url = format!("{}/generate", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
