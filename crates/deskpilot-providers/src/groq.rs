//! # Groq Backend
//!
//! OpenAI-compatible chat completions with a thumbnailed JPEG data URL.

use crate::{ProviderError, ProviderId, Result, VisionBackend};
use async_trait::async_trait;
use deskpilot_vision::{ImageEncoding, ScreenSnapshot};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.2-90b-vision-preview";
pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";

/// Screenshots are shrunk to keep the request within the model's token budget.
const GROQ_ENCODING: ImageEncoding = ImageEncoding::Jpeg {
    max_dimension: 800,
    quality: 85,
};

/// Groq vision backend
pub struct GroqBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GroqBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_GROQ_URL.to_string(),
            model: DEFAULT_GROQ_MODEL.to_string(),
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

    fn build_request(&self, prompt: &str, snapshot: &ScreenSnapshot) -> Result<ChatRequest> {
        let image_url = format!(
            "data:{};base64,{}",
            GROQ_ENCODING.mime_type(),
            snapshot.to_base64(GROQ_ENCODING)?
        );

        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ],
            }],
            temperature: 0.7,
            max_completion_tokens: 1024,
            top_p: 1.0,
            stream: false,
        })
    }
}

#[async_trait]
impl VisionBackend for GroqBackend {
    fn id(&self) -> ProviderId {
        ProviderId::Groq
    }

    async fn complete(&self, prompt: &str, snapshot: &ScreenSnapshot) -> Result<String> {
        debug!("Groq request with model: {}", self.model);

        let request = self.build_request(prompt, snapshot)?;
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let chat: ChatResponse = response.json().await?;
        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }
}

// OpenAI-compatible API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_completion_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_request_uses_jpeg_data_url() {
        let backend = GroqBackend::new("k");
        let request = backend
            .build_request("prompt", &ScreenSnapshot::blank(1600, 1200))
            .unwrap();
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(json["max_completion_tokens"], 1024);
    }

    #[tokio::test]
    async fn test_complete_reads_first_choice() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJsonString(
                format!(r#"{{"model": "{}", "stream": false}}"#, DEFAULT_GROQ_MODEL),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  {\"steps\": []}  "}}]}"#)
            .create_async()
            .await;

        let backend = GroqBackend::new("test-key").with_base_url(server.url());
        let text = backend
            .complete("prompt", &ScreenSnapshot::blank(8, 8))
            .await
            .unwrap();

        assert_eq!(text, r#"{"steps": []}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let backend = GroqBackend::new("wrong").with_base_url(server.url());
        let err = backend
            .complete("prompt", &ScreenSnapshot::blank(8, 8))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
