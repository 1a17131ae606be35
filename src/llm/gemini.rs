use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::llm::{decode_text_stream, GenerationError, LlmClient, TextStream};

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl GeminiConfig {
    /// Get the streaming endpoint for the configured model
    pub fn get_url(&self) -> Result<Url, GenerationError> {
        let base = if self.base_url.starts_with("http://") || self.base_url.starts_with("https://")
        {
            self.base_url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.base_url.trim_end_matches('/'))
        };

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            base, self.model
        );
        Url::parse(&url).map_err(|e| GenerationError::Config(format!("Invalid URL: {}", e)))
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .finish()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
}

/// Streaming client for the Gemini `streamGenerateContent` API
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    url: Url,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let url = config.get_url()?;
        Ok(Self {
            client: Client::new(),
            config,
            url,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn has_credentials(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn stream_generate(&self, prompt: &str) -> Result<TextStream, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredential)?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
            },
        };

        debug!(model = %self.config.model, prompt_len = prompt.len(), "Sending streaming request");
        let response = self
            .client
            .post(self.url.clone())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status.as_u16(), body));
        }

        Ok(decode_text_stream(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_generation() {
        let config = GeminiConfig {
            model: "gemini-pro".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.get_url().unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:streamGenerateContent?alt=sse"
        );

        let config = GeminiConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            model: "test".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.get_url().unwrap().as_str(),
            "http://127.0.0.1:8080/v1beta/models/test:streamGenerateContent?alt=sse"
        );

        let config = GeminiConfig {
            base_url: "proxy.internal".to_string(),
            model: "test".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.get_url().unwrap().as_str(),
            "https://proxy.internal/v1beta/models/test:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_invalid_url() {
        let config = GeminiConfig {
            base_url: "http://exa mple.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.get_url(), Err(GenerationError::Config(_))));
        assert!(GeminiClient::new(config).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = GeminiConfig {
            api_key: Some("AIza-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("AIza-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_missing_key_never_sends() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        assert!(!client.has_credentials());
        assert!(matches!(
            client.stream_generate("hello").await,
            Err(GenerationError::MissingCredential)
        ));
    }
}
