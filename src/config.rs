use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::generator::RetryPolicy;
use crate::llm::GeminiConfig;
use crate::pipeline::ExtractionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub retry: RetryPolicy,
    pub extraction: ExtractionConfig,
    pub logging: LoggingConfig,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = GeminiConfig::default();
        let gemini = GeminiConfig {
            api_key: env::var("GOOGLE_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            model: env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            temperature: parse_or("GEMINI_TEMPERATURE", defaults.temperature),
            top_p: parse_or("GEMINI_TOP_P", defaults.top_p),
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or("GENERATION_MAX_RETRIES", retry_defaults.max_attempts).max(1),
            base_delay_ms: parse_or("GENERATION_RETRY_DELAY_MS", retry_defaults.base_delay_ms),
        };

        let extraction_defaults = ExtractionConfig::default();
        let extraction = ExtractionConfig {
            timeout_ms: parse_or(
                "EXTRACTION_TIMEOUT_SECS",
                extraction_defaults.timeout_ms / 1000,
            )
            .saturating_mul(1000),
            max_file_bytes: parse_or("MAX_UPLOAD_BYTES", extraction_defaults.max_file_bytes),
        };

        let logging = LoggingConfig {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            gemini,
            retry,
            extraction,
            logging,
        })
    }
}
