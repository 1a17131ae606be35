use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::llm::{GenerationError, LlmClient};

/// Reply when no API key is configured.
pub const NO_API_ACCESS_MESSAGE: &str =
    "I'm unable to process your request, as I do not have access to Google API.";
/// Reply when generation fails for any other reason.
pub const FAILURE_MESSAGE: &str = "I'm facing issues, please try again.";

pub const MISSING_KEY_NOTICE: &str = "Google API key is missing. Please check your `.env` file \
and make sure `GOOGLE_API_KEY` is present.";
pub const RETRIES_EXHAUSTED_NOTICE: &str = "Gemini API encountered an error, please try again later";
pub const UNEXPECTED_ERROR_NOTICE: &str = "An unexpected error occurred, please try again.";

/// Receives the reply as it is produced.
pub trait ResponseSink: Send {
    /// Called after every chunk with everything received so far in this attempt.
    fn typing(&mut self, partial: &str);

    /// Called once with the final reply text.
    fn complete(&mut self, full: &str);

    /// A user-facing error banner, separate from the reply itself.
    fn notice(&mut self, message: &str);
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl ResponseSink for NullSink {
    fn typing(&mut self, _partial: &str) {}
    fn complete(&mut self, _full: &str) {}
    fn notice(&mut self, _message: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Delay after the given zero-based attempt: the base delay doubled per attempt.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay().saturating_mul(factor)
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).map(move |attempt| self.delay_for(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Sending,
    Streaming,
    RateLimited,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Success,
    NoCredential,
    Failed,
}

/// Result of one turn's generation. `text` is always safe to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub status: GenerationStatus,
    pub attempts: usize,
}

impl Generation {
    fn no_credential() -> Self {
        Self {
            text: NO_API_ACCESS_MESSAGE.to_string(),
            status: GenerationStatus::NoCredential,
            attempts: 0,
        }
    }

    fn failed(attempts: usize) -> Self {
        Self {
            text: FAILURE_MESSAGE.to_string(),
            status: GenerationStatus::Failed,
            attempts,
        }
    }
}

/// Sends prompts to the model, streams the reply and retries on rate limiting
/// with exponential backoff.
pub struct ResponseGenerator {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn generate(&self, prompt: &str, sink: &mut dyn ResponseSink) -> Generation {
        transition(GenerationState::Idle, 0);
        let generation = self.run(prompt, sink).await;
        transition(GenerationState::Idle, generation.attempts);
        generation
    }

    async fn run(&self, prompt: &str, sink: &mut dyn ResponseSink) -> Generation {
        if !self.client.has_credentials() {
            return self.missing_credential(sink);
        }

        let max_attempts = self.policy.max_attempts;
        for attempt in 0..max_attempts {
            transition(GenerationState::Sending, attempt + 1);
            match self.attempt(prompt, attempt + 1, sink).await {
                Ok(text) => {
                    transition(GenerationState::Success, attempt + 1);
                    info!(attempt = attempt + 1, reply_len = text.len(), "Generated reply");
                    sink.complete(&text);
                    return Generation {
                        text,
                        status: GenerationStatus::Success,
                        attempts: attempt + 1,
                    };
                }
                Err(GenerationError::RateLimited(message)) => {
                    transition(GenerationState::RateLimited, attempt + 1);
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Resource exhausted: {}. Retrying in {:?}",
                        message,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(GenerationError::MissingCredential) => {
                    return self.missing_credential(sink);
                }
                Err(e) => {
                    transition(GenerationState::Failed, attempt + 1);
                    error!(attempt = attempt + 1, error = %e, "An unexpected error occurred");
                    sink.notice(UNEXPECTED_ERROR_NOTICE);
                    return Generation::failed(attempt + 1);
                }
            }
        }

        transition(GenerationState::Failed, max_attempts);
        error!(max_attempts, "Generation failed after max retries");
        sink.notice(RETRIES_EXHAUSTED_NOTICE);
        Generation::failed(max_attempts)
    }

    async fn attempt(
        &self,
        prompt: &str,
        attempt: usize,
        sink: &mut dyn ResponseSink,
    ) -> Result<String, GenerationError> {
        let mut stream = self.client.stream_generate(prompt).await?;

        let mut full = String::new();
        while let Some(chunk) = stream.next().await {
            if full.is_empty() {
                transition(GenerationState::Streaming, attempt);
            }
            full.push_str(&chunk?);
            sink.typing(&full);
        }
        Ok(full)
    }

    fn missing_credential(&self, sink: &mut dyn ResponseSink) -> Generation {
        error!("GOOGLE_API_KEY is not configured; skipping generation");
        sink.notice(MISSING_KEY_NOTICE);
        Generation::no_credential()
    }
}

fn transition(state: GenerationState, attempt: usize) {
    debug!(?state, attempt, "Generation state");
}
