pub mod error;
mod gemini;
mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

pub use error::GenerationError;
pub use gemini::{GeminiClient, GeminiConfig};
pub use sse::decode_text_stream;

/// Lazily produced response text. Finite and not restartable; chunk
/// boundaries carry no meaning.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// A hosted text-generation backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Whether a credential is configured. Checked before any request is made.
    fn has_credentials(&self) -> bool;

    /// Start a streaming generation for `prompt`.
    async fn stream_generate(&self, prompt: &str) -> Result<TextStream, GenerationError>;
}
