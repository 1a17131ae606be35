pub mod config;
pub mod extract;
pub mod generator;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod tables;
pub mod uploads;

pub use config::Config;
pub use extract::{DocumentFormat, ExtractionError, UploadedFile};
pub use generator::{Generation, GenerationStatus, ResponseGenerator, ResponseSink, RetryPolicy};
pub use llm::{GeminiClient, GeminiConfig, GenerationError, LlmClient};
pub use pipeline::{process_documents, ExtractedDocument, ExtractionConfig};
pub use prompt::{build_prompt, PromptInput};
pub use session::{ChatController, ChatMessage, ChatSession, Role};
pub use tables::{KeywordTableDetector, TableDetectionError, TableDetector};
pub use uploads::LocalSource;
