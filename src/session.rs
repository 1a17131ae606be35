use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::extract::UploadedFile;
use crate::generator::{ResponseGenerator, ResponseSink};
use crate::pipeline::{process_documents, ExtractionConfig};
use crate::prompt::{build_prompt, render_history, PromptInput};
use crate::tables::TableDetector;

pub const GREETING: &str =
    "Hi there! I'm EDUBOT, your guide to overseas education. Let's start exploring your options.";
pub const RESET_MESSAGE: &str = "Alright, let's start over!";

const CLEAR_KEYWORD: &str = "clear";

/// Keyword replies that bypass the model, checked in order.
pub const CANNED_RESPONSES: &[(&str, &str)] = &[
    (
        "hello",
        "Hello! How can I help you with your overseas education journey today?",
    ),
    ("how are you", "I am doing great. How are you today?"),
    (
        "goodbye",
        "Goodbye! Feel free to come back if you have any more questions",
    ),
    (
        "country",
        "Sure, what country are you interested in studying in?",
    ),
    ("program", "Sure, what program are you looking into?"),
    (CLEAR_KEYWORD, RESET_MESSAGE),
];

/// Find the canned reply for a message, if any keyword occurs anywhere in it.
pub fn canned_response(message: &str) -> Option<(&'static str, &'static str)> {
    let lowered = message.to_lowercase();
    CANNED_RESPONSES
        .iter()
        .copied()
        .find(|(keyword, _)| lowered.contains(keyword))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Bot => write!(f, "bot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Role::Bot, text)
    }
}

/// State for one conversation: the message log and the files attached so far.
#[derive(Debug, Clone)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    uploads: Vec<UploadedFile>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            history: vec![ChatMessage::bot(GREETING)],
            uploads: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn uploads(&self) -> &[UploadedFile] {
        &self.uploads
    }

    pub fn add_upload(&mut self, file: UploadedFile) {
        self.uploads.push(file);
    }

    pub fn add_uploads<I: IntoIterator<Item = UploadedFile>>(&mut self, files: I) {
        self.uploads.extend(files);
    }

    /// Replace the history with a single bot message. Uploads are kept.
    pub fn reset(&mut self, message: &str) {
        self.history.clear();
        self.history.push(ChatMessage::bot(message));
    }

    /// The whole conversation as `role: message` lines.
    pub fn transcript(&self) -> String {
        render_history(&self.history)
    }

    fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
    }
}

/// Routes each user message to a canned reply or through extraction,
/// prompt assembly and generation.
pub struct ChatController {
    generator: ResponseGenerator,
    detector: Arc<dyn TableDetector>,
    extraction: ExtractionConfig,
}

impl ChatController {
    pub fn new(
        generator: ResponseGenerator,
        detector: Arc<dyn TableDetector>,
        extraction: ExtractionConfig,
    ) -> Self {
        Self {
            generator,
            detector,
            extraction,
        }
    }

    /// Handle one turn and return the bot's reply, which is also appended to
    /// the session history.
    pub async fn handle_message(
        &self,
        session: &mut ChatSession,
        message: &str,
        sink: &mut dyn ResponseSink,
    ) -> String {
        session.push(ChatMessage::user(message));

        if let Some((keyword, reply)) = canned_response(message) {
            debug!(keyword, "Canned reply");
            if keyword == CLEAR_KEYWORD {
                session.reset(reply);
            } else {
                session.push(ChatMessage::bot(reply));
            }
            sink.complete(reply);
            return reply.to_string();
        }

        let document =
            process_documents(session.uploads(), Arc::clone(&self.detector), &self.extraction)
                .await;

        let chat_history = session.transcript();
        let prompt = build_prompt(&PromptInput {
            chat_history: &chat_history,
            document_text: &document.raw_text,
            document_tables: &document.tables,
            user_message: message,
        });
        info!(
            uploads = session.uploads().len(),
            prompt_len = prompt.len(),
            "Generating reply"
        );

        let generation = self.generator.generate(&prompt, sink).await;
        session.push(ChatMessage::bot(generation.text.clone()));
        generation.text
    }
}
