mod docx;
pub mod error;
mod pdf;
mod spreadsheet;
mod text;

use std::fmt;
use std::sync::Arc;

pub use docx::extract_docx;
pub use error::ExtractionError;
pub use pdf::extract_pdf;
pub use spreadsheet::extract_spreadsheet;
pub use text::extract_text;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME: &str = "text/plain";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Upload formats the assistant can read, resolved from the declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
    Spreadsheet,
    /// Anything else. Carries the declared MIME type for logging.
    Unknown(String),
}

impl DocumentFormat {
    /// Resolve a declared MIME type. Parameters such as `; charset=utf-8` are ignored.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            PDF_MIME => DocumentFormat::Pdf,
            DOCX_MIME => DocumentFormat::Docx,
            TEXT_MIME => DocumentFormat::PlainText,
            XLSX_MIME => DocumentFormat::Spreadsheet,
            _ => DocumentFormat::Unknown(mime.to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DocumentFormat::Unknown(_))
    }

    /// Run the extractor for this format. Never fails: unreadable input and
    /// unknown formats produce an empty string.
    pub fn extract(&self, bytes: &[u8]) -> String {
        match self {
            DocumentFormat::Pdf => extract_pdf(bytes),
            DocumentFormat::Docx => extract_docx(bytes),
            DocumentFormat::PlainText => extract_text(bytes),
            DocumentFormat::Spreadsheet => extract_spreadsheet(bytes),
            DocumentFormat::Unknown(_) => String::new(),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Docx => write!(f, "docx"),
            DocumentFormat::PlainText => write!(f, "txt"),
            DocumentFormat::Spreadsheet => write!(f, "xlsx"),
            DocumentFormat::Unknown(mime) => write!(f, "unknown ({})", mime),
        }
    }
}

/// A file the user attached to the conversation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    mime_type: String,
    format: DocumentFormat,
    bytes: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime_type = mime_type.into();
        Self {
            name: name.into(),
            format: DocumentFormat::from_mime(&mime_type),
            mime_type,
            bytes: Arc::from(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn format(&self) -> &DocumentFormat {
        &self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the contents, for moving onto a worker thread.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
