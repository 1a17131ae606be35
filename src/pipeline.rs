use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::extract::{DocumentFormat, ExtractionError, UploadedFile};
use crate::tables::TableDetector;

/// Text and rendered tables pulled out of the uploaded files for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub raw_text: String,
    pub tables: String,
}

impl ExtractedDocument {
    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty() && self.tables.is_empty()
    }

    fn append(&mut self, other: ExtractedDocument) {
        self.raw_text.push_str(&other.raw_text);
        if !other.tables.is_empty() {
            if !self.tables.is_empty() {
                self.tables.push('\n');
            }
            self.tables.push_str(&other.tables);
        }
    }
}

/// Limits applied to a single file's extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub timeout_ms: u64,
    pub max_file_bytes: usize,
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_file_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Extract every uploaded file in order and concatenate the results.
///
/// A file that cannot be processed contributes nothing; the remaining files
/// are still processed.
pub async fn process_documents(
    files: &[UploadedFile],
    detector: Arc<dyn TableDetector>,
    config: &ExtractionConfig,
) -> ExtractedDocument {
    let mut combined = ExtractedDocument::default();
    for file in files {
        combined.append(process_file(file, Arc::clone(&detector), config).await);
    }

    info!(
        files = files.len(),
        text_len = combined.raw_text.len(),
        tables_len = combined.tables.len(),
        "Processed uploaded documents"
    );
    combined
}

/// Extract a single file, degrading to an empty document on any failure.
pub async fn process_file(
    file: &UploadedFile,
    detector: Arc<dyn TableDetector>,
    config: &ExtractionConfig,
) -> ExtractedDocument {
    match try_process_file(file, detector, config).await {
        Ok(document) => document,
        Err(e) => {
            error!(file = %file.name(), format = %file.format(), error = %e, "Error processing file");
            ExtractedDocument::default()
        }
    }
}

async fn try_process_file(
    file: &UploadedFile,
    detector: Arc<dyn TableDetector>,
    config: &ExtractionConfig,
) -> Result<ExtractedDocument, ExtractionError> {
    if let DocumentFormat::Unknown(mime) = file.format() {
        debug!(file = %file.name(), mime = %mime, "Unsupported upload type, skipping");
        return Ok(ExtractedDocument::default());
    }

    if file.len() > config.max_file_bytes {
        return Err(ExtractionError::TooLarge {
            size: file.len(),
            limit: config.max_file_bytes,
        });
    }

    let format = file.format().clone();
    let bytes = file.shared_bytes();
    // Parser libraries may block for a long time or panic on hostile input,
    // so each file runs on the blocking pool under a deadline.
    let task = tokio::task::spawn_blocking(move || format.extract(&bytes));

    let raw_text = match tokio::time::timeout(config.timeout(), task).await {
        Ok(Ok(text)) => text,
        Ok(Err(join_error)) => return Err(ExtractionError::Worker(join_error.to_string())),
        Err(_) => return Err(ExtractionError::Timeout(config.timeout_ms)),
    };
    debug!(file = %file.name(), text_len = raw_text.len(), "Extracted file");

    let tables = detect_tables(file, &raw_text, detector, config).await;
    Ok(ExtractedDocument { raw_text, tables })
}

/// Run table detection apart from extraction. A failed or slow detector
/// only costs the table block; the extracted text is kept.
async fn detect_tables(
    file: &UploadedFile,
    raw_text: &str,
    detector: Arc<dyn TableDetector>,
    config: &ExtractionConfig,
) -> String {
    if raw_text.is_empty() {
        return String::new();
    }

    let text = raw_text.to_string();
    let task = tokio::task::spawn_blocking(move || detector.detect(&text));

    match tokio::time::timeout(config.timeout(), task).await {
        Ok(Ok(tables)) => tables,
        Ok(Err(join_error)) => {
            warn!(file = %file.name(), error = %join_error, "Table detection failed");
            String::new()
        }
        Err(_) => {
            warn!(file = %file.name(), timeout_ms = config.timeout_ms, "Table detection timed out");
            String::new()
        }
    }
}
