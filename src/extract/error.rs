use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("Text is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("File is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Extraction timed out after {0} ms")]
    Timeout(u64),

    #[error("Extraction worker failed: {0}")]
    Worker(String),
}
