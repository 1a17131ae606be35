use tracing::error;

use crate::extract::error::ExtractionError;

/// Extract the text of every page of a PDF, in page order.
pub fn extract_pdf(bytes: &[u8]) -> String {
    match read_pdf(bytes) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Error reading PDF");
            String::new()
        }
    }
}

fn read_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed documents
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    let text = match result {
        Ok(extracted) => extracted.map_err(|e| ExtractionError::Pdf(e.to_string()))?,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Err(ExtractionError::Pdf(format!("parser panicked: {}", message)));
        }
    };
    Ok(cleanup_pdf_text(&text))
}

/// Undo the ligatures and odd spaces PDF fonts commonly produce.
/// Non-breaking spaces matter here: tables are split on runs of plain spaces.
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}
