use tracing::error;

use crate::extract::error::ExtractionError;

/// Decode a plain-text upload. Anything that is not valid UTF-8 yields an empty string.
pub fn extract_text(bytes: &[u8]) -> String {
    match read_text(bytes) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Error reading TXT");
            String::new()
        }
    }
}

fn read_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_text() {
        assert_eq!(extract_text("Grüße aus Köln\n".as_bytes()), "Grüße aus Köln\n");
    }

    #[test]
    fn test_byte_order_mark_is_dropped() {
        assert_eq!(extract_text(b"\xef\xbb\xbfhello"), "hello");
    }

    #[test]
    fn test_invalid_utf8_is_empty() {
        assert_eq!(extract_text(&[0x66, 0x6f, 0xff, 0xfe]), "");
    }
}
