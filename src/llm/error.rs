use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No API key configured")]
    MissingCredential,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request error: {0}")]
    Request(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// Classify an error status returned by the API. Quota exhaustion is
    /// reported either as HTTP 429 or as a `RESOURCE_EXHAUSTED` status.
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 429 || message.contains("RESOURCE_EXHAUSTED") {
            GenerationError::RateLimited(message)
        } else {
            GenerationError::Api { status, message }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => GenerationError::from_status(status.as_u16(), e.to_string()),
            None => GenerationError::Request(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert!(GenerationError::from_status(429, "slow down".to_string()).is_rate_limited());
        assert!(GenerationError::from_status(
            400,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.to_string()
        )
        .is_rate_limited());

        match GenerationError::from_status(500, "boom".to_string()) {
            GenerationError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
