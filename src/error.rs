//! Error types for the request pipeline.
//!
//! Every failure of a generate request ends up as one [`Error`] variant. The
//! variant decides the HTTP status and the plain-text body; the underlying
//! cause is only ever written to the log.

/// Result type for request pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Request pipeline errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No usable prompt in the query string or body.
    #[error("missing prompt in request body or URL")]
    MissingPrompt,

    /// POST body is not valid JSON.
    ///
    /// Surfaces as 500, not 400.
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// POST body parsed, but is `null` or carries a prompt that is not text.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Inference endpoint returned nothing usable.
    #[error("inference returned no image")]
    GenerationEmpty,

    /// Inference call failed.
    #[error("inference failed: {0:#}")]
    Inference(#[source] anyhow::Error),

    /// Object store write failed.
    #[error("storage failed: {0:#}")]
    Storage(#[source] anyhow::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingPrompt => 400,
            Self::MalformedBody(_)
            | Self::InvalidBody(_)
            | Self::GenerationEmpty
            | Self::Inference(_)
            | Self::Storage(_)
            | Self::Config(_) => 500,
        }
    }

    /// Plain-text body sent to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingPrompt => "Missing prompt in request body or URL",
            Self::GenerationEmpty => "Failed to generate image",
            Self::MalformedBody(_)
            | Self::InvalidBody(_)
            | Self::Inference(_)
            | Self::Storage(_)
            | Self::Config(_) => "Internal server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::MissingPrompt.status_code(), 400);
        assert_eq!(Error::GenerationEmpty.status_code(), 500);
        assert_eq!(Error::Storage(anyhow::anyhow!("disk full")).status_code(), 500);

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::MalformedBody(json_err).status_code(), 500);
    }

    #[test]
    fn test_public_message_hides_cause() {
        let err = Error::Inference(anyhow::anyhow!("token sk-123 rejected"));
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("sk-123"));
    }
}
