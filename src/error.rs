use axum::http::StatusCode;
use thiserror::Error;

/// Errors that can occur inside the generation gateway.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("Provider unreachable: {provider} - {message}")]
    Unreachable { provider: String, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {provider} - {message}")]
    Upstream { provider: String, message: String },

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn unreachable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Unreachable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Upstream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    /// Classify a transport-level failure from the HTTP client.
    ///
    /// Connection refused and timeouts both mean the backend is not there to
    /// answer, which callers must be able to tell apart from a backend that
    /// answered badly.
    pub fn from_transport(provider: impl Into<String>, err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::unreachable(provider, err.to_string())
        } else {
            Error::upstream(provider, err.to_string())
        }
    }

    /// The HTTP status this error maps to on the buffered path.
    ///
    /// The streaming path uses the same mapping for its terminal error frame
    /// so error semantics are identical across transports.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ModelNotFound(_) => StatusCode::NOT_FOUND,
            Error::Unreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Upstream { .. } | Error::Streaming(_) | Error::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::validation("missing field model").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::ModelNotFound("llama3.2".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::unreachable("ollama", "connection refused").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::upstream("lmstudio", "500 body").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::streaming("malformed chunk").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_display() {
        let error = Error::upstream("ollama", "boom");
        assert!(error.to_string().contains("ollama"));
        assert!(error.to_string().contains("boom"));

        let validation = Error::validation("missing field prompt");
        assert_eq!(validation.to_string(), "missing field prompt");
    }
}
