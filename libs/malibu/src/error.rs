use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced through a [`Ride`](crate::Ride) or returned by request
/// construction, validation and serialization.
///
/// Wrapped third-party errors are held behind `Arc` so that an error can be
/// stored inside a [`Mock`](crate::Mock) and replayed on every execution.
#[derive(Debug, Clone, Error)]
pub enum MalibuError {
    #[error("No mock provided for the current request and method")]
    NoMockProvided,

    #[error("Invalid request URL: {0}")]
    InvalidRequestUrl(String),

    #[error("Response content type was missing")]
    MissingContentType,

    #[error("Parameter is not convertible to request data: {0}")]
    InvalidParameter(String),

    #[error("Invalid upload file path")]
    InvalidUploadFilePath,

    #[error("No data in response")]
    NoDataInResponse,

    #[error("No response received")]
    NoResponseReceived,

    #[error("Response status code {0} was unacceptable")]
    UnacceptableStatusCode(u16),

    #[error("Response content type {0} was unacceptable")]
    UnacceptableContentType(String),

    #[error("No JSON array in response data")]
    JsonArraySerializationFailed,

    #[error("No JSON dictionary in response data")]
    JsonDictionarySerializationFailed,

    #[error("String could not be serialized with encoding: {0}")]
    StringSerializationFailed(String),

    #[error("Transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    #[error("Serialization error: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for MalibuError {
    fn from(err: reqwest::Error) -> Self {
        MalibuError::Transport(Arc::new(err))
    }
}

impl From<serde_json::Error> for MalibuError {
    fn from(err: serde_json::Error) -> Self {
        MalibuError::Serialization(Arc::new(err))
    }
}

impl From<figment::Error> for MalibuError {
    fn from(err: figment::Error) -> Self {
        MalibuError::Configuration(err.to_string())
    }
}

/// Result type for malibu operations.
pub type Result<T> = std::result::Result<T, MalibuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_messages() {
        assert_eq!(
            MalibuError::UnacceptableStatusCode(404).to_string(),
            "Response status code 404 was unacceptable"
        );
        assert_eq!(
            MalibuError::StringSerializationFailed("utf-8".into()).to_string(),
            "String could not be serialized with encoding: utf-8"
        );
        assert_eq!(
            MalibuError::NoMockProvided.to_string(),
            "No mock provided for the current request and method"
        );
    }

    #[test]
    fn test_serde_error_is_wrapped() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MalibuError = parse_err.into();
        assert!(matches!(err, MalibuError::Serialization(_)));
        assert!(std::error::Error::source(&err).is_some());

        // Clones share the same underlying error.
        let cloned = err.clone();
        assert_eq!(cloned.to_string(), err.to_string());
    }
}
