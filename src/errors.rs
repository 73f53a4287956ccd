//! # Error Types Module
//!
//! This module defines the error types used at the boundaries of the
//! enrichment pipeline. Adapters convert every transport or parsing problem
//! into one of these values so the orchestrators can decide between
//! retrying, falling back to the next provider, or giving up.

use thiserror::Error;

/// Failure of a single text or image provider call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// No credentials configured for this backend
    #[error("missing credentials for {0}")]
    MissingCredentials(String),
    /// Transport-level failure (connection refused, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(String),
    /// Backend answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// The request exceeded its timeout
    #[error("request timed out")]
    Timeout,
    /// Content-safety or rate-limit rejection
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The response could not be turned into the expected payload
    #[error("unparsable response: {0}")]
    Unparsable(String),
    /// The backend answered successfully but with nothing usable
    #[error("empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether another attempt against the same provider can succeed.
    ///
    /// Missing credentials and moderation/rate-limit rejections are not
    /// retried; the orchestrator moves straight to the next provider.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProviderError::MissingCredentials(_) | ProviderError::Rejected(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = err.status() {
            ProviderError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

/// Failure of a search backend or encyclopedia lookup
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Http(err.to_string())
    }
}

/// Failure of the rehost-to-storage boundary
#[derive(Debug, Error)]
pub enum StorageError {
    /// The remote source could not be downloaded or is not an image
    #[error("source unavailable: {0}")]
    Source(String),
    /// The bytes could not be written to storage
    #[error("upload failed: {0}")]
    Upload(String),
}

/// Failure of the image resolution pipeline that must reach the operator
#[derive(Debug, Error)]
pub enum ImagePipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("card rendering failed: {0}")]
    Render(#[from] image::ImageError),
}

/// Invalid or missing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::EmptyResponse.is_retryable());
        assert!(ProviderError::Status {
            status: 500,
            body: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::MissingCredentials("openai".into()).is_retryable());
        assert!(!ProviderError::Rejected("moderation".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::Status {
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(err.to_string(), "unexpected status 429: slow down");
        assert_eq!(
            ConfigError::Missing("DATABASE_URL").to_string(),
            "DATABASE_URL must be set"
        );
        assert_eq!(
            StorageError::Upload("403".into()).to_string(),
            "upload failed: 403"
        );
    }

    #[test]
    fn test_errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProviderError>();
        assert_send_sync::<StorageError>();
        assert_send_sync::<ImagePipelineError>();
    }
}
