//! Client error types.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::classify::{ClassifyError, PayloadError};
use crate::store::StoreError;

use super::request::ValidationError;

/// Errors from the tracker client.
///
/// Errors the trackers report in their payloads are not here; they come back
/// as data inside a classified response.
#[derive(Debug)]
pub enum CtaError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// Tracker answered with a non-success HTTP status
    Status { status: u16, message: String },

    /// Rate limited by the tracker
    RateLimited,

    /// Body was not JSON
    Json {
        message: String,
        body: Option<String>,
    },

    /// A fixture file could not be read
    Fixture {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Request rejected before it was sent
    Validation(ValidationError),

    /// Payload decoded but could not be understood
    Payload(PayloadError),

    /// Schedule lookup failed
    Store(StoreError),

    /// A fetch for the same request failed while this caller was waiting on it
    Shared(Arc<CtaError>),
}

impl CtaError {
    /// Unwrap a cache error when nobody else holds it.
    pub(crate) fn from_shared(err: Arc<CtaError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(CtaError::Shared)
    }
}

impl fmt::Display for CtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtaError::Http(e) => write!(f, "HTTP error: {e}"),
            CtaError::Status { status, message } => {
                write!(f, "tracker returned HTTP {status}: {message}")
            }
            CtaError::RateLimited => write!(f, "rate limited by tracker"),
            CtaError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            CtaError::Fixture { path, source } => {
                write!(f, "failed to read fixture {}: {source}", path.display())
            }
            CtaError::Validation(e) => write!(f, "invalid request: {e}"),
            CtaError::Payload(e) => write!(f, "unexpected payload: {e}"),
            CtaError::Store(e) => write!(f, "schedule error: {e}"),
            CtaError::Shared(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CtaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CtaError::Http(e) => Some(e),
            CtaError::Fixture { source, .. } => Some(source),
            CtaError::Validation(e) => Some(e),
            CtaError::Payload(e) => Some(e),
            CtaError::Store(e) => Some(e),
            CtaError::Shared(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CtaError {
    fn from(err: reqwest::Error) -> Self {
        CtaError::Http(err)
    }
}

impl From<ValidationError> for CtaError {
    fn from(err: ValidationError) -> Self {
        CtaError::Validation(err)
    }
}

impl From<ClassifyError> for CtaError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::Payload(e) => CtaError::Payload(e),
            ClassifyError::Store(e) => CtaError::Store(e),
        }
    }
}

impl From<StoreError> for CtaError {
    fn from(err: StoreError) -> Self {
        CtaError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CtaError::RateLimited;
        assert_eq!(err.to_string(), "rate limited by tracker");

        let err = CtaError::Status {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "tracker returned HTTP 500: Internal Server Error");

        let err = CtaError::Json {
            message: "expected value".into(),
            body: Some("<html>".into()),
        };
        assert!(err.to_string().contains("JSON parse error"));
        assert!(err.to_string().contains("<html>"));

        let err = CtaError::from(ValidationError::Required("route"));
        assert_eq!(err.to_string(), "invalid request: route is required");
    }

    #[test]
    fn shared_errors_unwrap_when_unique() {
        let err = CtaError::from_shared(Arc::new(CtaError::RateLimited));
        assert!(matches!(err, CtaError::RateLimited));

        let shared = Arc::new(CtaError::RateLimited);
        let _other = shared.clone();
        let err = CtaError::from_shared(shared);
        assert!(matches!(err, CtaError::Shared(_)));
        assert_eq!(err.to_string(), "rate limited by tracker");
    }

    #[test]
    fn classify_errors_flatten() {
        let err = CtaError::from(ClassifyError::Payload(PayloadError::UnexpectedRoot {
            expected: "ctatt",
        }));
        assert!(matches!(err, CtaError::Payload(_)));
    }
}
