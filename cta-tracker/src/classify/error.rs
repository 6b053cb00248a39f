//! Classifier error types.

use crate::store::StoreError;

/// An error reported by a tracker API inside an otherwise valid response.
///
/// This is data, not a failure: it is carried in [`Response`](super::Response)
/// so callers can branch on it. Code 0 with message "OK" means success.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tracker error {code}: {message}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

impl ApiError {
    pub const OK_MESSAGE: &'static str = "OK";
    pub const UNSPECIFIED_MESSAGE: &'static str = "unspecified tracker error";

    pub fn ok() -> Self {
        Self {
            code: 0,
            message: Self::OK_MESSAGE.to_string(),
        }
    }

    /// Normalize whatever a family reported into one shape.
    ///
    /// A blank message becomes "OK". A missing or non-numeric code becomes 0
    /// when the message is "OK" and 1 otherwise.
    pub fn normalize(code: Option<&str>, message: Option<&str>) -> Self {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(Self::OK_MESSAGE)
            .to_string();
        let code = match code.and_then(|c| c.trim().parse::<i64>().ok()) {
            Some(code) => code,
            None if message == Self::OK_MESSAGE => 0,
            None => 1,
        };
        Self { code, message }
    }

    /// An error the tracker signalled, whether or not it said what went wrong.
    ///
    /// Never OK: a missing, non-numeric or zero code becomes 1 and a blank
    /// message becomes [`UNSPECIFIED_MESSAGE`](Self::UNSPECIFIED_MESSAGE).
    pub fn failure(code: Option<&str>, message: Option<&str>) -> Self {
        let code = code
            .and_then(|c| c.trim().parse::<i64>().ok())
            .filter(|c| *c != 0)
            .unwrap_or(1);
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(Self::UNSPECIFIED_MESSAGE)
            .to_string();
        Self { code, message }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl Default for ApiError {
    fn default() -> Self {
        Self::ok()
    }
}

/// A payload that does not have the shape its endpoint promises.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("expected a {expected} payload")]
    UnexpectedRoot { expected: &'static str },

    #[error("{element} is missing {field}")]
    MissingField {
        element: &'static str,
        field: &'static str,
    },

    #[error("{element}.{field}: {reason}")]
    Malformed {
        element: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("cannot decode {element}: {reason}")]
    Decode {
        element: &'static str,
        reason: String,
    },
}

impl PayloadError {
    pub(crate) fn decode(element: &'static str, err: serde_json::Error) -> Self {
        PayloadError::Decode {
            element,
            reason: err.to_string(),
        }
    }
}

/// Why a payload could not be classified.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("schedule lookup failed: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_success_sentinels() {
        assert_eq!(ApiError::normalize(None, None), ApiError::ok());
        assert_eq!(ApiError::normalize(Some("0"), None), ApiError::ok());
        assert_eq!(ApiError::normalize(Some(" 0 "), Some("  ")), ApiError::ok());
        assert!(ApiError::default().is_ok());
    }

    #[test]
    fn normalize_failures() {
        let err = ApiError::normalize(None, Some("No data found for parameter"));
        assert_eq!(err.code, 1);
        assert_eq!(err.message, "No data found for parameter");
        assert!(!err.is_ok());

        let err = ApiError::normalize(Some("101"), Some("Invalid API key"));
        assert_eq!(err.code, 101);
        assert_eq!(err.to_string(), "tracker error 101: Invalid API key");

        let err = ApiError::normalize(Some("E4"), Some("OK"));
        assert_eq!(err.code, 0);
    }

    #[test]
    fn failures_are_never_ok() {
        assert_eq!(
            ApiError::failure(None, None),
            ApiError {
                code: 1,
                message: ApiError::UNSPECIFIED_MESSAGE.into()
            }
        );
        assert_eq!(ApiError::failure(Some("0"), Some("OK")).code, 1);
        assert_eq!(ApiError::failure(Some(" 50 "), Some(" bad route ")).code, 50);
        assert_eq!(ApiError::failure(Some("E4"), None).message, "unspecified tracker error");
        assert!(!ApiError::failure(None, Some("   ")).is_ok());
    }

    #[test]
    fn payload_error_display() {
        let err = PayloadError::MissingField {
            element: "vehicle",
            field: "rt",
        };
        assert_eq!(err.to_string(), "vehicle is missing rt");
        let err = PayloadError::UnexpectedRoot { expected: "ctatt" };
        assert_eq!(err.to_string(), "expected a ctatt payload");
    }
}
