//! Domain error types.
//!
//! These errors represent malformed schedule or tracker values caught while
//! building domain types. They are distinct from API/IO errors.

use super::stop::InvalidStopId;
use super::time::TimeError;

/// Domain-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A trip on a rail line has no usable run number
    #[error("rail trip {0} has no run number")]
    MissingRun(String),

    #[error("invalid run number: {0:?}")]
    InvalidRun(String),

    #[error(transparent)]
    InvalidStopId(#[from] InvalidStopId),

    #[error(transparent)]
    Time(#[from] TimeError),
}
