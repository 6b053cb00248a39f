//! Schedule store errors.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schedule store lock poisoned")]
    Poisoned,

    /// A row could not be turned into a domain value
    #[error("malformed {table} row: {reason}")]
    Malformed { table: &'static str, reason: String },
}

impl StoreError {
    pub(crate) fn malformed(table: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Malformed {
            table,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn error_display() {
        let err = StoreError::Poisoned;
        assert_eq!(err.to_string(), "schedule store lock poisoned");

        let err = StoreError::malformed("trips", DomainError::MissingRun("T9".into()));
        assert_eq!(
            err.to_string(),
            "malformed trips row: rail trip T9 has no run number"
        );
    }
}
