//! Error types for RoomDB core.

use crate::types::{LockCookie, RecordRow};
use thiserror::Error;

/// Result type for core operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in RoomDB core operations.
///
/// These are the caller-facing error kinds; the transport layer above the
/// store translates them onto the wire. `RecordNotFound` deliberately covers
/// three conditions - a row that never existed, a deleted row, and an I/O
/// failure while accessing a row - matching the historical behavior of the
/// file format's first implementation.
#[derive(Debug, Error)]
pub enum DbError {
    /// The row does not exist, is deleted, or could not be read or written.
    #[error("record not found: {row}")]
    RecordNotFound {
        /// The row that was requested.
        row: RecordRow,
    },

    /// The presented cookie does not own the lock on the row.
    #[error("{cookie} does not own the lock on {row}")]
    LockViolation {
        /// The row whose lock was checked.
        row: RecordRow,
        /// The cookie that was presented.
        cookie: LockCookie,
    },

    /// A record with the same business key already exists.
    ///
    /// The business key is every field except the trailing owner field.
    #[error("a record with the same business key already exists at {row}")]
    DuplicateKey {
        /// The existing record that collided.
        row: RecordRow,
    },

    /// A field value failed domain validation.
    #[error("invalid {field} value: {message}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// Description of the violation.
        message: String,
    },

    /// The store could not be opened or its format is unusable.
    ///
    /// This is fatal: no store handle exists after this error.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the failure.
        message: String,
    },
}

impl DbError {
    /// Creates a record-not-found error.
    #[must_use]
    pub fn record_not_found(row: RecordRow) -> Self {
        Self::RecordNotFound { row }
    }

    /// Creates a lock-violation error.
    #[must_use]
    pub fn lock_violation(row: RecordRow, cookie: LockCookie) -> Self {
        Self::LockViolation { row, cookie }
    }

    /// Creates a duplicate-key error for the colliding row.
    #[must_use]
    pub fn duplicate_key(row: RecordRow) -> Self {
        Self::DuplicateKey { row }
    }

    /// Creates an invalid-field error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a store-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let e = DbError::record_not_found(RecordRow::new(74));
        assert_eq!(e.to_string(), "record not found: row:74");

        let e = DbError::lock_violation(RecordRow::new(74), LockCookie::new(9));
        assert_eq!(e.to_string(), "cookie:9 does not own the lock on row:74");

        let e = DbError::invalid_field("rate", "missing currency prefix");
        assert_eq!(e.to_string(), "invalid rate value: missing currency prefix");
    }
}
