//! Core type definitions for RoomDB.

use std::fmt;

/// Identifies a record by the byte offset of its slot in the data file.
///
/// Row numbers are assigned when a slot is first scanned or created and
/// never change; a deleted row's number may be handed out again when its
/// slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordRow(pub u64);

impl RecordRow {
    /// Creates a new record row from a slot offset.
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Returns the raw slot offset.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row:{}", self.0)
    }
}

/// Opaque token proving ownership of a record lock.
///
/// Returned by `lock` and required by `update`, `delete`, and `unlock`.
/// Cookies are never reused within the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockCookie(pub u64);

impl LockCookie {
    /// Creates a lock cookie from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw cookie value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cookie:{}", self.0)
    }
}
