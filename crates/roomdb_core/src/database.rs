//! Booking facade over the record store.
//!
//! Validates field values before they reach the file, wraps each mutation
//! in lock/unlock, and exposes the typed [`Room`] view of records.

use crate::config::Config;
use crate::error::{DbError, DbResult};
use crate::format::{default_room_schema, write_empty_file, DEFAULT_MAGIC};
use crate::room::Room;
use crate::store::RecordStore;
use crate::types::{LockCookie, RecordRow};
use crate::validate;
use fs2::FileExt;
use roomdb_storage::{FileBackend, StorageBackend};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::{debug, warn};

/// The booking database: a validated, typed facade over [`RecordStore`].
///
/// Opening a file-backed database takes an advisory lock on a `.lock`
/// sidecar file so two processes cannot share one data file. The lock is
/// released when the database is dropped.
///
/// # Example
///
/// ```no_run
/// use roomdb_core::{Config, Database, Room};
/// use std::path::Path;
///
/// let db = Database::open(Path::new("rooms.db"), Config::default())?;
/// let room = Room::new("Elm", "Reno", "4", "Y", "$99.50", "2024/05/01");
/// let row = db.create_room(&room)?;
/// db.book_room(row, "12345678")?;
/// # Ok::<(), roomdb_core::DbError>(())
/// ```
pub struct Database {
    store: RecordStore,
    /// Held for the lifetime of the database; dropping releases the lock.
    _lock_file: Option<File>,
}

impl Database {
    /// Opens the database at `path`.
    ///
    /// A missing file is fatal unless `config.create_if_missing` is set,
    /// in which case a fresh file with the standard room schema is
    /// written first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the file cannot be opened or created,
    /// another process holds the sidecar lock, the header is unusable, or
    /// the file does not carry the seven-field room schema.
    pub fn open(path: &Path, config: Config) -> DbResult<Self> {
        if !path.exists() && !config.create_if_missing {
            return Err(DbError::unavailable(format!(
                "data file does not exist: {}",
                path.display()
            )));
        }

        let lock_file = Self::acquire_process_lock(path)?;

        let backend = if path.exists() {
            FileBackend::open_existing(path).map_err(|e| {
                DbError::unavailable(format!("unable to open {}: {e}", path.display()))
            })?
        } else {
            let mut backend = FileBackend::open(path).map_err(|e| {
                DbError::unavailable(format!("unable to create {}: {e}", path.display()))
            })?;
            let magic = config.expected_magic.unwrap_or(DEFAULT_MAGIC);
            write_empty_file(&mut backend, magic, &default_room_schema())?;
            backend
        };

        let mut db = Self::with_backend(Box::new(backend), config)?;
        db._lock_file = Some(lock_file);
        Ok(db)
    }

    /// Builds a database over an already-open backend.
    ///
    /// No process lock is taken; intended for tests and in-memory use.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be built or the file
    /// does not carry the seven-field room schema.
    pub fn with_backend(backend: Box<dyn StorageBackend>, config: Config) -> DbResult<Self> {
        let store = RecordStore::new(backend, config)?;

        if store.schema().field_count() != Room::FIELD_COUNT {
            return Err(DbError::unavailable(format!(
                "data file has {} fields per record, the room schema has {}",
                store.schema().field_count(),
                Room::FIELD_COUNT
            )));
        }

        Ok(Self {
            store,
            _lock_file: None,
        })
    }

    /// Takes the exclusive advisory lock on the `.lock` sidecar file.
    fn acquire_process_lock(path: &Path) -> DbResult<File> {
        let mut lock_path = OsString::from(path.as_os_str());
        lock_path.push(".lock");

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| DbError::unavailable(format!("unable to open lock file: {e}")))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(DbError::unavailable(format!(
                "another process has {} open",
                path.display()
            )));
        }

        Ok(lock_file)
    }

    /// Returns the underlying record store.
    ///
    /// Callers needing to hold a lock across their own check-then-update
    /// sequence use the store's `lock`/`unlock` directly.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Validates and creates a new room record.
    ///
    /// # Errors
    ///
    /// - `InvalidField` if any field violates its domain rule
    /// - `DuplicateKey` if an active record carries the same business key
    pub fn create_room(&self, room: &Room) -> DbResult<RecordRow> {
        validate::validate_room(room)?;
        self.store.create(&room.to_fields())
    }

    /// Reads the room record at `row`.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the row is absent or deleted.
    pub fn read_room(&self, row: RecordRow) -> DbResult<Room> {
        let fields = self.store.read(row)?;
        Room::from_fields(row, &fields)
    }

    /// Validates and overwrites the room record at `row`, handling the
    /// lock/unlock pair around the write.
    ///
    /// # Errors
    ///
    /// - `InvalidField` if any field violates its domain rule
    /// - `RecordNotFound` if the row is absent or deleted
    pub fn update_room(&self, row: RecordRow, room: &Room) -> DbResult<()> {
        validate::validate_room(room)?;

        let cookie = self.store.lock(row)?;
        let result = self.store.update(row, &room.to_fields(), cookie);
        let unlocked = self.store.unlock(row, cookie);
        result?;
        unlocked
    }

    /// Deletes the room record at `row`, handling the lock/unlock pair.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the row is absent or already deleted.
    pub fn delete_room(&self, row: RecordRow) -> DbResult<()> {
        let cookie = self.store.lock(row)?;
        let result = self.store.delete(row, cookie);
        let unlocked = self.store.unlock(row, cookie);
        result?;
        unlocked
    }

    /// Books the room at `row` for the customer with id `owner`.
    ///
    /// Holds the record lock across a fresh read and the owner update, so
    /// a booking that raced another caller's booking is rejected rather
    /// than silently overwritten.
    ///
    /// # Errors
    ///
    /// - `InvalidField` if `owner` is not a valid customer id
    /// - `RecordNotFound` if the row is absent, deleted, or already booked
    pub fn book_room(&self, row: RecordRow, owner: &str) -> DbResult<()> {
        if owner.trim().is_empty() {
            return Err(DbError::invalid_field(
                "owner",
                "booking requires a customer id",
            ));
        }
        validate::validate_owner(owner)?;

        let cookie = self.store.lock(row)?;
        let result = self.book_locked(row, owner, cookie);
        let unlocked = self.store.unlock(row, cookie);
        result?;
        unlocked
    }

    /// The booking body, run while holding the row's lock.
    fn book_locked(&self, row: RecordRow, owner: &str, cookie: LockCookie) -> DbResult<()> {
        let mut room = self.read_room(row)?;

        if room.is_booked() {
            debug!(%row, "booking rejected, room already has an owner");
            return Err(DbError::record_not_found(row));
        }

        room.owner = owner.to_string();
        self.store.update(row, &room.to_fields(), cookie)
    }

    /// Returns every room whose name and location exactly match the given
    /// values; a `None` value matches anything.
    ///
    /// Rows that disappear between the search and the read are skipped.
    #[must_use]
    pub fn find_rooms(&self, name: Option<&str>, location: Option<&str>) -> Vec<Room> {
        let mut criteria: Vec<Option<String>> = vec![None; Room::FIELD_COUNT];
        criteria[Room::NAME_FIELD] = name.map(str::to_string);
        criteria[Room::LOCATION_FIELD] = location.map(str::to_string);

        self.read_found(self.store.find(Some(&criteria)))
    }

    /// Returns every active room record.
    #[must_use]
    pub fn find_all(&self) -> Vec<Room> {
        self.read_found(self.store.find(None))
    }

    fn read_found(&self, rows: Vec<RecordRow>) -> Vec<Room> {
        rows.into_iter()
            .filter_map(|row| match self.read_room(row) {
                Ok(room) => Some(room),
                Err(e) => {
                    warn!(%row, error = %e, "unable to read found record");
                    None
                }
            })
            .collect()
    }

    /// Locks a room record; see [`RecordStore::lock`].
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the row does not name an active record.
    pub fn lock(&self, row: RecordRow) -> DbResult<LockCookie> {
        self.store.lock(row)
    }

    /// Releases a room record lock; see [`RecordStore::unlock`].
    ///
    /// # Errors
    ///
    /// Returns `LockViolation` if `cookie` is not the holder.
    pub fn unlock(&self, row: RecordRow, cookie: LockCookie) -> DbResult<()> {
        self.store.unlock(row, cookie)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomdb_storage::InMemoryBackend;

    fn memory_db() -> Database {
        let mut backend = InMemoryBackend::new();
        write_empty_file(&mut backend, DEFAULT_MAGIC, &default_room_schema()).unwrap();
        Database::with_backend(Box::new(backend), Config::default()).unwrap()
    }

    fn sample_room() -> Room {
        Room::new("Elm", "Reno", "4", "Y", "$99.50", "2024/05/01")
    }

    #[test]
    fn create_and_read_room() {
        let db = memory_db();
        let row = db.create_room(&sample_room()).unwrap();

        let room = db.read_room(row).unwrap();
        assert_eq!(room.name, "Elm");
        assert_eq!(room.row(), Some(row));
        assert!(!room.is_booked());
    }

    #[test]
    fn create_rejects_invalid_fields_before_io() {
        let db = memory_db();

        let mut bad = sample_room();
        bad.smoking = "maybe".to_string();
        let result = db.create_room(&bad);
        assert!(matches!(result, Err(DbError::InvalidField { .. })));
        assert_eq!(db.store().record_count(), 0);
    }

    #[test]
    fn update_room_round_trip() {
        let db = memory_db();
        let row = db.create_room(&sample_room()).unwrap();

        let mut room = db.read_room(row).unwrap();
        room.rate = "$120.00".to_string();
        db.update_room(row, &room).unwrap();

        assert_eq!(db.read_room(row).unwrap().rate, "$120.00");
        // The facade released the lock; the row can be locked again.
        let cookie = db.lock(row).unwrap();
        db.unlock(row, cookie).unwrap();
    }

    #[test]
    fn delete_room_then_read_fails() {
        let db = memory_db();
        let row = db.create_room(&sample_room()).unwrap();

        db.delete_room(row).unwrap();
        assert!(matches!(
            db.read_room(row),
            Err(DbError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn book_room_sets_owner() {
        let db = memory_db();
        let row = db.create_room(&sample_room()).unwrap();

        db.book_room(row, "12345678").unwrap();
        let room = db.read_room(row).unwrap();
        assert!(room.is_booked());
        assert_eq!(room.owner, "12345678");
    }

    #[test]
    fn book_room_twice_fails() {
        let db = memory_db();
        let row = db.create_room(&sample_room()).unwrap();

        db.book_room(row, "12345678").unwrap();
        let result = db.book_room(row, "87654321");
        assert!(matches!(result, Err(DbError::RecordNotFound { .. })));

        // First booking untouched.
        assert_eq!(db.read_room(row).unwrap().owner, "12345678");
    }

    #[test]
    fn book_room_rejects_bad_owner() {
        let db = memory_db();
        let row = db.create_room(&sample_room()).unwrap();

        assert!(matches!(
            db.book_room(row, ""),
            Err(DbError::InvalidField { .. })
        ));
        assert!(matches!(
            db.book_room(row, "not-a-number"),
            Err(DbError::InvalidField { .. })
        ));
        assert!(!db.read_room(row).unwrap().is_booked());
    }

    #[test]
    fn find_rooms_by_name_and_location() {
        let db = memory_db();
        db.create_room(&sample_room()).unwrap();
        db.create_room(&Room::new("Elm", "Boise", "2", "N", "$80.00", "2024/05/02"))
            .unwrap();
        db.create_room(&Room::new("Oak", "Reno", "2", "N", "$80.00", "2024/05/02"))
            .unwrap();

        assert_eq!(db.find_all().len(), 3);
        assert_eq!(db.find_rooms(Some("Elm"), None).len(), 2);
        assert_eq!(db.find_rooms(None, Some("Reno")).len(), 2);
        assert_eq!(db.find_rooms(Some("Elm"), Some("Reno")).len(), 1);
        assert!(db.find_rooms(Some("elm"), None).is_empty());
    }

    #[test]
    fn open_rejects_foreign_schema() {
        use crate::format::FieldSpec;

        let mut backend = InMemoryBackend::new();
        write_empty_file(
            &mut backend,
            DEFAULT_MAGIC,
            &[FieldSpec::new("key", 8), FieldSpec::new("value", 8)],
        )
        .unwrap();

        let result = Database::with_backend(Box::new(backend), Config::default());
        assert!(matches!(result, Err(DbError::StoreUnavailable { .. })));
    }

    #[test]
    fn open_missing_file_is_fatal_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let result = Database::open(&path, Config::default());
        assert!(matches!(result, Err(DbError::StoreUnavailable { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn open_creates_file_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.db");

        let db = Database::open(&path, Config::default().create_if_missing(true)).unwrap();
        assert!(path.exists());
        assert_eq!(db.store().record_count(), 0);

        let row = db.create_room(&sample_room()).unwrap();
        drop(db);

        // Reopen and find the record again.
        let db = Database::open(&path, Config::default()).unwrap();
        assert_eq!(db.read_room(row).unwrap().name, "Elm");
    }

    #[test]
    fn second_open_of_same_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.db");

        let db = Database::open(&path, Config::default().create_if_missing(true)).unwrap();
        let second = Database::open(&path, Config::default());
        assert!(matches!(second, Err(DbError::StoreUnavailable { .. })));

        drop(db);
        Database::open(&path, Config::default()).unwrap();
    }
}
