//! The record store: cache, free-slot pool, and CRUD over one data file.

use crate::config::Config;
use crate::error::{DbError, DbResult};
use crate::format::{Schema, DELETED_FLAG};
use crate::lock::LockManager;
use crate::types::{LockCookie, RecordRow};
use parking_lot::RwLock;
use roomdb_storage::StorageBackend;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

/// Mutable store state, guarded by the coarse reader/writer lock.
struct StoreState {
    /// The open data file.
    backend: Box<dyn StorageBackend>,
    /// All active records, keyed by row. Iteration order is ascending row
    /// order, which fixes the result order of `find`.
    records: BTreeMap<RecordRow, Vec<String>>,
    /// Offsets of tombstoned slots available for reuse, smallest first.
    free_slots: BTreeSet<RecordRow>,
    /// Offset one past the last slot; where a create appends when the
    /// free-slot pool is empty.
    end_offset: u64,
}

/// An embedded record store over a single self-describing data file.
///
/// The store is constructed once per open file and shared by reference
/// between callers; all state lives in the instance. A coarse
/// reader/writer lock serializes access: `read` and `find` take it shared,
/// mutations take it exclusive. Mutating a record additionally requires
/// holding its advisory lock (see [`RecordStore::lock`]).
///
/// # Example
///
/// ```rust
/// use roomdb_core::{Config, RecordStore};
/// use roomdb_core::format::{default_room_schema, write_empty_file, DEFAULT_MAGIC};
/// use roomdb_storage::InMemoryBackend;
///
/// let mut backend = InMemoryBackend::new();
/// write_empty_file(&mut backend, DEFAULT_MAGIC, &default_room_schema()).unwrap();
///
/// let store = RecordStore::new(Box::new(backend), Config::default()).unwrap();
/// let fields: Vec<String> = ["Elm", "Reno", "4", "Y", "$99.50", "2024/05/01", ""]
///     .iter().map(|s| s.to_string()).collect();
/// let row = store.create(&fields).unwrap();
/// assert_eq!(store.read(row).unwrap(), fields);
/// ```
pub struct RecordStore {
    schema: Schema,
    config: Config,
    locks: LockManager,
    state: RwLock<StoreState>,
}

impl RecordStore {
    /// Builds a store over an already-open backend.
    ///
    /// Reads the schema, cross-checks the data section length, and scans
    /// every slot: tombstoned slots feed the free pool, live slots are
    /// decoded into the record cache. A slot that cannot be read or
    /// decoded is logged and skipped; it joins neither collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the header or schema is unreadable,
    /// the data section is not slot-aligned, or the magic number does not
    /// match `config.expected_magic`.
    pub fn new(backend: Box<dyn StorageBackend>, config: Config) -> DbResult<Self> {
        let file_len = backend
            .len()
            .map_err(|e| DbError::unavailable(format!("unable to stat data file: {e}")))?;

        let schema = Schema::read(backend.as_ref())?;

        if let Some(expected) = config.expected_magic {
            if schema.magic() != expected {
                return Err(DbError::unavailable(format!(
                    "magic number {:#06x} does not match expected {expected:#06x}",
                    schema.magic()
                )));
            }
        }

        schema.validate_data_section(file_len)?;

        let mut records = BTreeMap::new();
        let mut free_slots = BTreeSet::new();

        for row in schema.slot_offsets(file_len) {
            match Self::scan_slot(backend.as_ref(), &schema, row) {
                Ok(Some(values)) => {
                    records.insert(row, values);
                }
                Ok(None) => {
                    free_slots.insert(row);
                }
                Err(reason) => {
                    warn!(%row, %reason, "skipping unreadable slot");
                }
            }
        }

        info!(
            records = records.len(),
            free_slots = free_slots.len(),
            payload_length = schema.payload_length(),
            "record store opened"
        );

        Ok(Self {
            schema,
            config,
            locks: LockManager::new(),
            state: RwLock::new(StoreState {
                backend,
                records,
                free_slots,
                end_offset: file_len,
            }),
        })
    }

    /// Reads one slot during the startup scan.
    ///
    /// `Ok(Some)` is a live record, `Ok(None)` a tombstone, `Err` an
    /// unreadable slot with a description for the log.
    fn scan_slot(
        backend: &dyn StorageBackend,
        schema: &Schema,
        row: RecordRow,
    ) -> Result<Option<Vec<String>>, String> {
        let flag = backend
            .read_at(row.as_u64(), 1)
            .map_err(|e| format!("unable to read delete flag: {e}"))?;

        if flag[0] == DELETED_FLAG {
            return Ok(None);
        }

        let payload = backend
            .read_at(row.as_u64() + 1, schema.payload_length())
            .map_err(|e| format!("unable to read payload: {e}"))?;

        let values = schema
            .decode_payload(&payload)
            .map_err(|e| format!("unable to decode payload: {e}"))?;

        Ok(Some(values))
    }

    /// Returns the schema read from the file header.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of active records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.state.read().records.len()
    }

    /// Returns the number of tombstoned slots awaiting reuse.
    #[must_use]
    pub fn free_slot_count(&self) -> usize {
        self.state.read().free_slots.len()
    }

    /// Reads the field values of an active record.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the row never existed or is deleted.
    pub fn read(&self, row: RecordRow) -> DbResult<Vec<String>> {
        let state = self.state.read();
        state
            .records
            .get(&row)
            .cloned()
            .ok_or_else(|| DbError::record_not_found(row))
    }

    /// Overwrites an active record in place.
    ///
    /// The caller must hold the row's lock; `cookie` proves it.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if the row is deleted, or the write itself fails
    ///   (the historical collapse of I/O failures into this kind)
    /// - `LockViolation` if `cookie` does not hold the row's lock
    /// - `InvalidField` if the values do not fit the schema
    pub fn update(&self, row: RecordRow, values: &[String], cookie: LockCookie) -> DbResult<()> {
        let mut state = self.state.write();

        if state.free_slots.contains(&row) {
            return Err(DbError::record_not_found(row));
        }
        if !self.locks.owns(row, cookie) {
            return Err(DbError::lock_violation(row, cookie));
        }

        let slot = self.schema.encode_record(values)?;
        if let Err(e) = state.backend.write_at(row.as_u64(), &slot) {
            error!(%row, error = %e, "update write failed");
            return Err(DbError::record_not_found(row));
        }

        state.records.insert(row, values.to_vec());
        self.sync_if_configured(&mut state);

        Ok(())
    }

    /// Tombstones a record, releasing its slot for reuse.
    ///
    /// Only the delete-flag byte is written; the payload stays in the file
    /// but is ignored from here on. The row's lock entry survives the
    /// delete and must still be released with the same cookie.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if the row is already deleted, or the flag write
    ///   fails
    /// - `LockViolation` if `cookie` does not hold the row's lock
    pub fn delete(&self, row: RecordRow, cookie: LockCookie) -> DbResult<()> {
        let mut state = self.state.write();

        if state.free_slots.contains(&row) {
            return Err(DbError::record_not_found(row));
        }
        if !self.locks.owns(row, cookie) {
            return Err(DbError::lock_violation(row, cookie));
        }

        if let Err(e) = state.backend.write_at(row.as_u64(), &[DELETED_FLAG]) {
            error!(%row, error = %e, "delete write failed");
            return Err(DbError::record_not_found(row));
        }

        state.records.remove(&row);
        state.free_slots.insert(row);
        self.sync_if_configured(&mut state);

        Ok(())
    }

    /// Creates a new record, reusing the smallest tombstoned slot if one
    /// exists, appending at end-of-file otherwise.
    ///
    /// Fails without writing when an active record already carries the
    /// same business key - every field except the trailing owner field,
    /// compared exactly and case-sensitively.
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` on a business-key collision
    /// - `InvalidField` if the values do not fit the schema
    /// - `RecordNotFound` for the target row if the write itself fails
    pub fn create(&self, values: &[String]) -> DbResult<RecordRow> {
        let mut state = self.state.write();

        if values.len() != self.schema.field_count() {
            return Err(DbError::invalid_field(
                "record",
                format!(
                    "expected {} field values, got {}",
                    self.schema.field_count(),
                    values.len()
                ),
            ));
        }

        if let Some(existing) = Self::find_duplicate(&state.records, values) {
            return Err(DbError::duplicate_key(existing));
        }

        let slot = self.schema.encode_record(values)?;

        let (row, reused) = match state.free_slots.iter().next().copied() {
            Some(free) => (free, true),
            None => (RecordRow::new(state.end_offset), false),
        };

        if let Err(e) = state.backend.write_at(row.as_u64(), &slot) {
            error!(%row, error = %e, "create write failed");
            return Err(DbError::record_not_found(row));
        }

        if reused {
            debug!(%row, "reusing tombstoned slot");
            state.free_slots.remove(&row);
        } else {
            state.end_offset += self.schema.slot_length() as u64;
        }
        state.records.insert(row, values.to_vec());
        self.sync_if_configured(&mut state);

        Ok(row)
    }

    /// Finds an active record whose business key equals the candidate's.
    ///
    /// The business key is every field except the last (owner) one.
    fn find_duplicate(
        records: &BTreeMap<RecordRow, Vec<String>>,
        values: &[String],
    ) -> Option<RecordRow> {
        let key_len = values.len().saturating_sub(1);
        records
            .iter()
            .find(|(_, record)| record[..key_len] == values[..key_len])
            .map(|(row, _)| *row)
    }

    /// Returns the rows of active records matching `criteria`, ascending.
    ///
    /// `None` criteria match everything. Otherwise the slice must have one
    /// element per schema field: a `None` element matches any value, a
    /// `Some` element matches by exact, case-sensitive equality. A slice
    /// of the wrong length matches nothing.
    #[must_use]
    pub fn find(&self, criteria: Option<&[Option<String>]>) -> Vec<RecordRow> {
        let state = self.state.read();

        match criteria {
            None => state.records.keys().copied().collect(),
            Some(c) if c.len() != self.schema.field_count() => Vec::new(),
            Some(c) => state
                .records
                .iter()
                .filter(|(_, record)| {
                    record
                        .iter()
                        .zip(c.iter())
                        .all(|(value, criterion)| match criterion {
                            Some(wanted) => wanted == value,
                            None => true,
                        })
                })
                .map(|(row, _)| *row)
                .collect(),
        }
    }

    /// Locks an active record for exclusive mutation.
    ///
    /// Blocks while another caller holds the row, then verifies the row
    /// still names an active record. There is no timeout.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the row does not name an active record
    /// once the lock becomes available; a deleted record cannot be locked.
    pub fn lock(&self, row: RecordRow) -> DbResult<LockCookie> {
        let cookie = self.locks.acquire(row);

        let exists = self.state.read().records.contains_key(&row);
        if !exists {
            // Hand the grant back so a queued waiter gets its turn.
            let _ = self.locks.release(row, cookie);
            return Err(DbError::record_not_found(row));
        }

        Ok(cookie)
    }

    /// Releases a record lock.
    ///
    /// # Errors
    ///
    /// Returns `LockViolation` if the row is not locked or `cookie` is not
    /// its holder.
    pub fn unlock(&self, row: RecordRow, cookie: LockCookie) -> DbResult<()> {
        self.locks.release(row, cookie)
    }

    /// Syncs the backend after a mutation when so configured.
    ///
    /// A sync failure does not undo the already-completed write; it is
    /// logged and the operation still reports success.
    fn sync_if_configured(&self, state: &mut StoreState) {
        if self.config.sync_on_write {
            if let Err(e) = state.backend.sync() {
                warn!(error = %e, "sync after write failed");
            }
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RecordStore")
            .field("records", &state.records.len())
            .field("free_slots", &state.free_slots.len())
            .field("payload_length", &self.schema.payload_length())
            .finish_non_exhaustive()
    }
}
