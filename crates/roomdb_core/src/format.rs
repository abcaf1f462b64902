//! Data file format: header, schema, and the slot codec.
//!
//! A data file is self-describing. It starts with a fixed header and a
//! field schema, followed by fixed-size record slots up to end-of-file:
//!
//! ```text
//! [4 bytes]  magic number
//! [4 bytes]  payload length (bytes per record, excluding the delete flag)
//! [2 bytes]  field count N
//! N times:
//!   [2 bytes] field-name length L
//!   [L bytes] field name
//!   [2 bytes] field value length
//! until EOF, each of size (payload length + 1):
//!   [1 byte]  delete flag: 0 = active, 1 = deleted
//!   [payload] field values, each right-padded with spaces
//! ```
//!
//! All integers are big-endian. The schema is immutable once the file is
//! open; slot offsets never change.

use crate::error::{DbError, DbResult};
use crate::types::RecordRow;
use roomdb_storage::{StorageBackend, StorageError};
use thiserror::Error;

/// Magic number written into files created by this crate.
pub const DEFAULT_MAGIC: u32 = 0x0103;

/// Delete-flag value marking a live slot.
pub const ACTIVE_FLAG: u8 = 0;

/// Delete-flag value marking a tombstoned slot.
pub const DELETED_FLAG: u8 = 1;

/// Field values are right-padded with spaces to their declared length.
const PAD_BYTE: u8 = b' ';

/// Describes one field when creating a new data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as written into the schema section.
    pub name: String,
    /// Fixed width of the field's value in bytes.
    pub value_length: usize,
}

impl FieldSpec {
    /// Creates a field spec.
    pub fn new(name: impl Into<String>, value_length: usize) -> Self {
        Self {
            name: name.into(),
            value_length,
        }
    }
}

/// The standard seven-field room schema used by the booking application.
///
/// Payload length 159, slot length 160. The trailing `owner` field holds
/// the booking customer id; empty means unbooked.
#[must_use]
pub fn default_room_schema() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("name", 64),
        FieldSpec::new("location", 64),
        FieldSpec::new("size", 4),
        FieldSpec::new("smoking", 1),
        FieldSpec::new("rate", 8),
        FieldSpec::new("date", 10),
        FieldSpec::new("owner", 8),
    ]
}

/// One field of the schema as read from the file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    name: String,
    value_length: usize,
    position: usize,
}

impl RecordField {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fixed width of the field's value in bytes.
    #[must_use]
    pub fn value_length(&self) -> usize {
        self.value_length
    }

    /// Returns the field's 0-based position within a record.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Errors decoding a single slot's payload.
///
/// These never reach store callers: an undecodable slot is logged and
/// skipped during the startup scan.
#[derive(Debug, Error)]
pub enum SlotDecodeError {
    /// The payload byte range had the wrong length.
    #[error("payload length {actual} does not match schema length {expected}")]
    WrongLength {
        /// Length required by the schema.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A field's bytes were not valid UTF-8.
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 {
        /// Name of the undecodable field.
        field: String,
    },
}

/// The parsed file header: magic number, payload length, and field schema.
///
/// Produced once at startup by [`Schema::read`] and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    magic: u32,
    payload_length: usize,
    fields: Vec<RecordField>,
    first_slot_offset: u64,
}

/// Sequential big-endian reads over a backend, with truncation mapped to a
/// fatal configuration error.
struct HeaderCursor<'a> {
    backend: &'a dyn StorageBackend,
    pos: u64,
}

impl<'a> HeaderCursor<'a> {
    fn new(backend: &'a dyn StorageBackend) -> Self {
        Self { backend, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> DbResult<Vec<u8>> {
        let bytes = self.backend.read_at(self.pos, len).map_err(|e| match e {
            StorageError::ReadPastEnd { .. } => DbError::unavailable(format!(
                "data file truncated in header at offset {}",
                self.pos
            )),
            StorageError::Io(e) => {
                DbError::unavailable(format!("unable to read data file header: {e}"))
            }
        })?;
        self.pos += len as u64;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> DbResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u16(&mut self) -> DbResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

impl Schema {
    /// Reads the header and field schema from the start of a backend.
    ///
    /// Cross-checks that the declared payload length equals the sum of the
    /// field value lengths; a file failing that check would silently
    /// miscompute every slot offset, so it is rejected up front.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the file is truncated before the
    /// schema completes, unreadable, or internally inconsistent. No partial
    /// schema is ever produced.
    pub fn read(backend: &dyn StorageBackend) -> DbResult<Self> {
        let mut cursor = HeaderCursor::new(backend);

        let magic = cursor.read_u32()?;
        let payload_length = cursor.read_u32()? as usize;
        let field_count = cursor.read_u16()? as usize;

        let mut fields = Vec::with_capacity(field_count);
        for position in 0..field_count {
            let name_length = cursor.read_u16()? as usize;
            let name_bytes = cursor.read_bytes(name_length)?;
            let name = String::from_utf8(name_bytes).map_err(|_| {
                DbError::unavailable(format!(
                    "schema field {position} has a non-UTF-8 name"
                ))
            })?;
            let value_length = cursor.read_u16()? as usize;

            fields.push(RecordField {
                name,
                value_length,
                position,
            });
        }

        let declared_sum: usize = fields.iter().map(|f| f.value_length).sum();
        if declared_sum != payload_length {
            return Err(DbError::unavailable(format!(
                "header payload length {payload_length} does not match schema \
                 field lengths totalling {declared_sum}"
            )));
        }

        Ok(Self {
            magic,
            payload_length,
            fields,
            first_slot_offset: cursor.pos,
        })
    }

    /// Returns the magic number read from the header.
    #[must_use]
    pub fn magic(&self) -> u32 {
        self.magic
    }

    /// Returns the record payload length in bytes, excluding the delete flag.
    #[must_use]
    pub fn payload_length(&self) -> usize {
        self.payload_length
    }

    /// Returns the on-disk slot length: payload plus the delete-flag byte.
    #[must_use]
    pub fn slot_length(&self) -> usize {
        self.payload_length + 1
    }

    /// Returns the number of fields per record.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the ordered field schema.
    #[must_use]
    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    /// Returns the offset of the first record slot, just past the schema.
    #[must_use]
    pub fn first_slot_offset(&self) -> u64 {
        self.first_slot_offset
    }

    /// Checks that the data section is an exact multiple of the slot size.
    ///
    /// A remainder means the header's payload length disagrees with the
    /// file contents (or the file is torn); scanning would assign bogus
    /// offsets to every later slot, so this fails fast instead.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` on a length mismatch.
    pub fn validate_data_section(&self, file_len: u64) -> DbResult<()> {
        let data_len = file_len - self.first_slot_offset;
        let slot_len = self.slot_length() as u64;
        if data_len % slot_len != 0 {
            return Err(DbError::unavailable(format!(
                "data section of {data_len} bytes is not a multiple of the \
                 slot size {slot_len}"
            )));
        }
        Ok(())
    }

    /// Enumerates every slot offset from the first data offset to `file_len`.
    #[must_use]
    pub fn slot_offsets(&self, file_len: u64) -> Vec<RecordRow> {
        let slot_len = self.slot_length() as u64;
        let mut offsets = Vec::new();
        let mut offset = self.first_slot_offset;
        while offset + slot_len <= file_len {
            offsets.push(RecordRow::new(offset));
            offset += slot_len;
        }
        offsets
    }

    /// Serializes a record into slot bytes: an active flag byte followed by
    /// each field value right-padded with spaces to its declared length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` if the number of values does not match the
    /// schema, or a value is longer than its field's declared width.
    pub fn encode_record(&self, values: &[String]) -> DbResult<Vec<u8>> {
        if values.len() != self.fields.len() {
            return Err(DbError::invalid_field(
                "record",
                format!(
                    "expected {} field values, got {}",
                    self.fields.len(),
                    values.len()
                ),
            ));
        }

        let mut slot = Vec::with_capacity(self.slot_length());
        slot.push(ACTIVE_FLAG);

        for field in &self.fields {
            let value = values[field.position].as_bytes();
            if value.len() > field.value_length {
                return Err(DbError::invalid_field(
                    field.name.clone(),
                    format!(
                        "value is {} bytes, field width is {}",
                        value.len(),
                        field.value_length
                    ),
                ));
            }
            slot.extend_from_slice(value);
            slot.resize(slot.len() + (field.value_length - value.len()), PAD_BYTE);
        }

        Ok(slot)
    }

    /// Decodes a slot payload (the bytes after the delete flag) into field
    /// values, trimming the space padding.
    ///
    /// # Errors
    ///
    /// Returns a [`SlotDecodeError`] on a wrong-length payload or a field
    /// that is not valid UTF-8.
    pub fn decode_payload(&self, payload: &[u8]) -> Result<Vec<String>, SlotDecodeError> {
        if payload.len() != self.payload_length {
            return Err(SlotDecodeError::WrongLength {
                expected: self.payload_length,
                actual: payload.len(),
            });
        }

        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for field in &self.fields {
            let raw = &payload[offset..offset + field.value_length];
            let value = std::str::from_utf8(raw).map_err(|_| SlotDecodeError::InvalidUtf8 {
                field: field.name.clone(),
            })?;
            values.push(value.trim().to_string());
            offset += field.value_length;
        }

        Ok(values)
    }
}

/// Writes the header and schema of a fresh, empty data file.
///
/// The backend is expected to be empty; existing bytes are overwritten from
/// offset zero. No record slots are written.
///
/// # Errors
///
/// Returns `StoreUnavailable` if the header cannot be written.
pub fn write_empty_file(
    backend: &mut dyn StorageBackend,
    magic: u32,
    fields: &[FieldSpec],
) -> DbResult<()> {
    let payload_length: usize = fields.iter().map(|f| f.value_length).sum();

    let mut header = Vec::new();
    header.extend_from_slice(&magic.to_be_bytes());
    header.extend_from_slice(&(payload_length as u32).to_be_bytes());
    header.extend_from_slice(&(fields.len() as u16).to_be_bytes());

    for field in fields {
        header.extend_from_slice(&(field.name.len() as u16).to_be_bytes());
        header.extend_from_slice(field.name.as_bytes());
        header.extend_from_slice(&(field.value_length as u16).to_be_bytes());
    }

    backend
        .write_at(0, &header)
        .map_err(|e| DbError::unavailable(format!("unable to write data file header: {e}")))?;
    backend
        .sync()
        .map_err(|e| DbError::unavailable(format!("unable to sync data file header: {e}")))?;

    Ok(())
}
