//! Dump command implementation.

use roomdb_core::format::{Schema, DELETED_FLAG};
use roomdb_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::path::Path;

/// One dumped slot.
#[derive(Debug, Serialize)]
pub struct DumpedRecord {
    /// Slot offset (the record's row number).
    pub row: u64,
    /// Whether the slot is tombstoned.
    pub deleted: bool,
    /// Decoded field values, or `None` if the payload is undecodable.
    pub values: Option<Vec<String>>,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    include_deleted: bool,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = FileBackend::open_existing(path)?;
    let file_size = backend.len()?;
    let schema = Schema::read(&backend)?;

    let mut records = Vec::new();
    let limit = limit.unwrap_or(usize::MAX);

    for row in schema.slot_offsets(file_size) {
        if records.len() >= limit {
            break;
        }

        let flag = backend.read_at(row.as_u64(), 1)?[0];
        let deleted = flag == DELETED_FLAG;
        if deleted && !include_deleted {
            continue;
        }

        let payload = backend.read_at(row.as_u64() + 1, schema.payload_length())?;
        let values = schema.decode_payload(&payload).ok();

        records.push(DumpedRecord {
            row: row.as_u64(),
            deleted,
            values,
        });
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => print_text_output(&schema, &records),
    }

    Ok(())
}

fn print_text_output(schema: &Schema, records: &[DumpedRecord]) {
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
    println!("row | flag | {}", names.join(" | "));

    for record in records {
        let flag = if record.deleted { "DEL" } else { "   " };
        match &record.values {
            Some(values) => println!("{} | {} | {}", record.row, flag, values.join(" | ")),
            None => println!("{} | {} | <undecodable payload>", record.row, flag),
        }
    }

    println!();
    println!("{} slot(s) dumped", records.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomdb_core::format::{default_room_schema, write_empty_file, DEFAULT_MAGIC};
    use roomdb_core::{Config, Database, Room};
    use tempfile::tempdir;

    fn seeded_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("rooms.db");
        let mut backend = FileBackend::open(&path).unwrap();
        write_empty_file(&mut backend, DEFAULT_MAGIC, &default_room_schema()).unwrap();
        drop(backend);

        let db = Database::open(&path, Config::default()).unwrap();
        let keep = db
            .create_room(&Room::new("Elm", "Reno", "4", "Y", "$99.50", "2024/05/01"))
            .unwrap();
        let gone = db
            .create_room(&Room::new("Oak", "Boise", "2", "N", "$80.00", "2024/05/02"))
            .unwrap();
        db.delete_room(gone).unwrap();
        db.book_room(keep, "12345678").unwrap();
        drop(db);

        path
    }

    #[test]
    fn dump_text_and_json() {
        let dir = tempdir().unwrap();
        let path = seeded_file(&dir);

        run(&path, false, None, "text").unwrap();
        run(&path, true, None, "json").unwrap();
        run(&path, true, Some(1), "text").unwrap();
    }
}
