//! Inspect command implementation.

use roomdb_core::format::{Schema, DELETED_FLAG};
use roomdb_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::path::Path;

/// Data file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data file path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Magic number from the header.
    pub magic: u32,
    /// Record payload length in bytes.
    pub payload_length: usize,
    /// On-disk slot length (payload plus delete flag).
    pub slot_length: usize,
    /// Number of fields per record.
    pub field_count: usize,
    /// Offset of the first record slot.
    pub first_slot_offset: u64,
    /// Total number of slots in the data section.
    pub slot_count: usize,
    /// Number of active records.
    pub active_count: usize,
    /// Number of tombstoned slots.
    pub deleted_count: usize,
    /// Number of slots whose delete flag could not be read.
    pub unreadable_count: usize,
    /// Field schema (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldInfo>>,
}

/// One schema field.
#[derive(Debug, Serialize)]
pub struct FieldInfo {
    /// 0-based position within the record.
    pub position: usize,
    /// Field name.
    pub name: String,
    /// Declared value width in bytes.
    pub value_length: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_schema: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let backend = FileBackend::open_existing(path)?;
    let file_size = backend.len()?;
    let schema = Schema::read(&backend)?;

    let mut active_count = 0;
    let mut deleted_count = 0;
    let mut unreadable_count = 0;

    let offsets = schema.slot_offsets(file_size);
    for row in &offsets {
        match backend.read_at(row.as_u64(), 1) {
            Ok(flag) if flag[0] == DELETED_FLAG => deleted_count += 1,
            Ok(_) => active_count += 1,
            Err(_) => unreadable_count += 1,
        }
    }

    let fields = show_schema.then(|| {
        schema
            .fields()
            .iter()
            .map(|f| FieldInfo {
                position: f.position(),
                name: f.name().to_string(),
                value_length: f.value_length(),
            })
            .collect()
    });

    let result = InspectResult {
        path: path.display().to_string(),
        file_size,
        magic: schema.magic(),
        payload_length: schema.payload_length(),
        slot_length: schema.slot_length(),
        field_count: schema.field_count(),
        first_slot_offset: schema.first_slot_offset(),
        slot_count: offsets.len(),
        active_count,
        deleted_count,
        unreadable_count,
        fields,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("RoomDB Data File Inspection");
    println!("===========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Header:");
    println!("  Magic number:   {:#06x}", result.magic);
    println!("  Payload length: {} bytes", result.payload_length);
    println!("  Slot length:    {} bytes", result.slot_length);
    println!("  Fields:         {}", result.field_count);
    println!();
    println!("Data section:");
    println!("  File size:      {} bytes", result.file_size);
    println!("  First slot at:  {}", result.first_slot_offset);
    println!("  Slots:          {}", result.slot_count);
    println!("  Active:         {}", result.active_count);
    println!("  Deleted:        {}", result.deleted_count);
    if result.unreadable_count > 0 {
        println!("  Unreadable:     {}", result.unreadable_count);
    }

    if let Some(fields) = &result.fields {
        println!();
        println!("Schema:");
        for field in fields {
            println!(
                "  [{}] {} ({} bytes)",
                field.position, field.name, field.value_length
            );
        }
    }
}
