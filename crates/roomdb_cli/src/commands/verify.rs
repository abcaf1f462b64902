//! Verify command implementation.

use roomdb_core::format::{Schema, DELETED_FLAG};
use roomdb_storage::{FileBackend, StorageBackend};
use std::path::Path;

/// Verification result.
#[derive(Debug)]
pub struct VerifyResult {
    /// Number of slots checked.
    pub slots_checked: usize,
    /// Number of decodable active records.
    pub valid_records: usize,
    /// Number of tombstoned slots.
    pub deleted_slots: usize,
    /// List of problems found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn new() -> Self {
        Self {
            slots_checked: 0,
            valid_records: 0,
            deleted_slots: 0,
            errors: Vec::new(),
        }
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command: the same cross-checks the store applies at
/// startup, plus a decode pass over every active slot.
pub fn run(path: &Path, expected_magic: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying data file at {}", path.display());
    println!();

    let backend = FileBackend::open_existing(path)?;
    let file_size = backend.len()?;

    let mut result = VerifyResult::new();

    // Header and schema must parse; without them nothing else is checkable.
    let schema = Schema::read(&backend)?;

    if let Some(expected) = expected_magic {
        if schema.magic() != expected {
            result.errors.push(format!(
                "magic number {:#06x} does not match expected {expected:#06x}",
                schema.magic()
            ));
        }
    }

    if let Err(e) = schema.validate_data_section(file_size) {
        result.errors.push(e.to_string());
    }

    for row in schema.slot_offsets(file_size) {
        result.slots_checked += 1;

        let flag = match backend.read_at(row.as_u64(), 1) {
            Ok(flag) => flag[0],
            Err(e) => {
                result
                    .errors
                    .push(format!("unable to read delete flag at {row}: {e}"));
                continue;
            }
        };

        if flag == DELETED_FLAG {
            result.deleted_slots += 1;
            continue;
        }

        match backend.read_at(row.as_u64() + 1, schema.payload_length()) {
            Ok(payload) => match schema.decode_payload(&payload) {
                Ok(_) => result.valid_records += 1,
                Err(e) => result
                    .errors
                    .push(format!("undecodable payload at {row}: {e}")),
            },
            Err(e) => result
                .errors
                .push(format!("unable to read payload at {row}: {e}")),
        }
    }

    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Data file verification passed");
        Ok(())
    } else {
        println!("✗ Data file verification failed");
        Err("Verification failed".into())
    }
}

fn print_result(result: &VerifyResult) {
    println!(
        "  Slots checked: {}, valid: {}, deleted: {}",
        result.slots_checked, result.valid_records, result.deleted_slots
    );
    for error in &result.errors {
        println!("    ERROR: {error}");
    }
}
