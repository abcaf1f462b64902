//! Init command implementation.

use roomdb_core::format::{default_room_schema, write_empty_file, DEFAULT_MAGIC};
use roomdb_storage::FileBackend;
use std::path::Path;
use tracing::info;

/// Runs the init command: writes a fresh data file carrying the standard
/// seven-field room schema and no records.
pub fn run(path: &Path, magic: Option<u32>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    if path.exists() {
        // Start from a clean file rather than overwriting the header in place.
        std::fs::remove_file(path)?;
    }

    let magic = magic.unwrap_or(DEFAULT_MAGIC);
    let fields = default_room_schema();

    let mut backend = FileBackend::open(path)?;
    write_empty_file(&mut backend, magic, &fields)?;

    info!(path = %path.display(), magic = format!("{magic:#06x}"), "data file created");
    println!("Created {} with {} fields", path.display(), fields.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_readable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rooms.db");

        run(&path, None, false).unwrap();
        assert!(path.exists());

        let backend = FileBackend::open_existing(&path).unwrap();
        let schema = roomdb_core::format::Schema::read(&backend).unwrap();
        assert_eq!(schema.magic(), DEFAULT_MAGIC);
        assert_eq!(schema.field_count(), 7);
        assert_eq!(schema.slot_length(), 160);
    }

    #[test]
    fn init_refuses_existing_file_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rooms.db");

        run(&path, None, false).unwrap();
        assert!(run(&path, None, false).is_err());
        assert!(run(&path, None, true).is_ok());
    }

    #[test]
    fn init_honors_custom_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rooms.db");

        run(&path, Some(0x0202), false).unwrap();

        let backend = FileBackend::open_existing(&path).unwrap();
        let schema = roomdb_core::format::Schema::read(&backend).unwrap();
        assert_eq!(schema.magic(), 0x0202);
    }
}
