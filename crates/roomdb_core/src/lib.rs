//! # RoomDB Core
//!
//! An embedded, single-file record store with per-record pessimistic
//! locking, built as the storage core of a hotel-room booking system.
//!
//! This crate provides:
//! - A self-describing binary data file format ([`format`])
//! - A record store with an in-memory cache and free-slot reuse ([`store`])
//! - Advisory per-record locking with blocking, FIFO acquisition ([`lock`])
//! - A validating booking facade with typed records ([`database`])
//!
//! ## Concurrency model
//!
//! A single reader/writer lock guards the cache and the file handle:
//! reads and searches run shared, mutations run exclusive. Mutating a
//! record additionally requires its advisory lock, acquired with
//! [`RecordStore::lock`] and proven by an opaque cookie. A caller blocked
//! waiting for a record lock holds nothing else, so it cannot stall
//! unrelated operations.
//!
//! ## Example
//!
//! ```no_run
//! use roomdb_core::{Config, Database, Room};
//! use std::path::Path;
//!
//! let db = Database::open(Path::new("rooms.db"), Config::default())?;
//!
//! let room = Room::new("Elm", "Reno", "4", "Y", "$99.50", "2024/05/01");
//! let row = db.create_room(&room)?;
//! db.book_room(row, "12345678")?;
//! # Ok::<(), roomdb_core::DbError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod database;
pub mod error;
pub mod format;
pub mod lock;
pub mod room;
pub mod store;
pub mod types;
pub mod validate;

pub use config::Config;
pub use database::Database;
pub use error::{DbError, DbResult};
pub use lock::LockManager;
pub use room::Room;
pub use store::RecordStore;
pub use types::{LockCookie, RecordRow};

/// Version of the roomdb_core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
