//! Record store backends.
//!
//! - [`InMemoryStore`] keeps records in a sharded concurrent map, suitable for
//!   tests and single-process deployments without persistence.
//! - [`SqliteStore`] persists records in SQLite through an `sqlx` pool.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use peephole_core::{Applied, RecordStore, Result, StorageError};
pub use sqlite::{connect, SqliteRecord, SqliteStore};
