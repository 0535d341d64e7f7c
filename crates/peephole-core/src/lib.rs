//! Core types and traits for Peephole.
//!
//! This crate provides the identifiers, records and store contract shared by
//! the storage backends, the tracking services and the HTTP gateway.

pub mod clock;
pub mod error;
pub mod id;
pub mod record;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StorageError};
pub use id::{LinkId, TrackingId};
pub use record::{LinkRecord, Record, TrackingRecord, Visit, UNKNOWN_USER_AGENT};
pub use store::{Applied, RecordStore};
