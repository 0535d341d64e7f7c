//! Event ingestion services.
//!
//! - [`OpenTracker`] applies beacon hits and always answers with the pixel.
//! - [`ClickTracker`] applies link clicks and decides between a redirect and
//!   a not-found answer.
//! - [`StatsReader`] exposes the read-only, recency-ordered listings.
//!
//! Every service receives its store handle explicitly, so the same code runs
//! against [`peephole_storage::SqliteStore`], the in-memory store, or a test
//! double.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use jiff::Timestamp;
//! use peephole_core::{TrackingId, TrackingRecord, Visit};
//! use peephole_storage::InMemoryStore;
//! use peephole_tracker::{OpenOutcome, OpenTracker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! store.insert(
//!     TrackingRecord::builder()
//!         .tracking_id("abc123")
//!         .recipient_email("a@x.com")
//!         .subject("Hello")
//!         .sent_at(Timestamp::now())
//!         .build(),
//! )?;
//!
//! let tracker = OpenTracker::new(Arc::new(store));
//! let visit = Visit::builder().seen_at(Timestamp::now()).build();
//! let outcome = tracker.record_open(&TrackingId::new("abc123"), &visit).await;
//! assert!(matches!(outcome, OpenOutcome::Recorded { open_count: 1 }));
//! # Ok(())
//! # }
//! ```

pub mod click;
pub mod open;
pub mod pixel;
pub mod stats;

use std::sync::Arc;

use peephole_core::RecordStore;

pub use click::{ClickOutcome, ClickTracker};
pub use open::{OpenOutcome, OpenTracker};
pub use pixel::{PIXEL_CONTENT_TYPE, TRACKING_PIXEL};
pub use stats::{EmailStats, RecipientSummary, StatsReader, StoreCounts};

/// Shared handle to a record store, built once at startup.
pub type SharedStore<R> = Arc<dyn RecordStore<R>>;
