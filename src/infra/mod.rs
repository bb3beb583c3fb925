//! Infrastructure layer for RetainerTrack
//!
//! Contains trait definitions and implementations for:
//! - Record storage (SQLite, in-memory)
//! - Resolution cache (derived in-memory indexes)
//! - Fire-and-forget ingestion (in-flight tracking, drain)

mod cache;
mod error;
mod ingest;
mod memory;
pub mod sqlite;
mod traits;

pub use cache::{CacheStats, IngestOutcome, ResolutionCache};
pub use error::*;
pub use ingest::{apply_fact, InFlightGuard, InFlightTracker, Ingestor};
pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;
pub use traits::*;
