//! RetainerTrack Library
//!
//! Identity resolution cache that tracks which player account owns each
//! retainer observed on a game world, and which name belongs to each player
//! account. Facts arrive out of order from packets, roster snapshots and
//! marketplace pages; they are persisted to SQLite and folded into in-memory
//! indexes that answer "who owns retainer X on world W" without I/O.
//!
//! ## Modules
//!
//! - [`domain`] - Identifiers, durable records and ingestible facts
//! - [`codec`] - Binary decoders for identity-carrying packets
//! - [`infra`] - Record stores, the resolution cache and the ingestor
//! - [`dispatch`] - Routing of inbound packets to the ingestor
//! - [`query`] - World-aware lookup and display annotation
//! - [`config`] - Environment configuration
//! - [`service`] - Process bootstrap and shutdown
//! - [`telemetry`] - Logging setup

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod infra;
pub mod migrations;
pub mod query;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use codec::{decode_content_id_mapping, DecodeError, CONTENT_ID_MAPPING_SIZE};
pub use config::Config;
pub use dispatch::{Dispatch, OpcodeTable, PacketDispatcher};
pub use domain::{
    ContentId, ContentIdMapping, Fact, ListingEntry, Player, Retainer, RetainerId, WorldId,
};
pub use infra::{
    IngestOutcome, Ingestor, RecordStore, ResolutionCache, Result, RetainerTrackError,
    SqliteRecordStore,
};
pub use query::{annotate_retainer_name, RetainerNameResolver, WorldContext};
pub use service::RetainerTrack;
