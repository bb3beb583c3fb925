//! Domain models for RetainerTrack
//!
//! Identifiers, the two durable record types, and the facts collaborators
//! feed into the resolution cache.

mod fact;
mod records;
mod types;

pub use fact::*;
pub use records::*;
pub use types::*;
