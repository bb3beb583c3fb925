//! SQLite implementation of the durable record store

mod record_store;

pub use record_store::*;
