//! Trait definitions for the durable record store

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{Player, Retainer};

use super::Result;

/// Durable store holding the retainer and player collections.
///
/// Invariant: at most one record per primary key; an upsert with an existing
/// key overwrites it. Nothing is ever deleted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Upsert a batch of retainers keyed by retainer id
    ///
    /// The batch is applied as a unit; on error the caller must assume none
    /// of it is visible.
    async fn upsert_retainers(&self, retainers: &[Retainer]) -> Result<()>;

    /// Upsert a batch of players keyed by content id
    async fn upsert_players(&self, players: &[Player]) -> Result<()>;

    /// Full scan of the retainer collection
    ///
    /// Records come back in the order they were last written, oldest first,
    /// so replaying them reproduces last-write-wins on shared names.
    async fn load_retainers(&self) -> Result<Vec<Retainer>>;

    /// Full scan of the player collection
    async fn load_players(&self) -> Result<Vec<Player>>;
}
