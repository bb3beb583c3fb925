//! In-memory record store for development and testing
//!
//! Honors the same contract as the SQLite store, including write-ordered
//! retainer scans. Writes can be switched to fail to exercise the cache's
//! durable-write failure path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{ContentId, Player, Retainer, RetainerId};
use crate::infra::{RecordStore, Result, RetainerTrackError};

#[derive(Default)]
struct Collections {
    retainers: HashMap<RetainerId, (u64, Retainer)>,
    players: HashMap<ContentId, Player>,
}

/// In-memory [`RecordStore`]
///
/// DO NOT USE IN PRODUCTION - nothing survives the process.
#[derive(Default)]
pub struct InMemoryRecordStore {
    collections: RwLock<Collections>,
    revision: AtomicU64,
    fail_writes: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated collections (for testing)
    pub fn with_records(retainers: Vec<Retainer>, players: Vec<Player>) -> Self {
        let store = Self::new();
        {
            let mut collections = store
                .collections
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for retainer in retainers {
                let revision = store.revision.fetch_add(1, Ordering::SeqCst) + 1;
                collections
                    .retainers
                    .insert(retainer.id, (revision, retainer));
            }
            for player in players {
                collections.players.insert(player.id, player);
            }
        }
        store
    }

    /// Make every subsequent upsert fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn retainer_count(&self) -> usize {
        self.collections
            .read()
            .map(|c| c.retainers.len())
            .unwrap_or(0)
    }

    pub fn player_count(&self) -> usize {
        self.collections.read().map(|c| c.players.len()).unwrap_or(0)
    }

    pub fn retainer(&self, id: RetainerId) -> Option<Retainer> {
        self.collections
            .read()
            .ok()
            .and_then(|c| c.retainers.get(&id).map(|(_, r)| r.clone()))
    }

    pub fn player(&self, id: ContentId) -> Option<Player> {
        self.collections
            .read()
            .ok()
            .and_then(|c| c.players.get(&id).cloned())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RetainerTrackError::Internal(
                "record store rejected the write".to_string(),
            ));
        }
        Ok(())
    }
}

fn poisoned() -> RetainerTrackError {
    RetainerTrackError::Internal("record store lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert_retainers(&self, retainers: &[Retainer]) -> Result<()> {
        self.check_writable()?;

        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        for retainer in retainers {
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            collections
                .retainers
                .insert(retainer.id, (revision, retainer.clone()));
        }
        Ok(())
    }

    async fn upsert_players(&self, players: &[Player]) -> Result<()> {
        self.check_writable()?;

        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        for player in players {
            collections.players.insert(player.id, player.clone());
        }
        Ok(())
    }

    async fn load_retainers(&self) -> Result<Vec<Retainer>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let mut ordered: Vec<&(u64, Retainer)> = collections.retainers.values().collect();
        ordered.sort_by_key(|(revision, _)| *revision);
        Ok(ordered.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn load_players(&self) -> Result<Vec<Player>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let mut players: Vec<Player> = collections.players.values().cloned().collect();
        players.sort_by_key(|p| p.id);
        Ok(players)
    }
}
