//! Resolution cache
//!
//! Write-through cache over a [`RecordStore`] holding two derived indexes:
//! - (world, retainer name) -> owner content id
//! - content id -> player name
//!
//! Both indexes are rebuilt from the store on construction and updated only
//! after a batch has been durably written. Lookups never touch the store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, info, instrument, trace};

use crate::domain::{ContentId, ContentIdMapping, ListingEntry, Player, Retainer, WorldId};
use crate::infra::{RecordStore, Result};

// ============================================================================
// Statistics
// ============================================================================

/// Lookup statistics
#[derive(Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Result of applying one ingestion batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// This many records were written and indexed
    Applied(usize),
    /// Nothing in the batch survived filtering; the store was not called
    Skipped,
    /// The durable write failed; neither store nor index changed for this call
    Failed,
}

impl IngestOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, IngestOutcome::Applied(_))
    }
}

// ============================================================================
// Resolution Cache
// ============================================================================

/// Identity resolution cache
pub struct ResolutionCache {
    /// Durable record store
    store: Arc<dyn RecordStore>,
    /// Retainer name -> owner, per world
    world_retainers: DashMap<WorldId, DashMap<String, ContentId>>,
    /// Content id -> player name
    player_names: DashMap<ContentId, String>,
    /// Lookup statistics
    stats: CacheStats,
}

impl ResolutionCache {
    /// Build the cache, rebuilding both indexes from a full scan of the store
    ///
    /// Any scan error aborts construction; a partially rebuilt cache is never
    /// handed out.
    pub async fn new(store: Arc<dyn RecordStore>) -> Result<Self> {
        let cache = Self {
            store,
            world_retainers: DashMap::new(),
            player_names: DashMap::new(),
            stats: CacheStats::default(),
        };

        let retainers = cache.store.load_retainers().await?;
        let players = cache.store.load_players().await?;

        for retainer in &retainers {
            if let Some(name) = &retainer.name {
                cache.index_retainer(retainer.world_id, name.clone(), retainer.owner_content_id);
            }
        }

        for player in players {
            cache.player_names.insert(player.id, player.name);
        }

        info!(
            retainers = retainers.len(),
            worlds = cache.world_retainers.len(),
            players = cache.player_names.len(),
            "Resolution cache rebuilt from store"
        );

        Ok(cache)
    }

    /// Store backing this cache
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Resolve the owning player's name for a retainer name on `world_id`
    ///
    /// Pure in-memory read; `None` when either hop is unknown.
    pub fn resolve(&self, world_id: WorldId, retainer_name: &str) -> Option<String> {
        let player_name = self
            .owner_of(world_id, retainer_name)
            .and_then(|owner| self.player_name(owner));

        if player_name.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }

        player_name
    }

    /// Owner content id indexed for a retainer name on `world_id`
    pub fn owner_of(&self, world_id: WorldId, retainer_name: &str) -> Option<ContentId> {
        let names = self.world_retainers.get(&world_id)?;
        let owner = names.get(retainer_name)?;
        Some(*owner)
    }

    /// Known name for a content id
    pub fn player_name(&self, content_id: ContentId) -> Option<String> {
        self.player_names
            .get(&content_id)
            .map(|name| name.value().clone())
    }

    /// Apply a marketplace listing page observed on `world_id`
    ///
    /// The first entry per retainer id wins within a page; entries with a
    /// zero retainer or owner id are dropped. The surviving records are
    /// written as one batch and only indexed once that write succeeded.
    #[instrument(skip_all, fields(world_id = %world_id, entries = entries.len()))]
    pub async fn ingest_ownership(
        &self,
        world_id: WorldId,
        entries: &[ListingEntry],
    ) -> IngestOutcome {
        let mut seen = HashSet::new();
        let updates: Vec<Retainer> = entries
            .iter()
            .filter(|entry| seen.insert(entry.retainer_id))
            .filter(|entry| !entry.is_sentinel())
            .map(|entry| entry.to_retainer(world_id))
            .collect();

        if updates.is_empty() {
            return IngestOutcome::Skipped;
        }

        if let Err(e) = self.store.upsert_retainers(&updates).await {
            error!(error = %e, "Could not persist retainer info from market board page");
            return IngestOutcome::Failed;
        }

        for retainer in &updates {
            trace!(
                retainer = retainer.name.as_deref().unwrap_or("<unnamed>"),
                owner = %self.describe_owner(retainer.owner_content_id),
                "Retainer belongs to owner"
            );

            if let Some(name) = &retainer.name {
                self.index_retainer(retainer.world_id, name.clone(), retainer.owner_content_id);
            }
        }

        IngestOutcome::Applied(updates.len())
    }

    /// Apply a single content id mapping
    pub async fn ingest_mapping(&self, mapping: &ContentIdMapping) -> IngestOutcome {
        self.ingest_identity(std::slice::from_ref(mapping)).await
    }

    /// Apply a batch of content id mappings
    ///
    /// Mappings with a zero content id or an empty name are dropped; the rest
    /// are written as one batch and indexed once that write succeeded.
    #[instrument(skip_all, fields(mappings = mappings.len()))]
    pub async fn ingest_identity(&self, mappings: &[ContentIdMapping]) -> IngestOutcome {
        let updates: Vec<Player> = mappings
            .iter()
            .filter(|mapping| mapping.is_usable())
            .map(ContentIdMapping::to_player)
            .collect();

        if updates.is_empty() {
            return IngestOutcome::Skipped;
        }

        if let Err(e) = self.store.upsert_players(&updates).await {
            error!(error = %e, "Could not persist content id mappings");
            return IngestOutcome::Failed;
        }

        for player in &updates {
            trace!(content_id = %player.id, name = %player.name, "Content id belongs to player");
            self.player_names.insert(player.id, player.name.clone());
        }

        debug!(count = updates.len(), "Indexed content id mappings");
        IngestOutcome::Applied(updates.len())
    }

    /// Number of indexed (world, retainer name) pairs
    pub fn retainer_count(&self) -> usize {
        self.world_retainers.iter().map(|names| names.len()).sum()
    }

    /// Number of indexed players
    pub fn player_count(&self) -> usize {
        self.player_names.len()
    }

    /// Number of worlds with at least one indexed retainer
    pub fn world_count(&self) -> usize {
        self.world_retainers.len()
    }

    /// Copy of the (world, retainer name) index, sorted
    pub fn retainer_index(&self) -> Vec<(WorldId, String, ContentId)> {
        let mut index: Vec<(WorldId, String, ContentId)> = self
            .world_retainers
            .iter()
            .flat_map(|world| {
                let world_id = *world.key();
                world
                    .value()
                    .iter()
                    .map(|entry| (world_id, entry.key().clone(), *entry.value()))
                    .collect::<Vec<_>>()
            })
            .collect();
        index.sort();
        index
    }

    /// Copy of the content id index, sorted
    pub fn player_index(&self) -> Vec<(ContentId, String)> {
        let mut index: Vec<(ContentId, String)> = self
            .player_names
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        index.sort();
        index
    }

    /// Lookup statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Index sizes and lookup statistics as JSON
    pub fn stats_json(&self) -> serde_json::Value {
        serde_json::json!({
            "worlds": self.world_count(),
            "retainers": self.retainer_count(),
            "players": self.player_count(),
            "lookups": {
                "hits": self.stats.hits(),
                "misses": self.stats.misses(),
                "hit_rate": self.stats.hit_rate(),
            }
        })
    }

    fn index_retainer(&self, world_id: WorldId, name: String, owner: ContentId) {
        if let Some(names) = self.world_retainers.get(&world_id) {
            names.insert(name, owner);
            return;
        }
        self.world_retainers
            .entry(world_id)
            .or_default()
            .insert(name, owner);
    }

    fn describe_owner(&self, owner: ContentId) -> String {
        self.player_name(owner).unwrap_or_else(|| owner.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
