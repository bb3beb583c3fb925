//! Facts handed to the resolution cache by collaborators
//!
//! A fact is an observation, not a record: it may carry sentinel values and is
//! filtered before anything reaches the store.

use serde::{Deserialize, Serialize};

use super::{ContentId, Player, Retainer, RetainerId, WorldId};

/// One row of a marketplace listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub retainer_id: RetainerId,
    pub retainer_name: Option<String>,
    pub owner_content_id: ContentId,
}

impl ListingEntry {
    pub fn new(
        retainer_id: u64,
        retainer_name: Option<impl Into<String>>,
        owner_content_id: u64,
    ) -> Self {
        Self {
            retainer_id: RetainerId(retainer_id),
            retainer_name: retainer_name.map(Into::into),
            owner_content_id: ContentId(owner_content_id),
        }
    }

    /// Zero retainer or owner ids denote an empty listing slot
    pub fn is_sentinel(&self) -> bool {
        self.retainer_id.is_zero() || self.owner_content_id.is_zero()
    }

    /// Build the durable record for this entry as seen on `world_id`
    pub fn to_retainer(&self, world_id: WorldId) -> Retainer {
        Retainer::new(
            self.retainer_id,
            self.retainer_name.clone(),
            world_id,
            self.owner_content_id,
        )
    }
}

/// Content id to character name, from packets or roster snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentIdMapping {
    pub content_id: ContentId,
    pub player_name: String,
}

impl ContentIdMapping {
    pub fn new(content_id: u64, player_name: impl Into<String>) -> Self {
        Self {
            content_id: ContentId(content_id),
            player_name: player_name.into(),
        }
    }

    /// Only mappings with a real id and a non-empty name are persisted
    pub fn is_usable(&self) -> bool {
        !self.content_id.is_zero() && !self.player_name.is_empty()
    }

    pub fn to_player(&self) -> Player {
        Player::new(self.content_id, self.player_name.clone())
    }
}

/// Anything the ingestion worker can be asked to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    /// A marketplace listing page observed on `world_id`
    Ownership {
        world_id: WorldId,
        entries: Vec<ListingEntry>,
    },

    /// One or more identity observations
    Identity(Vec<ContentIdMapping>),
}

impl Fact {
    pub fn kind(&self) -> &'static str {
        match self {
            Fact::Ownership { .. } => "ownership",
            Fact::Identity(_) => "identity",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Fact::Ownership { entries, .. } => entries.len(),
            Fact::Identity(mappings) => mappings.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<ContentIdMapping> for Fact {
    fn from(mapping: ContentIdMapping) -> Self {
        Fact::Identity(vec![mapping])
    }
}
