//! Durable record shapes
//!
//! These are the only two things ever written to the store. Both indexes held
//! by the resolution cache are projections of them.

use serde::{Deserialize, Serialize};

use super::{ContentId, RetainerId, WorldId};

/// A marketplace retainer and the account that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retainer {
    /// Primary key
    pub id: RetainerId,

    /// Display name, absent when the listing did not carry one
    pub name: Option<String>,

    /// World the retainer was observed on
    pub world_id: WorldId,

    /// Owning account; may not resolve to a known player
    pub owner_content_id: ContentId,
}

impl Retainer {
    pub fn new(
        id: RetainerId,
        name: Option<String>,
        world_id: WorldId,
        owner_content_id: ContentId,
    ) -> Self {
        Self {
            id,
            name,
            world_id,
            owner_content_id,
        }
    }
}

/// A player account and its most recently seen character name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Primary key
    pub id: ContentId,

    pub name: String,
}

impl Player {
    pub fn new(id: ContentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
