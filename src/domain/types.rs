//! Core identifier types for RetainerTrack
//!
//! All identifiers are plain integers on the wire. Zero is reserved as the
//! "nothing here" sentinel by the game for every one of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable 64-bit identity of a player account (the game's "content id")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub u64);

impl ContentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Zero marks an empty roster slot or a listing without an owner
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for ContentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 64-bit retainer identifier, unique per world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetainerId(pub u64);

impl RetainerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for RetainerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RetainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Game world (server) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub u16);

impl WorldId {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The client reports world 0 until a character is logged in
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u16> for WorldId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
