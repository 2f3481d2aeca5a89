//! Core identifiers and records shared by every engine component.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Map identifier.
///
/// Equality, ordering and hashing ignore ASCII case so that `Surf_Ski_2` and
/// `surf_ski_2` refer to the same map. The original spelling is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(String);

impl MapId {
    /// Create a map identifier from its display name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Display name exactly as supplied
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring test used for partial name lookups
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        self.0
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for MapId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for MapId {}

impl PartialEq<str> for MapId {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for MapId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.folded() {
            state.write_u8(byte);
        }
        state.write_u8(0xff);
    }
}

impl Ord for MapId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl PartialOrd for MapId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MapId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Per-connection player reference (the host's slot or session id).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerRef(pub u32);

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Catalog entry for one map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMeta {
    /// Map identifier
    pub id: MapId,
    /// Optional difficulty tier or group
    pub tier: Option<i32>,
}

impl MapMeta {
    /// Entry without a tier
    pub fn new(id: impl Into<MapId>) -> Self {
        Self {
            id: id.into(),
            tier: None,
        }
    }

    /// Entry with a tier
    pub fn with_tier(id: impl Into<MapId>, tier: i32) -> Self {
        Self {
            id: id.into(),
            tier: Some(tier),
        }
    }
}

/// A player's standing proposal for the next ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nomination {
    /// Nominated map
    pub map: MapId,
    /// Nominating player
    pub owner: PlayerRef,
}

/// Inclusive tier window applied while loading the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRange {
    /// Lowest accepted tier
    pub min: i32,
    /// Highest accepted tier
    pub max: i32,
}

impl TierRange {
    /// Build a window; a `max` below `min` collapses to the single tier `min`
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// Whether a map with this tier falls inside the window.
    /// Untiered maps never match an explicit window.
    pub fn contains(&self, tier: Option<i32>) -> bool {
        tier.is_some_and(|t| t >= self.min && t <= self.max)
    }
}
