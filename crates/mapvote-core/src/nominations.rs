//! Nomination registry
//!
//! Tracks at most one standing nomination per player, in nomination order.
//!
//! ## Invariants
//!
//! - One nomination per owner; a second nomination replaces the first in place
//! - No map is nominated twice
//! - A nominated map was available when it was nominated
//! - The number of nominations never exceeds the configured maximum

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::{MapVoteError, Result, UnavailableReason};
use crate::exclusion::ExclusionSet;
use crate::types::{MapId, MapMeta, Nomination, PlayerRef};

/// Result of a successful nomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NominationOutcome {
    /// A new nomination was recorded
    Added {
        /// Nominated map
        map: MapId,
    },
    /// The owner's previous nomination was replaced
    Changed {
        /// Map that became available again
        previous: MapId,
        /// New nomination
        map: MapId,
    },
}

impl NominationOutcome {
    /// The map now nominated
    pub fn map(&self) -> &MapId {
        match self {
            NominationOutcome::Added { map } | NominationOutcome::Changed { map, .. } => map,
        }
    }
}

/// Available maps sharing one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierGroup {
    /// Tier, or `None` for untiered maps
    pub tier: Option<i32>,
    /// Available maps in catalog order
    pub maps: Vec<MapId>,
}

/// Nomination menu, flat or grouped by tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NominationMenu {
    /// Every available map in catalog order
    Flat(Vec<MapMeta>),
    /// Available maps grouped by ascending tier, untiered last; empty groups omitted
    Tiered(Vec<TierGroup>),
}

/// Registry of standing nominations for one session.
#[derive(Debug, Clone)]
pub struct NominationRegistry {
    entries: Vec<Nomination>,
    max_nominations: usize,
    exclude_current: bool,
}

impl NominationRegistry {
    /// Empty registry
    pub fn new(max_nominations: usize, exclude_current: bool) -> Self {
        Self {
            entries: Vec::new(),
            max_nominations,
            exclude_current,
        }
    }

    /// Nominate the map matching `query` on behalf of `owner`.
    pub fn nominate(
        &mut self,
        owner: PlayerRef,
        query: &str,
        catalog: &Catalog,
        exclusions: &ExclusionSet,
    ) -> Result<NominationOutcome> {
        let map = catalog
            .resolve(query)
            .map(|meta| meta.id.clone())
            .ok_or_else(|| MapVoteError::NotFound {
                query: query.to_string(),
            })?;

        if let Some(existing) = self.entries.iter().find(|n| n.map == map) {
            if existing.owner == owner {
                return Err(MapVoteError::AlreadyNominatedBySelf { map });
            }
            return Err(MapVoteError::Unavailable {
                map,
                reason: UnavailableReason::AlreadyNominated,
            });
        }

        if let Some(reason) = self.exclusion_reason(&map, exclusions) {
            return Err(MapVoteError::Unavailable { map, reason });
        }

        if let Some(entry) = self.entries.iter_mut().find(|n| n.owner == owner) {
            let previous = std::mem::replace(&mut entry.map, map.clone());
            return Ok(NominationOutcome::Changed { previous, map });
        }

        if self.entries.len() >= self.max_nominations {
            return Err(MapVoteError::LimitReached {
                max: self.max_nominations,
            });
        }

        self.entries.push(Nomination {
            map: map.clone(),
            owner,
        });
        Ok(NominationOutcome::Added { map })
    }

    /// Drop `owner`'s nomination, returning the freed map
    pub fn remove(&mut self, owner: PlayerRef) -> Option<MapId> {
        let index = self.entries.iter().position(|n| n.owner == owner)?;
        Some(self.entries.remove(index).map)
    }

    /// Current nomination of `owner`
    pub fn nomination_of(&self, owner: PlayerRef) -> Option<&MapId> {
        self.entries
            .iter()
            .find(|n| n.owner == owner)
            .map(|n| &n.map)
    }

    /// Whether anyone nominated `map`
    pub fn is_nominated(&self, map: &MapId) -> bool {
        self.entries.iter().any(|n| &n.map == map)
    }

    /// Nominations in nomination order
    pub fn snapshot(&self) -> &[Nomination] {
        &self.entries
    }

    /// Number of standing nominations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no nominations are standing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every nomination
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Catalog maps that can currently be nominated, in catalog order
    pub fn available_maps<'a>(
        &self,
        catalog: &'a Catalog,
        exclusions: &ExclusionSet,
    ) -> Vec<&'a MapMeta> {
        catalog
            .maps()
            .iter()
            .filter(|meta| {
                !self.is_nominated(&meta.id) && self.exclusion_reason(&meta.id, exclusions).is_none()
            })
            .collect()
    }

    /// Available maps as a menu
    pub fn menu(&self, catalog: &Catalog, exclusions: &ExclusionSet, tiered: bool) -> NominationMenu {
        let available = self.available_maps(catalog, exclusions);
        if !tiered {
            return NominationMenu::Flat(available.into_iter().cloned().collect());
        }

        let mut tiers: Vec<Option<i32>> = available.iter().map(|meta| meta.tier).collect();
        // Untiered sorts last
        tiers.sort_by_key(|tier| (tier.is_none(), *tier));
        tiers.dedup();

        let groups = tiers
            .into_iter()
            .map(|tier| TierGroup {
                tier,
                maps: available
                    .iter()
                    .filter(|meta| meta.tier == tier)
                    .map(|meta| meta.id.clone())
                    .collect(),
            })
            .collect();
        NominationMenu::Tiered(groups)
    }

    fn exclusion_reason(&self, map: &MapId, exclusions: &ExclusionSet) -> Option<UnavailableReason> {
        if exclusions.is_current(map) {
            return self.exclude_current.then_some(UnavailableReason::CurrentMap);
        }
        exclusions
            .is_recent(map)
            .then_some(UnavailableReason::Excluded)
    }
}
