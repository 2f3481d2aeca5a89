//! Maps that may not be offered during the current session.

use serde::{Deserialize, Serialize};

use crate::types::MapId;

/// Session exclusion set: the current map plus recently played maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSet {
    current: Option<MapId>,
    recent: Vec<MapId>,
}

impl ExclusionSet {
    /// Exclusions for a session on `current`
    pub fn new(current: MapId, recent: impl IntoIterator<Item = MapId>) -> Self {
        let recent = recent.into_iter().filter(|map| *map != current).collect();
        Self {
            current: Some(current),
            recent,
        }
    }

    /// Map being played, if a session is running
    pub fn current(&self) -> Option<&MapId> {
        self.current.as_ref()
    }

    /// Whether `map` is the current map
    pub fn is_current(&self, map: &MapId) -> bool {
        self.current.as_ref() == Some(map)
    }

    /// Whether `map` was played recently
    pub fn is_recent(&self, map: &MapId) -> bool {
        self.recent.contains(map)
    }

    /// Whether `map` is excluded at all
    pub fn contains(&self, map: &MapId) -> bool {
        self.is_current(map) || self.is_recent(map)
    }

    /// Every excluded map, current first
    pub fn iter(&self) -> impl Iterator<Item = &MapId> {
        self.current.iter().chain(self.recent.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_and_recent_are_excluded() {
        let set = ExclusionSet::new(
            MapId::new("surf_a"),
            vec![MapId::new("surf_b"), MapId::new("SURF_A")],
        );
        assert!(set.is_current(&MapId::new("Surf_A")));
        assert!(set.is_recent(&MapId::new("surf_b")));
        assert!(!set.is_recent(&MapId::new("surf_a")));
        assert!(!set.contains(&MapId::new("surf_c")));
        assert_eq!(set.iter().count(), 2);
    }
}
