//! Property test strategies for engine types

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use mapvote_core::{MapId, MapMeta, PlayerRef};

/// Strategy for surf-style map names
pub fn arb_map_id() -> impl Strategy<Value = MapId> {
    "surf_[a-z]{1,8}".prop_map(MapId::new)
}

/// Strategy for catalogs of `1..=max` distinct maps with optional tiers
pub fn arb_map_list(max: usize) -> impl Strategy<Value = Vec<MapMeta>> {
    prop::collection::btree_set("surf_[a-z]{1,8}", 1..=max).prop_flat_map(|names| {
        let len = names.len();
        (
            Just(names),
            prop::collection::vec(prop::option::of(1i32..=8), len),
        )
            .prop_map(|(names, tiers)| {
                names
                    .into_iter()
                    .zip(tiers)
                    .map(|(name, tier)| MapMeta {
                        id: MapId::new(name),
                        tier,
                    })
                    .collect()
            })
    })
}

/// Strategy for player references in `1..=max`
pub fn arb_player(max: u32) -> impl Strategy<Value = PlayerRef> {
    (1..=max).prop_map(PlayerRef)
}
