//! Shared fixtures

use mapvote_core::{Catalog, MapMeta, MapVoteConfig, MapVoteController, PlayerRef};

/// Tiered catalog of eight surf maps
pub fn surf_catalog() -> Catalog {
    Catalog::new(vec![
        MapMeta::with_tier("surf_beginner", 1),
        MapMeta::with_tier("surf_kitsune", 1),
        MapMeta::with_tier("surf_ski_2", 2),
        MapMeta::with_tier("surf_utopia", 2),
        MapMeta::with_tier("surf_mesa", 3),
        MapMeta::with_tier("surf_rebel", 4),
        MapMeta::with_tier("surf_lux", 5),
        MapMeta::new("surf_forbidden_ways"),
    ])
}

/// Untiered catalog built from `names`
pub fn catalog_of(names: &[&str]) -> Catalog {
    Catalog::from_names(names.iter().copied())
}

/// Default configuration with recent-map exclusion disabled, so every session
/// sees the whole catalog
pub fn test_config() -> MapVoteConfig {
    let mut config = MapVoteConfig::default();
    config.nominations.exclude_recent_maps = 0;
    config
}

/// Controller over `catalog`
pub fn controller_with(config: MapVoteConfig, catalog: Catalog) -> MapVoteController {
    MapVoteController::with_catalog(config, catalog)
}

/// Players numbered `1..=count`
pub fn players(count: u32) -> Vec<PlayerRef> {
    (1..=count).map(PlayerRef).collect()
}
