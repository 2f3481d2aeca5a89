//! Helpers shared by subcommands

use std::path::Path;

use anyhow::{Context, Result};
use mapvote_core::{load_catalog, Catalog, FallbackMapSource, MapVoteConfig, ServerEffects};
use mapvote_effects::{load_or_default, FileMapSource, StaticMapSource};

/// Load the config file, writing defaults if it does not exist
pub async fn load_config(path: &Path) -> Result<MapVoteConfig> {
    load_or_default(path)
        .await
        .with_context(|| format!("loading config from {}", path.display()))
}

/// Build the catalog from the map list, falling back to the configured maps
pub async fn load_catalog_for<V: ServerEffects + Sync>(
    config: &MapVoteConfig,
    maplist: &Path,
    server: &V,
) -> Result<Catalog> {
    let source = FallbackMapSource::new(
        FileMapSource::new(maplist),
        StaticMapSource::from_names(&config.catalog.fallback_maps),
    );
    load_catalog(&source, server, config.catalog.tier_range())
        .await
        .with_context(|| format!("loading catalog from {}", maplist.display()))
}
