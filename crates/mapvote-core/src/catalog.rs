//! Candidate map catalog
//!
//! A [`Catalog`] is an immutable, ordered snapshot of the maps eligible on this
//! server. It is rebuilt out-of-band (see [`load_catalog`]) and swapped into the
//! controller whole; nothing mutates a snapshot in place.
//!
//! ## Loading
//!
//! - [`FallbackMapSource`] chains a primary source (usually a database) with a
//!   secondary one and recovers `CatalogUnavailable` locally. The primary is
//!   abandoned when it fails or when none of its maps survive eligibility
//!   filtering.
//! - [`load_catalog`] validates every candidate against the server, applies the
//!   optional tier window and de-duplicates names.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::effects::{MapSourceEffects, ServerEffects};
use crate::errors::CatalogError;
use crate::types::{MapId, MapMeta, TierRange};

/// Ordered snapshot of candidate maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    maps: Arc<[MapMeta]>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            maps: Arc::from(Vec::new()),
        }
    }
}

impl Catalog {
    /// Build a snapshot, keeping the first entry of any case-insensitive duplicate
    pub fn new(maps: impl IntoIterator<Item = MapMeta>) -> Self {
        let mut seen = HashSet::new();
        let maps: Vec<MapMeta> = maps
            .into_iter()
            .filter(|meta| seen.insert(meta.id.clone()))
            .collect();
        Self { maps: maps.into() }
    }

    /// Build an untiered snapshot from plain names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MapId>,
    {
        Self::new(names.into_iter().map(MapMeta::new))
    }

    /// All entries in catalog order
    pub fn maps(&self) -> &[MapMeta] {
        &self.maps
    }

    /// Map identifiers in catalog order
    pub fn ids(&self) -> impl Iterator<Item = &MapId> {
        self.maps.iter().map(|meta| &meta.id)
    }

    /// Number of maps
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Whether the map is in the catalog
    pub fn contains(&self, map: &MapId) -> bool {
        self.get(map).is_some()
    }

    /// Entry for an exact (case-insensitive) identifier
    pub fn get(&self, map: &MapId) -> Option<&MapMeta> {
        self.maps.iter().find(|meta| &meta.id == map)
    }

    /// Resolve a player-typed name.
    ///
    /// Prefers the first case-insensitive exact match, then the first map whose
    /// name contains the query. Resolution says nothing about availability.
    pub fn resolve(&self, query: &str) -> Option<&MapMeta> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        self.maps
            .iter()
            .find(|meta| meta.id == *query)
            .or_else(|| self.maps.iter().find(|meta| meta.id.contains_ignore_case(query)))
    }

    /// Distinct tiers in ascending order
    pub fn tiers(&self) -> Vec<i32> {
        let mut tiers: Vec<i32> = self.maps.iter().filter_map(|meta| meta.tier).collect();
        tiers.sort_unstable();
        tiers.dedup();
        tiers
    }
}

/// Map source that falls back to a secondary source when the primary fails or
/// returns no eligible map.
#[derive(Debug, Clone)]
pub struct FallbackMapSource<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackMapSource<P, F> {
    /// Chain `primary` before `fallback`
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P, F> MapSourceEffects for FallbackMapSource<P, F>
where
    P: MapSourceEffects,
    F: MapSourceEffects,
{
    async fn query_candidate_maps(&self) -> Result<Vec<MapMeta>, CatalogError> {
        match self.primary.query_candidate_maps().await {
            Ok(maps) if !maps.is_empty() => return Ok(maps),
            Ok(_) => tracing::warn!("Primary map source returned no maps, using fallback"),
            Err(e) => tracing::warn!(error = %e, "Primary map source failed, using fallback"),
        }
        self.fallback.query_candidate_maps().await
    }

    async fn query_eligible_maps(
        &self,
        eligible: &(dyn for<'m> Fn(&'m MapMeta) -> bool + Send + Sync),
    ) -> Result<Vec<MapMeta>, CatalogError> {
        match self.primary.query_eligible_maps(eligible).await {
            Ok(maps) if !maps.is_empty() => return Ok(maps),
            Ok(_) => tracing::warn!("Primary map source has no eligible maps, using fallback"),
            Err(e) => tracing::warn!(error = %e, "Primary map source failed, using fallback"),
        }
        self.fallback.query_eligible_maps(eligible).await
    }
}

/// Query `source` and turn the result into a validated catalog.
///
/// Drops maps the server cannot load and maps outside `tiers`. Fails with
/// [`CatalogError::NoEligibleMaps`] if nothing is left.
pub async fn load_catalog<S, V>(
    source: &S,
    server: &V,
    tiers: Option<TierRange>,
) -> Result<Catalog, CatalogError>
where
    S: MapSourceEffects + ?Sized,
    V: ServerEffects + Sync + ?Sized,
{
    let eligible = |meta: &MapMeta| {
        tiers.map_or(true, |range| range.contains(meta.tier)) && server.is_map_valid(&meta.id)
    };
    let catalog = Catalog::new(source.query_eligible_maps(&eligible).await?);

    if catalog.is_empty() {
        return Err(CatalogError::NoEligibleMaps);
    }

    tracing::info!(maps = catalog.len(), "Map catalog loaded");
    Ok(catalog)
}
