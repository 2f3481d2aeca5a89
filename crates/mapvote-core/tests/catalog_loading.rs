//! Catalog loading against scripted map sources

use assert_matches::assert_matches;
use mapvote_core::{
    load_catalog, CatalogError, FallbackMapSource, MapId, MapMeta, TierRange,
};
use mapvote_testkit::*;

#[tokio::test]
async fn primary_source_is_used_when_healthy() {
    let source = FallbackMapSource::new(
        StubMapSource::with_names(&["surf_a", "surf_b"]),
        StubMapSource::with_names(&["surf_fallback"]),
    );
    let server = MockServer::new("surf_a");

    let catalog = load_catalog(&source, &server, None).await.unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(!catalog.contains(&MapId::new("surf_fallback")));
}

#[tokio::test]
async fn failing_primary_falls_back() {
    let primary = std::sync::Arc::new(StubMapSource::failing("connection refused"));
    let fallback = std::sync::Arc::new(StubMapSource::with_names(&[
        "surf_beginner",
        "surf_kitsune",
        "surf_ski_2",
    ]));
    let source = FallbackMapSource::new(primary.clone(), fallback.clone());
    let server = MockServer::new("surf_beginner");

    let catalog = load_catalog(&source, &server, None).await.unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(primary.queries(), 1);
    assert_eq!(fallback.queries(), 1);
}

#[tokio::test]
async fn empty_primary_falls_back() {
    let source = FallbackMapSource::new(
        StubMapSource::with_names(&[]),
        StubMapSource::with_names(&["surf_a"]),
    );
    let server = MockServer::new("surf_a");

    let catalog = load_catalog(&source, &server, None).await.unwrap();
    assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![&MapId::new("surf_a")]);
}

#[tokio::test]
async fn unloadable_and_out_of_tier_maps_are_dropped() {
    let source = StubMapSource::with_maps(vec![
        MapMeta::with_tier("surf_easy", 1),
        MapMeta::with_tier("surf_mid", 3),
        MapMeta::with_tier("surf_broken", 3),
        MapMeta::with_tier("surf_hard", 6),
        MapMeta::new("surf_unrated"),
    ]);
    let server = MockServer::new("surf_mid");
    server.mark_invalid("surf_broken");

    let catalog = load_catalog(&source, &server, Some(TierRange::new(2, 4)))
        .await
        .unwrap();
    assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![&MapId::new("surf_mid")]);

    let unfiltered = load_catalog(&source, &server, None).await.unwrap();
    assert_eq!(unfiltered.len(), 4);
}

#[tokio::test]
async fn nothing_eligible_is_an_error() {
    let source = FallbackMapSource::new(
        StubMapSource::failing("timeout"),
        StubMapSource::failing("missing maplist"),
    );
    let server = MockServer::new("surf_a");
    assert_matches!(
        load_catalog(&source, &server, None).await,
        Err(CatalogError::Unavailable { .. })
    );

    let source = StubMapSource::with_names(&["surf_a"]);
    server.mark_invalid("surf_a");
    assert_matches!(
        load_catalog(&source, &server, None).await,
        Err(CatalogError::NoEligibleMaps)
    );
}

#[tokio::test]
async fn primary_with_only_unloadable_maps_falls_back() {
    let primary = std::sync::Arc::new(StubMapSource::with_names(&["db_only_map"]));
    let fallback = std::sync::Arc::new(StubMapSource::with_names(&["surf_good"]));
    let source = FallbackMapSource::new(primary.clone(), fallback.clone());
    let server = MockServer::new("surf_good");
    server.mark_invalid("db_only_map");

    let catalog = load_catalog(&source, &server, None).await.unwrap();
    assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![&MapId::new("surf_good")]);
    assert_eq!(primary.queries(), 1);
    assert_eq!(fallback.queries(), 1);
}

#[tokio::test]
async fn primary_outside_tier_window_falls_back() {
    let source = FallbackMapSource::new(
        StubMapSource::with_maps(vec![MapMeta::with_tier("surf_hard", 6)]),
        StubMapSource::with_maps(vec![MapMeta::with_tier("surf_easy", 2)]),
    );
    let server = MockServer::new("surf_easy");

    let catalog = load_catalog(&source, &server, Some(TierRange::new(1, 3)))
        .await
        .unwrap();
    assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![&MapId::new("surf_easy")]);
}
