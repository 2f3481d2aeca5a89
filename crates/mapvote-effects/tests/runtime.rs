//! End-to-end runtime tests on paused tokio time

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use mapvote_core::{
    BallotOption, ConfigError, MapId, MapVoteConfig, MapVoteError, NominationMenu, Notice,
    PlayerRef, SessionPhase,
};
use mapvote_effects::{MapVoteRuntime, RuntimeError, StaticMapSource};
use mapvote_testkit::{init_test_tracing, StubMapSource, TestEnv};

const MAPS: [&str; 4] = ["surf_beginner", "surf_kitsune", "surf_ski_2", "surf_utopia"];

fn host(connected: usize) -> Arc<TestEnv> {
    init_test_tracing();
    let env = TestEnv::new("surf_beginner", 0);
    env.set_connected(connected);
    env.set_remaining(Duration::from_secs(20 * 60));
    Arc::new(env)
}

fn menu_maps(menu: NominationMenu) -> Vec<MapId> {
    match menu {
        NominationMenu::Flat(maps) => maps.into_iter().map(|meta| meta.id).collect(),
        NominationMenu::Tiered(groups) => groups.into_iter().flat_map(|group| group.maps).collect(),
    }
}

#[tokio::test(start_paused = true)]
async fn rock_the_vote_to_level_change() {
    let host = host(2);
    let runtime = MapVoteRuntime::spawn(
        MapVoteConfig::default(),
        Arc::clone(&host),
        StaticMapSource::from_names(MAPS),
    )
    .unwrap();
    let handle = runtime.handle();
    handle.start_map().unwrap();

    handle.nominate(PlayerRef(1), "utopia").await.unwrap();
    handle.rock_the_vote(PlayerRef(1)).await.unwrap();
    let progress = handle.rock_the_vote(PlayerRef(2)).await.unwrap();
    assert!(progress.passed);

    let status = handle.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::BallotOpen);
    let ballot = status.ballot.unwrap();
    assert_eq!(ballot.options[0], BallotOption::Map(MapId::new("surf_utopia")));

    handle.cast_ballot_index(PlayerRef(1), 0).await.unwrap();
    handle
        .cast_ballot(PlayerRef(2), BallotOption::Map(MapId::new("surf_utopia")))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(
        handle.next_map().await.unwrap(),
        Some(MapId::new("surf_utopia"))
    );
    assert!(host.server.level_changes().is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(host.server.level_changes(), vec![MapId::new("surf_utopia")]);

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn engine_errors_reach_the_caller() {
    let host = host(1);
    let runtime = MapVoteRuntime::spawn(
        MapVoteConfig::default(),
        Arc::clone(&host),
        StaticMapSource::from_names(MAPS),
    )
    .unwrap();
    let handle = runtime.handle();
    handle.start_map().unwrap();

    assert_matches!(
        handle.rock_the_vote(PlayerRef(1)).await,
        Err(RuntimeError::Engine(MapVoteError::NotEnoughPlayers { .. }))
    );
    assert_matches!(
        handle.nominate(PlayerRef(1), "beginner").await,
        Err(RuntimeError::Engine(MapVoteError::Unavailable { .. }))
    );

    runtime.shutdown().await;
    assert_matches!(handle.status().await, Err(RuntimeError::Closed));
}

#[tokio::test(start_paused = true)]
async fn catalog_falls_back_to_configured_maps() {
    let host = host(2);
    let mut config = MapVoteConfig::default();
    config.catalog.fallback_maps = vec!["surf_beginner".into(), "surf_lux".into()];
    let runtime = MapVoteRuntime::spawn(
        config,
        Arc::clone(&host),
        StubMapSource::failing("database offline"),
    )
    .unwrap();
    let handle = runtime.handle();
    handle.start_map().unwrap();

    handle.force_ballot().await.unwrap();
    let ballot = handle.status().await.unwrap().ballot.unwrap();
    assert_eq!(
        ballot.options,
        vec![BallotOption::Map(MapId::new("surf_lux")), BallotOption::Extend]
    );

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn time_limit_opens_ballot_and_stale_timers_are_dropped() {
    let host = host(3);
    host.set_remaining(Duration::from_secs(10 * 60));
    let runtime = MapVoteRuntime::spawn(
        MapVoteConfig::default(),
        Arc::clone(&host),
        StaticMapSource::from_names(MAPS),
    )
    .unwrap();
    let handle = runtime.handle();
    handle.start_map().unwrap();

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(handle.status().await.unwrap().phase, SessionPhase::BallotOpen);

    handle.end_map().unwrap();
    host.server.set_current_map("surf_kitsune");
    host.set_remaining(Duration::from_secs(30 * 60));
    handle.start_map().unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    let status = handle.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::WaitingToPoll);
    assert_eq!(status.current_map, Some(MapId::new("surf_kitsune")));
    assert_eq!(
        host.notices
            .count(|notice| matches!(notice, Notice::BallotResult { .. })),
        0
    );

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn catalog_refresh_swaps_snapshot_and_survives_failure() {
    let host = host(2);
    let source = Arc::new(StubMapSource::with_names(&["surf_beginner", "surf_kitsune"]));
    let runtime =
        MapVoteRuntime::spawn(MapVoteConfig::default(), Arc::clone(&host), Arc::clone(&source))
            .unwrap();
    let handle = runtime.handle();
    handle.start_map().unwrap();
    assert_eq!(
        menu_maps(handle.nomination_menu().await.unwrap()),
        vec![MapId::new("surf_kitsune")]
    );

    source.set_names(&["surf_utopia", "surf_lux"]);
    handle.refresh_catalog().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(source.queries(), 2);
    let refreshed = vec![MapId::new("surf_utopia"), MapId::new("surf_lux")];
    assert_eq!(menu_maps(handle.nomination_menu().await.unwrap()), refreshed);

    source.set_failing("database offline");
    handle.refresh_catalog().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(source.queries(), 3);
    assert_eq!(menu_maps(handle.nomination_menu().await.unwrap()), refreshed);
    handle.nominate(PlayerRef(1), "lux").await.unwrap();

    runtime.shutdown().await;
}

#[tokio::test]
async fn invalid_config_is_rejected_before_spawning() {
    let mut config = MapVoteConfig::default();
    config.ballot.poll_interval_secs = 0;
    assert_matches!(
        MapVoteRuntime::spawn(config, host(2), StaticMapSource::from_names(MAPS)),
        Err(ConfigError::Invalid {
            field: "ballot.poll_interval_secs",
            ..
        })
    );
}
