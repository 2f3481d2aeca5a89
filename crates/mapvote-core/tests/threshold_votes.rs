//! Rock-the-vote and vote-extend through the controller

use std::time::Duration;

use assert_matches::assert_matches;
use mapvote_core::{
    BallotOption, BallotTrigger, ExtendSource, MapVoteConfig, MapVoteController, MapVoteError,
    Notice, PlayerRef, SessionPhase, ThresholdKind, ThresholdPhase, TimerSlot,
};
use mapvote_testkit::*;

const MINUTE: Duration = Duration::from_secs(60);

fn session_with(
    config: MapVoteConfig,
    connected: usize,
    remaining: Duration,
) -> (TestEnv, MapVoteController) {
    init_test_tracing();
    let env = TestEnv::new("surf_beginner", 11);
    env.set_connected(connected);
    env.set_remaining(remaining);
    let mut controller = controller_with(config, surf_catalog());
    controller.start_map(&env);
    (env, controller)
}

fn session(connected: usize, remaining: Duration) -> (TestEnv, MapVoteController) {
    session_with(test_config(), connected, remaining)
}

#[test]
fn rock_the_vote_passes_at_threshold_and_opens_ballot() {
    let (env, mut controller) = session(4, 20 * MINUTE);

    let first = controller.rock_the_vote(&env, PlayerRef(1)).unwrap();
    assert!(first.started);
    assert_eq!((first.votes, first.needed), (1, 3));

    controller.rock_the_vote(&env, PlayerRef(2)).unwrap();
    assert_matches!(
        controller.rock_the_vote(&env, PlayerRef(1)),
        Err(MapVoteError::AlreadyVoted)
    );
    assert_eq!(controller.phase(), SessionPhase::WaitingToPoll);

    let last = controller.rock_the_vote(&env, PlayerRef(3)).unwrap();
    assert!(last.passed);
    assert_eq!(controller.phase(), SessionPhase::BallotOpen);
    assert!(env.notices.all().iter().any(|notice| matches!(
        notice,
        Notice::BallotOpened {
            trigger: BallotTrigger::RockTheVote,
            ..
        }
    )));

    assert_matches!(
        controller.rock_the_vote(&env, PlayerRef(4)),
        Err(MapVoteError::VoteInProgress)
    );
}

#[test]
fn rock_the_vote_requires_minimum_players() {
    let (env, mut controller) = session(1, 20 * MINUTE);
    assert_matches!(
        controller.rock_the_vote(&env, PlayerRef(1)),
        Err(MapVoteError::NotEnoughPlayers {
            required: 2,
            connected: 1
        })
    );
}

#[test]
fn rock_the_vote_respects_feature_switch() {
    let mut config = test_config();
    config.rock_the_vote.enabled = false;
    let (env, mut controller) = session_with(config, 4, 20 * MINUTE);
    assert_matches!(
        controller.rock_the_vote(&env, PlayerRef(1)),
        Err(MapVoteError::Disabled)
    );
}

#[test]
fn rock_the_vote_after_resolution_is_rejected() {
    let (env, mut controller) = session(4, 20 * MINUTE);
    controller.force_ballot(&env).unwrap();
    env.run_for(&mut controller, MINUTE);
    assert_eq!(controller.phase(), SessionPhase::Resolved);

    assert_matches!(
        controller.rock_the_vote(&env, PlayerRef(1)),
        Err(MapVoteError::AlreadyResolved)
    );
}

#[test]
fn departure_of_non_voter_can_pass_rock_the_vote() {
    let (env, mut controller) = session(4, 20 * MINUTE);
    controller.rock_the_vote(&env, PlayerRef(1)).unwrap();
    controller.rock_the_vote(&env, PlayerRef(2)).unwrap();

    env.set_connected(3);
    controller.on_disconnect(&env, PlayerRef(4));

    assert_eq!(controller.phase(), SessionPhase::BallotOpen);
}

#[test]
fn departure_of_voter_lowers_progress() {
    let (env, mut controller) = session(4, 20 * MINUTE);
    controller.rock_the_vote(&env, PlayerRef(1)).unwrap();
    controller.rock_the_vote(&env, PlayerRef(2)).unwrap();
    env.take_notices();

    env.set_connected(3);
    controller.on_disconnect(&env, PlayerRef(1));

    assert_eq!(controller.phase(), SessionPhase::WaitingToPoll);
    let status = controller.status(&env);
    assert_eq!(status.rock_the_vote.progress.votes, 1);
    assert_eq!(status.rock_the_vote.progress.needed, 2);
    assert!(env.take_notices().iter().any(|notice| matches!(
        notice,
        Notice::ThresholdProgress(progress) if progress.votes == 1 && !progress.passed
    )));

    // the departed player may vote again after rejoining
    env.set_connected(4);
    let progress = controller.rock_the_vote(&env, PlayerRef(1)).unwrap();
    assert_eq!(progress.votes, 2);
}

#[test]
fn rock_the_vote_has_no_expiry_by_default() {
    let (env, mut controller) = session(4, 20 * MINUTE);
    controller.rock_the_vote(&env, PlayerRef(1)).unwrap();
    assert!(!env
        .scheduler
        .is_pending(TimerSlot::ThresholdExpire(ThresholdKind::RockTheVote)));

    env.run_for(&mut controller, 5 * MINUTE);
    assert_eq!(
        controller.status(&env).rock_the_vote.phase,
        ThresholdPhase::Active
    );
}

#[test]
fn bounded_rock_the_vote_expires() {
    let mut config = test_config();
    config.rock_the_vote.vote_duration_secs = Some(60);
    let (env, mut controller) = session_with(config, 4, 20 * MINUTE);
    controller.rock_the_vote(&env, PlayerRef(1)).unwrap();

    env.run_for(&mut controller, MINUTE);
    assert_eq!(
        controller.status(&env).rock_the_vote.phase,
        ThresholdPhase::Expired
    );
    assert!(env.notices.all().contains(&Notice::ThresholdExpired {
        kind: ThresholdKind::RockTheVote,
        votes: 1,
        needed: 3,
    }));

    let restarted = controller.rock_the_vote(&env, PlayerRef(1)).unwrap();
    assert!(restarted.started);
    assert_eq!(restarted.votes, 1);
}

#[test]
fn vote_extend_only_opens_near_time_limit() {
    let (env, mut controller) = session(2, 20 * MINUTE);
    assert_matches!(
        controller.vote_extend(&env, PlayerRef(1)),
        Err(MapVoteError::ExtendWindowClosed {
            allowed_minutes: 10
        })
    );

    env.server.set_remaining(None);
    assert_matches!(
        controller.vote_extend(&env, PlayerRef(1)),
        Err(MapVoteError::ExtendWindowClosed { .. })
    );
}

#[test]
fn vote_extend_pass_extends_once() {
    let (env, mut controller) = session(2, 9 * MINUTE);

    let first = controller.vote_extend(&env, PlayerRef(1)).unwrap();
    assert!(first.started && !first.passed);
    assert!(env
        .scheduler
        .is_pending(TimerSlot::ThresholdExpire(ThresholdKind::VoteExtend)));

    let second = controller.vote_extend(&env, PlayerRef(2)).unwrap();
    assert!(second.passed);
    assert_eq!(env.server.time_limit_increases(), vec![15]);
    assert!(!env
        .scheduler
        .is_pending(TimerSlot::ThresholdExpire(ThresholdKind::VoteExtend)));
    assert!(env.notices.all().contains(&Notice::MapExtended {
        minutes: 15,
        source: ExtendSource::VoteExtend,
    }));

    assert_matches!(
        controller.vote_extend(&env, PlayerRef(1)),
        Err(MapVoteError::AlreadyExtended)
    );
    assert_eq!(controller.session().extends, 0);
}

#[test]
fn vote_extend_episode_expires() {
    let mut config = test_config();
    config.ballot.start_time_minutes = 2;
    let (env, mut controller) = session_with(config, 4, 9 * MINUTE);

    controller.vote_extend(&env, PlayerRef(1)).unwrap();
    env.run_for(&mut controller, Duration::from_secs(30));

    assert_eq!(
        controller.status(&env).vote_extend.phase,
        ThresholdPhase::Expired
    );
    assert!(env.notices.all().contains(&Notice::ThresholdExpired {
        kind: ThresholdKind::VoteExtend,
        votes: 1,
        needed: 3,
    }));
    assert!(env.server.time_limit_increases().is_empty());
}

#[test]
fn ballot_supersedes_vote_extend() {
    let (env, mut controller) = session(4, 9 * MINUTE);
    controller.vote_extend(&env, PlayerRef(1)).unwrap();

    controller.force_ballot(&env).unwrap();
    assert_eq!(
        controller.status(&env).vote_extend.phase,
        ThresholdPhase::Idle
    );
    assert!(!env
        .scheduler
        .is_pending(TimerSlot::ThresholdExpire(ThresholdKind::VoteExtend)));
    assert_matches!(
        controller.vote_extend(&env, PlayerRef(2)),
        Err(MapVoteError::VoteInProgress)
    );
}

#[test]
fn vote_extend_rejected_once_level_change_is_pending() {
    let (env, mut controller) = session(2, 9 * MINUTE);
    controller.force_ballot(&env).unwrap();
    controller.cast_ballot_index(&env, PlayerRef(1), 0).unwrap();
    env.run_for(&mut controller, Duration::from_secs(30));

    let next = controller.next_map().cloned().unwrap();
    assert_matches!(
        controller.vote_extend(&env, PlayerRef(1)),
        Err(MapVoteError::LevelChangePending { map }) if map == next
    );
}

#[test]
fn vote_extend_after_ballot_extension_is_independent() {
    let (env, mut controller) = session(2, 9 * MINUTE);
    controller.force_ballot(&env).unwrap();
    controller
        .cast_ballot(&env, PlayerRef(1), &BallotOption::Extend)
        .unwrap();
    env.run_for(&mut controller, Duration::from_secs(30));
    assert_eq!(controller.session().extends, 1);

    // 23m30s remain: outside the vote-extend window
    assert_matches!(
        controller.vote_extend(&env, PlayerRef(1)),
        Err(MapVoteError::ExtendWindowClosed { .. })
    );
}
