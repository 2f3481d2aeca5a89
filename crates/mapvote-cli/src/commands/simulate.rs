//! `mapvote simulate`
//!
//! Plays one map session on the testkit's virtual clock: players nominate,
//! optionally rock the vote, and vote randomly on every ballot until the
//! session resolves.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use mapvote_core::{MapVoteController, SessionPhase};
use mapvote_testkit::{players, TestEnv};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::common;

const STEP: Duration = Duration::from_secs(1);

#[derive(Args)]
pub struct SimulateArgs {
    /// Map the session starts on
    #[arg(long, default_value = "surf_beginner")]
    map: String,

    /// Connected players
    #[arg(short, long, default_value = "8")]
    players: u32,

    /// Minutes left on the time limit when the session starts
    #[arg(long, default_value = "15")]
    time_limit: u64,

    /// Seed for ballot fill and simulated player choices
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Have every player rock the vote right away
    #[arg(long)]
    rtv: bool,

    /// Print notices as JSON lines
    #[arg(long)]
    json: bool,
}

pub async fn run(config_path: &Path, maplist: &Path, args: SimulateArgs) -> Result<()> {
    let config = common::load_config(config_path).await?;
    let env = TestEnv::new(args.map.as_str(), args.seed);
    env.set_connected(args.players as usize);
    env.set_remaining(Duration::from_secs(args.time_limit * 60));
    let catalog = common::load_catalog_for(&config, maplist, &env).await?;

    let horizon = Duration::from_secs(
        (args.time_limit
            + u64::from(config.ballot.max_extends) * u64::from(config.ballot.extend_time_minutes)
            + u64::from(config.vote_extend.extend_time_minutes)
            + 1)
            * 60,
    );

    let mut controller = MapVoteController::with_catalog(config, catalog);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let roster = players(args.players);

    controller.start_map(&env);
    for player in &roster {
        let available = controller.available_maps();
        if available.is_empty() {
            break;
        }
        let pick = available[rng.gen_range(0..available.len())].id.clone();
        if let Err(e) = controller.nominate(&env, *player, pick.as_str()) {
            tracing::debug!(player = %player, error = %e, "Nomination refused");
        }
    }

    if args.rtv {
        for player in &roster {
            if controller.phase() != SessionPhase::WaitingToPoll {
                break;
            }
            if let Err(e) = controller.rock_the_vote(&env, *player) {
                tracing::debug!(player = %player, error = %e, "Rock-the-vote refused");
            }
        }
    }

    let mut elapsed = Duration::ZERO;
    while elapsed < horizon && env.server.level_changes().is_empty() {
        if let Some(ballot) = controller.ballot() {
            if ballot.vote_count() == 0 {
                let options = ballot.options().len();
                for player in &roster {
                    controller.cast_ballot_index(&env, *player, rng.gen_range(0..options))?;
                }
            }
        }
        if controller.phase() == SessionPhase::Resolved && controller.next_map().is_none() {
            break;
        }
        env.run_for(&mut controller, STEP);
        elapsed += STEP;
    }

    for notice in env.take_notices() {
        if args.json {
            println!("{}", serde_json::to_string(&notice)?);
        } else {
            println!("{notice:?}");
        }
    }

    let status = controller.status(&env);
    println!(
        "elapsed {}s, phase {:?}, ballot extends {}, next map {}",
        elapsed.as_secs(),
        status.phase,
        status.extends,
        status
            .next_map
            .as_ref()
            .map_or_else(|| "(none)".to_string(), ToString::to_string),
    );
    Ok(())
}
