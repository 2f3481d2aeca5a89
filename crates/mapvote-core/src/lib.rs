//! Mapvote Core - Map Selection and Voting Engine
//!
//! Decides which map a game server plays next. Contains the pure state
//! machines and the effect interfaces they run against; timers, randomness,
//! the player roster and the map list all come from the host.
//!
//! # Architecture Layers
//!
//! ## State Machines
//! - `NominationRegistry`: one standing nomination per player, capped
//! - `ThresholdVote`: `max(1, ceil(connected × pct))` participant votes
//!   (rock-the-vote, vote-extend)
//! - `Ballot`: frozen option list, plurality tally, earliest option wins ties
//! - `MapVoteController`: session phases `WaitingToPoll → BallotOpen → Resolved`
//!
//! ## Effect Interfaces
//! - `ServerEffects`: roster, clock, remaining time, level change
//! - `SchedulerEffects`: session-stamped one-shot and repeating timers
//! - `RandomEffects`: ballot fill
//! - `NoticeEffects`: player-facing notifications
//! - `MapSourceEffects`: candidate map queries
//!
//! ## Session Contracts
//! - At most one ballot per session unless the extend option wins
//! - Timers from an ended session never act on a later one
//! - Ballot extensions never exceed the configured cap

#![forbid(unsafe_code)]

// === Core Modules ===

/// Map identifiers, players and tier metadata
pub mod types;

/// Unified error handling
pub mod errors;

/// TOML-backed engine configuration
pub mod config;

/// Host effect interfaces (no implementations)
pub mod effects;

/// Outbound notifications
pub mod notice;

/// Candidate map catalog and loading
pub mod catalog;

/// Per-session map exclusions
pub mod exclusion;

/// Nomination registry
pub mod nominations;

/// Rock-the-vote and vote-extend
pub mod threshold;

/// Ballot construction and tally
pub mod ballot;

/// Session lifecycle controller
pub mod lifecycle;

// === Public API Re-exports ===

pub use ballot::{Ballot, BallotOption, BallotOutcome, BallotParams, BallotResult, OptionCount};
pub use catalog::{load_catalog, Catalog, FallbackMapSource};
pub use config::{
    BallotConfig, CatalogConfig, MapVoteConfig, NominationConfig, ThresholdConfig,
    VoteExtendConfig,
};
pub use effects::{
    EngineEffects, MapSourceEffects, NoticeEffects, RandomEffects, SchedulerEffects,
    ServerEffects, SessionToken, TimerEvent, TimerHandle, TimerSlot,
};
pub use errors::{CatalogError, ConfigError, MapVoteError, Result, UnavailableReason};
pub use exclusion::ExclusionSet;
pub use lifecycle::{
    BallotStatus, EngineStatus, MapVoteController, SessionPhase, SessionState, ThresholdStatus,
};
pub use nominations::{NominationMenu, NominationOutcome, NominationRegistry, TierGroup};
pub use notice::{BallotTrigger, ExtendSource, Notice, RemovalReason};
pub use threshold::{votes_needed, ThresholdKind, ThresholdPhase, ThresholdProgress, ThresholdVote};
pub use types::{MapId, MapMeta, Nomination, PlayerRef, TierRange};
