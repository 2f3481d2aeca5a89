//! Read-only engine snapshots for display and diagnostics.

use serde::{Deserialize, Serialize};

use super::session::SessionPhase;
use crate::ballot::{Ballot, BallotOption, BallotResult, OptionCount};
use crate::effects::SessionToken;
use crate::threshold::{ThresholdPhase, ThresholdProgress, ThresholdVote};
use crate::types::{MapId, Nomination};

/// State of one threshold vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdStatus {
    /// Phase of the vote
    pub phase: ThresholdPhase,
    /// Current `X/Y` counts
    pub progress: ThresholdProgress,
}

impl ThresholdStatus {
    pub(crate) fn of(vote: &ThresholdVote, connected: usize) -> Self {
        Self {
            phase: vote.phase(),
            progress: vote.progress(connected),
        }
    }
}

/// State of the open ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotStatus {
    /// Options in menu order
    pub options: Vec<BallotOption>,
    /// Running totals in option order
    pub counts: Vec<OptionCount>,
    /// Players who voted
    pub voters: usize,
    /// Game time the ballot closes at, in seconds
    pub closes_at_secs: u64,
}

impl BallotStatus {
    pub(crate) fn of(ballot: &Ballot) -> Self {
        Self {
            options: ballot.options().to_vec(),
            counts: ballot.counts(),
            voters: ballot.vote_count(),
            closes_at_secs: ballot.closes_at().as_secs(),
        }
    }
}

/// Snapshot returned by [`MapVoteController::status`](super::MapVoteController::status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Session generation
    pub session: SessionToken,
    /// Lifecycle phase
    pub phase: SessionPhase,
    /// Map being played
    pub current_map: Option<MapId>,
    /// Connected players at snapshot time
    pub connected: usize,
    /// Ballot extensions applied this session
    pub extends: u32,
    /// Cap on ballot extensions
    pub max_extends: u32,
    /// Whether vote-extend already passed this session
    pub vote_extended: bool,
    /// Map chosen by the ballot
    pub next_map: Option<MapId>,
    /// Standing nominations in nomination order
    pub nominations: Vec<Nomination>,
    /// Rock-the-vote state
    pub rock_the_vote: ThresholdStatus,
    /// Vote-extend state
    pub vote_extend: ThresholdStatus,
    /// Open ballot, if any
    pub ballot: Option<BallotStatus>,
    /// Tally of the last closed ballot
    pub last_result: Option<BallotResult>,
}
