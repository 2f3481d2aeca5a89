//! Outbound notifications.
//!
//! Content only; the host decides how (chat, menu, console) to render them.

use serde::{Deserialize, Serialize};

use crate::ballot::{BallotOption, BallotOutcome, OptionCount};
use crate::threshold::{ThresholdKind, ThresholdProgress};
use crate::types::{MapId, PlayerRef};

/// Why the engine opened a ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotTrigger {
    /// Remaining map time crossed the start threshold
    TimeLimit,
    /// Rock-the-vote passed
    RockTheVote,
    /// The host asked for a ballot directly
    Forced,
}

/// Why a nomination disappeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    /// The owner left the server
    Disconnected,
    /// The owner withdrew it
    Withdrawn,
}

/// A notification for the host to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A new nomination was accepted
    Nominated {
        /// Nominating player
        player: PlayerRef,
        /// Nominated map
        map: MapId,
    },
    /// A player replaced their nomination
    NominationChanged {
        /// Nominating player
        player: PlayerRef,
        /// Previous map
        from: MapId,
        /// New map
        to: MapId,
    },
    /// A nomination was dropped
    NominationRemoved {
        /// Former owner
        player: PlayerRef,
        /// Freed map
        map: MapId,
        /// Cause
        reason: RemovalReason,
    },
    /// A threshold vote gained a participant, lost one, or passed (`X/Y`)
    ThresholdProgress(ThresholdProgress),
    /// A threshold vote episode ran out of time
    ThresholdExpired {
        /// Feature
        kind: ThresholdKind,
        /// Final participant count
        votes: usize,
        /// Votes that were needed
        needed: usize,
    },
    /// A ballot opened
    BallotOpened {
        /// What opened it
        trigger: BallotTrigger,
        /// Frozen option list
        options: Vec<BallotOption>,
        /// Ballot window in seconds
        duration_secs: u64,
    },
    /// A player's ballot vote was recorded
    BallotVoteRecorded {
        /// Voter
        player: PlayerRef,
        /// Chosen option
        option: BallotOption,
    },
    /// A ballot closed
    BallotResult {
        /// Winning outcome
        outcome: BallotOutcome,
        /// Votes for the winning option
        winning_votes: usize,
        /// Per-option totals in option order
        counts: Vec<OptionCount>,
    },
    /// The map time limit was raised
    MapExtended {
        /// Minutes added
        minutes: u32,
        /// Feature that extended it
        source: ExtendSource,
    },
    /// A level change was scheduled
    LevelChangeScheduled {
        /// Next map
        map: MapId,
        /// Grace delay in seconds
        delay_secs: u64,
    },
    /// A ballot was due but no map was eligible
    NoEligibleMaps,
}

/// Which feature extended the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendSource {
    /// The ballot's extend option won
    Ballot,
    /// A vote-extend threshold vote passed
    VoteExtend,
}
