//! Per-map session state.

use serde::{Deserialize, Serialize};

use crate::ballot::{BallotOutcome, BallotResult};
use crate::effects::SessionToken;
use crate::exclusion::ExclusionSet;
use crate::types::MapId;

/// Lifecycle phase of a map session.
///
/// ```text
/// Inactive ──start_map──▶ WaitingToPoll ──trigger──▶ BallotOpen ──close──▶ Resolved
///                               ▲                          │
///                               └──────── ExtendMap ───────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No map session is running
    #[default]
    Inactive,
    /// Waiting for the time threshold or rock-the-vote
    WaitingToPoll,
    /// A ballot is collecting votes
    BallotOpen,
    /// The session's outcome is decided; no further ballot
    Resolved,
}

/// State owned by the controller for one map session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Generation stamped on every timer of this session
    pub token: SessionToken,
    /// Map being played
    pub map: Option<MapId>,
    /// Lifecycle phase
    pub phase: SessionPhase,
    /// Ballot extensions applied this session
    pub extends: u32,
    /// A vote-extend passed this session
    pub vote_extended: bool,
    /// Maps ineligible this session
    pub exclusions: ExclusionSet,
    /// Map chosen by the last ballot
    pub next_map: Option<MapId>,
    /// Tally of the last closed ballot
    pub last_result: Option<BallotResult>,
}

impl SessionState {
    /// Fresh state for a session on `map`
    pub fn new(token: SessionToken, map: MapId, exclusions: ExclusionSet) -> Self {
        Self {
            token,
            map: Some(map),
            phase: SessionPhase::WaitingToPoll,
            extends: 0,
            vote_extended: false,
            exclusions,
            next_map: None,
            last_result: None,
        }
    }

    /// Outcome of the last closed ballot
    pub fn last_outcome(&self) -> Option<&BallotOutcome> {
        self.last_result.as_ref().map(|result| &result.outcome)
    }
}
