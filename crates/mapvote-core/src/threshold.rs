//! Threshold vote state machine
//!
//! Collects opt-in votes until the participants reach a fraction of the
//! connected players. Rock-the-vote and vote-extend are both instances.
//!
//! ```text
//! Idle ──cast──▶ Active ──(participants ≥ needed)──▶ Passed
//!                  │
//!                  └──expire──▶ Expired ──cast──▶ Active (new episode)
//! ```
//!
//! The pass condition is re-evaluated on every cast and on every disconnect:
//! a shrinking roster lowers the number of votes needed and can pass the vote
//! without a new cast. Re-evaluation only happens while `Active`.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{MapVoteError, Result};
use crate::types::PlayerRef;

/// Feature a threshold vote belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// Rock the vote: opens the ballot early
    RockTheVote,
    /// Vote extend: extends the current map
    VoteExtend,
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdKind::RockTheVote => f.write_str("rock-the-vote"),
            ThresholdKind::VoteExtend => f.write_str("vote-extend"),
        }
    }
}

/// Threshold vote phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdPhase {
    /// No episode running
    #[default]
    Idle,
    /// Collecting votes
    Active,
    /// Threshold reached; consumed until reset
    Passed,
    /// Episode timed out before passing
    Expired,
}

/// Progress report after a cast or recount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdProgress {
    /// Feature
    pub kind: ThresholdKind,
    /// Current participant count
    pub votes: usize,
    /// Participants needed to pass
    pub needed: usize,
    /// This cast started a new episode
    pub started: bool,
    /// The vote passed with this update
    pub passed: bool,
}

/// Slack absorbing binary rounding of `connected * percentage`
const PRODUCT_TOLERANCE: f64 = 1e-9;

/// Votes needed for `connected` players at `percentage`: `max(1, ceil(connected * percentage))`.
///
/// Products that are whole numbers in decimal (`100 * 0.14`) stay whole.
pub fn votes_needed(connected: usize, percentage: f64) -> usize {
    let needed = (connected as f64 * percentage - PRODUCT_TOLERANCE).ceil();
    (needed as usize).max(1)
}

/// One threshold vote instance.
#[derive(Debug, Clone)]
pub struct ThresholdVote {
    kind: ThresholdKind,
    percentage: f64,
    min_players: usize,
    phase: ThresholdPhase,
    participants: BTreeSet<PlayerRef>,
    started_at: Option<Duration>,
}

impl ThresholdVote {
    /// Idle vote
    pub fn new(kind: ThresholdKind, percentage: f64, min_players: usize) -> Self {
        Self {
            kind,
            percentage,
            min_players,
            phase: ThresholdPhase::Idle,
            participants: BTreeSet::new(),
            started_at: None,
        }
    }

    /// Feature
    pub fn kind(&self) -> ThresholdKind {
        self.kind
    }

    /// Current phase
    pub fn phase(&self) -> ThresholdPhase {
        self.phase
    }

    /// Whether an episode is collecting votes
    pub fn is_active(&self) -> bool {
        self.phase == ThresholdPhase::Active
    }

    /// Whether the vote passed and has not been reset
    pub fn is_passed(&self) -> bool {
        self.phase == ThresholdPhase::Passed
    }

    /// Current participants
    pub fn participants(&self) -> &BTreeSet<PlayerRef> {
        &self.participants
    }

    /// Game time at which the current episode started
    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    /// Votes needed with `connected` players
    pub fn needed(&self, connected: usize) -> usize {
        votes_needed(connected, self.percentage)
    }

    /// Record `player`'s vote, starting an episode if none is active.
    ///
    /// `now` is the game time, stored as the episode start.
    pub fn cast(&mut self, player: PlayerRef, connected: usize, now: Duration) -> Result<ThresholdProgress> {
        match self.phase {
            ThresholdPhase::Passed => {
                if self.participants.contains(&player) {
                    return Err(MapVoteError::AlreadyVoted);
                }
                return Err(MapVoteError::VoteNotActive);
            }
            ThresholdPhase::Active => {
                if self.participants.contains(&player) {
                    return Err(MapVoteError::AlreadyVoted);
                }
            }
            ThresholdPhase::Idle | ThresholdPhase::Expired => {
                if connected < self.min_players {
                    return Err(MapVoteError::NotEnoughPlayers {
                        required: self.min_players,
                        connected,
                    });
                }
            }
        }

        let started = !self.is_active();
        if started {
            self.phase = ThresholdPhase::Active;
            self.participants.clear();
            self.started_at = Some(now);
            tracing::debug!(kind = %self.kind, player = %player, "Threshold vote started");
        }

        self.participants.insert(player);
        let mut progress = self.evaluate(connected);
        progress.started = started;
        Ok(progress)
    }

    /// Forget a departed player and re-check the pass condition.
    ///
    /// Returns progress only while an episode is active.
    pub fn on_disconnect(&mut self, player: PlayerRef, connected: usize) -> Option<ThresholdProgress> {
        let removed = self.participants.remove(&player);
        if !self.is_active() {
            return None;
        }
        let progress = self.evaluate(connected);
        if removed || progress.passed {
            Some(progress)
        } else {
            None
        }
    }

    /// Close an active episode that did not pass.
    ///
    /// Returns the final counts, or `None` if no episode was active.
    pub fn expire(&mut self, connected: usize) -> Option<ThresholdProgress> {
        if !self.is_active() {
            return None;
        }
        self.phase = ThresholdPhase::Expired;
        let progress = ThresholdProgress {
            kind: self.kind,
            votes: self.participants.len(),
            needed: self.needed(connected),
            started: false,
            passed: false,
        };
        self.participants.clear();
        tracing::debug!(
            kind = %self.kind,
            votes = progress.votes,
            needed = progress.needed,
            "Threshold vote expired"
        );
        Some(progress)
    }

    /// Return to `Idle`, dropping any participants
    pub fn reset(&mut self) {
        self.phase = ThresholdPhase::Idle;
        self.participants.clear();
        self.started_at = None;
    }

    /// Progress snapshot without changing state
    pub fn progress(&self, connected: usize) -> ThresholdProgress {
        ThresholdProgress {
            kind: self.kind,
            votes: self.participants.len(),
            needed: self.needed(connected),
            started: false,
            passed: self.is_passed(),
        }
    }

    fn evaluate(&mut self, connected: usize) -> ThresholdProgress {
        let votes = self.participants.len();
        let needed = self.needed(connected);
        let passed = votes >= needed;
        if passed {
            self.phase = ThresholdPhase::Passed;
            tracing::info!(kind = %self.kind, votes, needed, "Threshold vote passed");
        }
        ThresholdProgress {
            kind: self.kind,
            votes,
            needed,
            started: false,
            passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: Duration = Duration::from_secs(120);

    fn rtv() -> ThresholdVote {
        ThresholdVote::new(ThresholdKind::RockTheVote, 0.6, 2)
    }

    #[test]
    fn test_votes_needed_examples() {
        assert_eq!(votes_needed(5, 0.6), 3);
        assert_eq!(votes_needed(4, 0.6), 3);
        assert_eq!(votes_needed(3, 0.6), 2);
        assert_eq!(votes_needed(0, 0.6), 1);
        assert_eq!(votes_needed(1, 0.01), 1);
    }

    #[test]
    fn test_votes_needed_exact_decimal_products() {
        assert_eq!(votes_needed(100, 0.14), 14);
        assert_eq!(votes_needed(25, 0.28), 7);
        assert_eq!(votes_needed(50, 0.56), 28);
        assert_eq!(votes_needed(10, 0.7), 7);
        assert_eq!(votes_needed(101, 0.14), 15);
    }

    #[test]
    fn test_passes_after_enough_distinct_casts() {
        let mut vote = rtv();
        let first = vote.cast(PlayerRef(1), 5, NOW).unwrap();
        assert!(first.started);
        assert_eq!((first.votes, first.needed), (1, 3));
        assert_eq!(vote.started_at(), Some(NOW));

        assert!(!vote.cast(PlayerRef(2), 5, NOW).unwrap().passed);
        let third = vote.cast(PlayerRef(3), 5, NOW).unwrap();
        assert!(third.passed);
        assert_eq!(vote.phase(), ThresholdPhase::Passed);

        assert_eq!(vote.cast(PlayerRef(4), 5, NOW), Err(MapVoteError::VoteNotActive));
        assert_eq!(vote.cast(PlayerRef(1), 5, NOW), Err(MapVoteError::AlreadyVoted));
    }

    #[test]
    fn test_duplicate_cast_rejected() {
        let mut vote = rtv();
        vote.cast(PlayerRef(1), 5, NOW).unwrap();
        assert_eq!(vote.cast(PlayerRef(1), 5, NOW), Err(MapVoteError::AlreadyVoted));
        assert_eq!(vote.participants().len(), 1);
    }

    #[test]
    fn test_min_players_only_gates_start() {
        let mut vote = rtv();
        assert_eq!(
            vote.cast(PlayerRef(1), 1, NOW),
            Err(MapVoteError::NotEnoughPlayers {
                required: 2,
                connected: 1
            })
        );
        assert_eq!(vote.phase(), ThresholdPhase::Idle);

        vote.cast(PlayerRef(1), 4, NOW).unwrap();
        // Roster shrank below the minimum mid-episode; casting still works
        assert!(vote.cast(PlayerRef(2), 1, NOW).unwrap().passed);
    }

    #[test]
    fn test_disconnect_recount_passes_vote() {
        let mut vote = rtv();
        vote.cast(PlayerRef(1), 4, NOW).unwrap();
        vote.cast(PlayerRef(2), 4, NOW).unwrap();
        assert!(vote.is_active());

        // A non-participant leaves: needed drops from 3 to 2
        let progress = vote.on_disconnect(PlayerRef(9), 3).unwrap();
        assert!(progress.passed);
        assert_eq!((progress.votes, progress.needed), (2, 2));
        assert!(vote.is_passed());
    }

    #[test]
    fn test_disconnect_of_participant_removes_vote() {
        let mut vote = rtv();
        vote.cast(PlayerRef(1), 5, NOW).unwrap();
        vote.cast(PlayerRef(2), 5, NOW).unwrap();

        let progress = vote.on_disconnect(PlayerRef(1), 4).unwrap();
        assert!(!progress.passed);
        assert_eq!((progress.votes, progress.needed), (1, 3));
    }

    #[test]
    fn test_disconnect_after_expiry_does_not_pass() {
        let mut vote = rtv();
        vote.cast(PlayerRef(1), 4, NOW).unwrap();
        vote.cast(PlayerRef(2), 4, NOW).unwrap();

        let expired = vote.expire(4).unwrap();
        assert_eq!((expired.votes, expired.needed), (2, 3));
        assert_eq!(vote.phase(), ThresholdPhase::Expired);

        assert!(vote.on_disconnect(PlayerRef(9), 2).is_none());
        assert_eq!(vote.phase(), ThresholdPhase::Expired);
    }

    #[test]
    fn test_expired_vote_starts_new_episode() {
        let mut vote = rtv();
        vote.cast(PlayerRef(1), 5, NOW).unwrap();
        vote.expire(5);

        let progress = vote.cast(PlayerRef(1), 5, NOW + Duration::from_secs(60)).unwrap();
        assert!(progress.started);
        assert_eq!(progress.votes, 1);
        assert_eq!(vote.started_at(), Some(NOW + Duration::from_secs(60)));
    }

    #[test]
    fn test_expire_is_noop_once_passed() {
        let mut vote = ThresholdVote::new(ThresholdKind::VoteExtend, 0.5, 1);
        assert!(vote.cast(PlayerRef(1), 2, NOW).unwrap().passed);
        assert!(vote.expire(2).is_none());
        assert!(vote.is_passed());

        vote.reset();
        assert_eq!(vote.phase(), ThresholdPhase::Idle);
        assert!(vote.participants().is_empty());
    }

    proptest! {
        #[test]
        fn votes_needed_is_bounded(connected in 0usize..256, percentage in 0.01f64..=1.0) {
            let needed = votes_needed(connected, percentage);
            prop_assert!(needed >= 1);
            prop_assert!(needed <= connected.max(1));
        }

        #[test]
        fn votes_needed_is_monotone(connected in 0usize..255, percentage in 0.01f64..=1.0) {
            prop_assert!(votes_needed(connected, percentage) <= votes_needed(connected + 1, percentage));
        }

        #[test]
        fn passes_exactly_at_threshold(connected in 2usize..64, percentage in 0.05f64..=1.0) {
            let mut vote = ThresholdVote::new(ThresholdKind::RockTheVote, percentage, 1);
            let needed = votes_needed(connected, percentage);
            for slot in 0..needed {
                let progress = vote.cast(PlayerRef(slot as u32), connected, NOW).unwrap();
                prop_assert_eq!(progress.passed, slot + 1 == needed);
            }
            prop_assert!(vote.is_passed());
        }
    }
}
