//! Ballot: the timed, multi-option plurality vote that picks the next map.
//!
//! ## Construction
//!
//! 1. Nominated maps in nomination order, truncated to the slot count
//! 2. Remaining slots filled uniformly at random, without replacement, from
//!    catalog maps that are neither on the ballot nor excluded
//! 3. Optionally the extend option, always last and outside the map slots
//!
//! The option list is frozen once the ballot opens.
//!
//! ## Tally
//!
//! Plurality with ties broken by option order: among the options sharing the
//! highest count the earliest one wins. A ballot without votes yields
//! [`BallotOutcome::NoChange`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::effects::RandomEffects;
use crate::errors::{MapVoteError, Result};
use crate::exclusion::ExclusionSet;
use crate::types::{MapId, Nomination, PlayerRef};

/// One choice on a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotOption {
    /// Change to this map
    Map(MapId),
    /// Keep playing the current map
    Extend,
}

impl fmt::Display for BallotOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallotOption::Map(map) => write!(f, "{map}"),
            BallotOption::Extend => f.write_str("Extend Current Map"),
        }
    }
}

/// Result of a closed ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotOutcome {
    /// Nobody voted; the current map stays in force
    NoChange,
    /// The extend option won
    ExtendMap,
    /// A map won
    ChangeTo(MapId),
}

/// Vote total for one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCount {
    /// The option
    pub option: BallotOption,
    /// Votes received
    pub votes: usize,
}

/// Tally of a closed ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotResult {
    /// Winning outcome
    pub outcome: BallotOutcome,
    /// Votes for the winner (0 for `NoChange`)
    pub winning_votes: usize,
    /// Totals in option order
    pub counts: Vec<OptionCount>,
}

/// Inputs for building a ballot.
#[derive(Debug, Clone, Copy)]
pub struct BallotParams<'a> {
    /// Standing nominations in nomination order
    pub nominations: &'a [Nomination],
    /// Candidate maps
    pub catalog: &'a Catalog,
    /// Maps never drawn for the random fill
    pub excluded: &'a ExclusionSet,
    /// Map slots on the ballot
    pub slot_count: usize,
    /// Append the extend option
    pub include_extend: bool,
}

/// An open or closed ballot.
#[derive(Debug, Clone)]
pub struct Ballot {
    options: Vec<BallotOption>,
    votes: BTreeMap<PlayerRef, usize>,
    opens_at: Duration,
    closes_at: Duration,
    open: bool,
}

impl Ballot {
    /// Build and open a ballot at game time `now`.
    ///
    /// Fails with [`MapVoteError::NoEligibleMaps`] if no map can be offered.
    pub fn open<R>(params: BallotParams<'_>, random: &R, now: Duration, duration: Duration) -> Result<Self>
    where
        R: RandomEffects + ?Sized,
    {
        let mut maps: Vec<MapId> = Vec::with_capacity(params.slot_count);
        for nomination in params.nominations {
            if maps.len() == params.slot_count {
                break;
            }
            if !maps.contains(&nomination.map) {
                maps.push(nomination.map.clone());
            }
        }

        if maps.len() < params.slot_count {
            let mut pool: Vec<&MapId> = params
                .catalog
                .ids()
                .filter(|id| !maps.contains(id) && !params.excluded.contains(id))
                .collect();
            while maps.len() < params.slot_count && !pool.is_empty() {
                let index = random.random_index(pool.len());
                maps.push(pool.remove(index).clone());
            }
        }

        if maps.is_empty() {
            return Err(MapVoteError::NoEligibleMaps);
        }

        let mut options: Vec<BallotOption> = maps.into_iter().map(BallotOption::Map).collect();
        if params.include_extend {
            options.push(BallotOption::Extend);
        }

        Ok(Self {
            options,
            votes: BTreeMap::new(),
            opens_at: now,
            closes_at: now + duration,
            open: true,
        })
    }

    /// Frozen options in presentation order
    pub fn options(&self) -> &[BallotOption] {
        &self.options
    }

    /// Whether votes are still accepted
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Game time the ballot opened
    pub fn opens_at(&self) -> Duration {
        self.opens_at
    }

    /// Game time the ballot is due to close
    pub fn closes_at(&self) -> Duration {
        self.closes_at
    }

    /// Number of players who voted
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Option `player` currently votes for
    pub fn vote_of(&self, player: PlayerRef) -> Option<&BallotOption> {
        self.votes.get(&player).map(|&index| &self.options[index])
    }

    /// Record `player`'s choice, replacing any earlier vote.
    pub fn vote(&mut self, player: PlayerRef, option: &BallotOption) -> Result<()> {
        if !self.open {
            return Err(MapVoteError::NotOpen);
        }
        let index = self
            .options
            .iter()
            .position(|candidate| candidate == option)
            .ok_or_else(|| MapVoteError::InvalidOption {
                option: option.to_string(),
            })?;
        self.votes.insert(player, index);
        Ok(())
    }

    /// Record a vote by option position (menu selection).
    pub fn vote_index(&mut self, player: PlayerRef, index: usize) -> Result<BallotOption> {
        let option = self
            .options
            .get(index)
            .cloned()
            .ok_or_else(|| MapVoteError::InvalidOption {
                option: format!("#{}", index.saturating_add(1)),
            })?;
        self.vote(player, &option)?;
        Ok(option)
    }

    /// Current totals in option order
    pub fn counts(&self) -> Vec<OptionCount> {
        let mut totals = vec![0usize; self.options.len()];
        for &index in self.votes.values() {
            totals[index] += 1;
        }
        self.options
            .iter()
            .cloned()
            .zip(totals)
            .map(|(option, votes)| OptionCount { option, votes })
            .collect()
    }

    /// Close the ballot and count the votes.
    pub fn tally(&mut self) -> BallotResult {
        self.open = false;
        let counts = self.counts();

        let mut winner: Option<&OptionCount> = None;
        for count in &counts {
            // Strictly greater keeps the earliest option on ties
            if count.votes > winner.map_or(0, |w| w.votes) {
                winner = Some(count);
            }
        }

        let (outcome, winning_votes) = match winner {
            None => (BallotOutcome::NoChange, 0),
            Some(OptionCount {
                option: BallotOption::Extend,
                votes,
            }) => (BallotOutcome::ExtendMap, *votes),
            Some(OptionCount {
                option: BallotOption::Map(map),
                votes,
            }) => (BallotOutcome::ChangeTo(map.clone()), *votes),
        };

        BallotResult {
            outcome,
            winning_votes,
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MapMeta;
    use proptest::prelude::*;
    use std::cell::Cell;

    /// Always draws the same position, or cycles through a script.
    struct ScriptedRandom {
        picks: Vec<usize>,
        next: Cell<usize>,
    }

    impl ScriptedRandom {
        fn new(picks: Vec<usize>) -> Self {
            Self {
                picks,
                next: Cell::new(0),
            }
        }
    }

    impl RandomEffects for ScriptedRandom {
        fn random_index(&self, bound: usize) -> usize {
            let i = self.next.get();
            self.next.set(i + 1);
            self.picks.get(i).copied().unwrap_or(0) % bound
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_names(["surf_a", "surf_b", "surf_c", "surf_d", "surf_e"])
    }

    fn nomination(map: &str, owner: u32) -> Nomination {
        Nomination {
            map: MapId::new(map),
            owner: PlayerRef(owner),
        }
    }

    fn open(params: BallotParams<'_>, random: &ScriptedRandom) -> Ballot {
        Ballot::open(params, random, Duration::from_secs(100), Duration::from_secs(30)).unwrap()
    }

    fn map_names(ballot: &Ballot) -> Vec<String> {
        ballot.options().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_nominations_first_then_random_fill() {
        let catalog = catalog();
        let excluded = ExclusionSet::new(MapId::new("surf_e"), Vec::new());
        let nominations = vec![nomination("surf_c", 1)];
        let random = ScriptedRandom::new(vec![1, 0]);

        let ballot = open(
            BallotParams {
                nominations: &nominations,
                catalog: &catalog,
                excluded: &excluded,
                slot_count: 3,
                include_extend: true,
            },
            &random,
        );
        // pool [a, b, d] -> pick 1 = b, pool [a, d] -> pick 0 = a
        assert_eq!(
            map_names(&ballot),
            vec!["surf_c", "surf_b", "surf_a", "Extend Current Map"]
        );
        assert_eq!(ballot.closes_at(), Duration::from_secs(130));
    }

    #[test]
    fn test_nominations_truncated_to_slots() {
        let catalog = catalog();
        let excluded = ExclusionSet::default();
        let nominations = vec![nomination("surf_d", 1), nomination("surf_a", 2), nomination("surf_b", 3)];
        let ballot = open(
            BallotParams {
                nominations: &nominations,
                catalog: &catalog,
                excluded: &excluded,
                slot_count: 2,
                include_extend: false,
            },
            &ScriptedRandom::new(vec![]),
        );
        assert_eq!(map_names(&ballot), vec!["surf_d", "surf_a"]);
    }

    #[test]
    fn test_fill_stops_when_pool_exhausted() {
        let catalog = Catalog::from_names(["surf_a", "surf_b"]);
        let excluded = ExclusionSet::new(MapId::new("surf_a"), Vec::new());
        let ballot = open(
            BallotParams {
                nominations: &[],
                catalog: &catalog,
                excluded: &excluded,
                slot_count: 5,
                include_extend: false,
            },
            &ScriptedRandom::new(vec![]),
        );
        assert_eq!(map_names(&ballot), vec!["surf_b"]);
    }

    #[test]
    fn test_no_eligible_maps() {
        let catalog = Catalog::from_names(["surf_a"]);
        let excluded = ExclusionSet::new(MapId::new("surf_a"), Vec::new());
        let result = Ballot::open(
            BallotParams {
                nominations: &[],
                catalog: &catalog,
                excluded: &excluded,
                slot_count: 5,
                include_extend: true,
            },
            &ScriptedRandom::new(vec![]),
            Duration::ZERO,
            Duration::from_secs(30),
        );
        assert!(matches!(result, Err(MapVoteError::NoEligibleMaps)));
    }

    fn two_map_ballot() -> Ballot {
        let catalog = Catalog::new(vec![MapMeta::new("map_a"), MapMeta::new("map_b")]);
        let nominations = vec![nomination("map_a", 1), nomination("map_b", 2)];
        open(
            BallotParams {
                nominations: &nominations,
                catalog: &catalog,
                excluded: &ExclusionSet::default(),
                slot_count: 2,
                include_extend: true,
            },
            &ScriptedRandom::new(vec![]),
        )
    }

    #[test]
    fn test_tie_goes_to_first_option() {
        let mut ballot = two_map_ballot();
        let a = BallotOption::Map("map_a".into());
        let b = BallotOption::Map("map_b".into());
        ballot.vote(PlayerRef(1), &b).unwrap();
        ballot.vote(PlayerRef(2), &a).unwrap();
        ballot.vote(PlayerRef(3), &b).unwrap();
        ballot.vote(PlayerRef(4), &a).unwrap();

        let result = ballot.tally();
        assert_eq!(result.outcome, BallotOutcome::ChangeTo("map_a".into()));
        assert_eq!(result.winning_votes, 2);
        assert!(!ballot.is_open());
    }

    #[test]
    fn test_last_vote_counts() {
        let mut ballot = two_map_ballot();
        ballot.vote(PlayerRef(1), &BallotOption::Map("map_a".into())).unwrap();
        ballot.vote(PlayerRef(1), &BallotOption::Extend).unwrap();
        assert_eq!(ballot.vote_count(), 1);
        assert_eq!(ballot.vote_of(PlayerRef(1)), Some(&BallotOption::Extend));
        assert_eq!(ballot.tally().outcome, BallotOutcome::ExtendMap);
    }

    #[test]
    fn test_vote_rejections() {
        let mut ballot = two_map_ballot();
        assert!(matches!(
            ballot.vote(PlayerRef(1), &BallotOption::Map("map_z".into())),
            Err(MapVoteError::InvalidOption { .. })
        ));
        assert!(matches!(
            ballot.vote_index(PlayerRef(1), 7),
            Err(MapVoteError::InvalidOption { .. })
        ));
        assert_eq!(ballot.vote_index(PlayerRef(1), 2).unwrap(), BallotOption::Extend);

        ballot.tally();
        assert_eq!(
            ballot.vote(PlayerRef(2), &BallotOption::Extend),
            Err(MapVoteError::NotOpen)
        );
    }

    #[test]
    fn test_out_of_range_index_is_invalid_option() {
        let mut ballot = two_map_ballot();
        assert_eq!(
            ballot.vote_index(PlayerRef(1), usize::MAX),
            Err(MapVoteError::InvalidOption {
                option: format!("#{}", usize::MAX),
            })
        );
        assert_eq!(ballot.vote_count(), 0);
    }

    #[test]
    fn test_empty_ballot_is_no_change() {
        let mut ballot = two_map_ballot();
        let result = ballot.tally();
        assert_eq!(result.outcome, BallotOutcome::NoChange);
        assert_eq!(result.winning_votes, 0);
        assert!(result.counts.iter().all(|c| c.votes == 0));
    }

    proptest! {
        #[test]
        fn options_unique_and_within_slots(
            slot_count in 1usize..8,
            picks in proptest::collection::vec(0usize..32, 0..8),
            nominated in proptest::collection::vec(0usize..6, 0..6),
            include_extend in any::<bool>(),
        ) {
            let names = ["m0", "m1", "m2", "m3", "m4", "m5"];
            let catalog = Catalog::from_names(names);
            let excluded = ExclusionSet::new(MapId::new("m5"), Vec::new());
            let nominations: Vec<Nomination> = nominated
                .iter()
                .enumerate()
                .map(|(owner, &i)| nomination(names[i], owner as u32))
                .collect();
            let random = ScriptedRandom::new(picks);

            let ballot = open(
                BallotParams {
                    nominations: &nominations,
                    catalog: &catalog,
                    excluded: &excluded,
                    slot_count,
                    include_extend,
                },
                &random,
            );

            let maps: Vec<&MapId> = ballot
                .options()
                .iter()
                .filter_map(|o| match o {
                    BallotOption::Map(m) => Some(m),
                    BallotOption::Extend => None,
                })
                .collect();
            prop_assert!(maps.len() <= slot_count);
            let mut deduped = maps.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), maps.len());
            let extend_count = ballot.options().iter().filter(|o| **o == BallotOption::Extend).count();
            prop_assert_eq!(extend_count, usize::from(include_extend));
            if include_extend {
                prop_assert_eq!(ballot.options().last(), Some(&BallotOption::Extend));
            }
        }
    }
}
