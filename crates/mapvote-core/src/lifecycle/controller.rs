//! Map session controller.
//!
//! Owns one nomination registry, the two threshold votes and at most one open
//! ballot, and drives them from host events and timer callbacks. All methods
//! take `&mut self`: the host serializes events (see `mapvote-effects`'s
//! runtime) and the controller never blocks.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::session::{SessionPhase, SessionState};
use super::status::{BallotStatus, EngineStatus, ThresholdStatus};
use crate::ballot::{Ballot, BallotOption, BallotOutcome, BallotParams, BallotResult};
use crate::catalog::Catalog;
use crate::config::MapVoteConfig;
use crate::effects::{
    EngineEffects, NoticeEffects, SchedulerEffects, ServerEffects, TimerEvent, TimerHandle,
    TimerSlot,
};
use crate::errors::{MapVoteError, Result};
use crate::exclusion::ExclusionSet;
use crate::nominations::{NominationMenu, NominationOutcome, NominationRegistry};
use crate::notice::{BallotTrigger, ExtendSource, Notice, RemovalReason};
use crate::threshold::{ThresholdKind, ThresholdProgress, ThresholdVote};
use crate::types::{MapId, MapMeta, PlayerRef};

/// Map session controller.
#[derive(Debug)]
pub struct MapVoteController {
    config: MapVoteConfig,
    catalog: Catalog,
    session: SessionState,
    nominations: NominationRegistry,
    rock_the_vote: ThresholdVote,
    vote_extend: ThresholdVote,
    ballot: Option<Ballot>,
    timers: BTreeMap<TimerSlot, TimerHandle>,
    history: VecDeque<MapId>,
}

impl MapVoteController {
    /// Controller with an empty catalog; call [`Self::replace_catalog`] before the first map
    pub fn new(config: MapVoteConfig) -> Self {
        Self::with_catalog(config, Catalog::default())
    }

    /// Controller over an already loaded catalog
    pub fn with_catalog(config: MapVoteConfig, catalog: Catalog) -> Self {
        let nominations = NominationRegistry::new(
            config.nominations.max_nominations,
            config.nominations.exclude_current,
        );
        let rock_the_vote = ThresholdVote::new(
            ThresholdKind::RockTheVote,
            config.rock_the_vote.percentage,
            config.rock_the_vote.min_players,
        );
        let vote_extend = ThresholdVote::new(
            ThresholdKind::VoteExtend,
            config.vote_extend.percentage,
            config.vote_extend.min_players,
        );
        Self {
            config,
            catalog,
            session: SessionState::default(),
            nominations,
            rock_the_vote,
            vote_extend,
            ballot: None,
            timers: BTreeMap::new(),
            history: VecDeque::new(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &MapVoteConfig {
        &self.config
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Current session state
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    /// Standing nominations
    pub fn nominations(&self) -> &NominationRegistry {
        &self.nominations
    }

    /// Open ballot, if any
    pub fn ballot(&self) -> Option<&Ballot> {
        self.ballot.as_ref()
    }

    /// Map chosen by this session's ballot, once decided
    pub fn next_map(&self) -> Option<&MapId> {
        self.session.next_map.as_ref()
    }

    /// Maps played before the current one, most recent first
    pub fn history(&self) -> impl Iterator<Item = &MapId> {
        self.history.iter()
    }

    /// Swap in a freshly loaded catalog.
    ///
    /// Standing nominations and an open ballot keep their maps; the new catalog
    /// applies to later nominations and ballots.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        info!(maps = catalog.len(), "Catalog replaced");
        self.catalog = catalog;
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Begin a session on the server's current map.
    ///
    /// Cancels every timer of the previous session, resets all per-session
    /// state and starts the repeating poll check.
    pub fn start_map<E: EngineEffects + ?Sized>(&mut self, env: &E) {
        self.cancel_all_timers(env);

        let map = env.current_map();
        if let Some(previous) = self.session.map.take() {
            if previous != map {
                self.history.retain(|played| *played != previous);
                self.history.push_front(previous);
            }
        }
        self.history.truncate(self.config.nominations.exclude_recent_maps);

        let token = self.session.token.next();
        let exclusions = ExclusionSet::new(map.clone(), self.history.iter().cloned());
        self.session = SessionState::new(token, map.clone(), exclusions);
        self.nominations.clear();
        self.rock_the_vote.reset();
        self.vote_extend.reset();
        self.ballot = None;

        let poll_interval = self.config.ballot.poll_interval();
        self.schedule_repeating(env, TimerSlot::PollCheck, poll_interval);

        info!(
            session = %token,
            map = %map,
            recent = self.history.len(),
            "Map session started"
        );
    }

    /// End the current session; every timer it scheduled becomes inert.
    pub fn end_map<S: SchedulerEffects + ?Sized>(&mut self, scheduler: &S) {
        self.cancel_all_timers(scheduler);
        let previous = self.session.token;
        self.session.token = previous.next();
        self.session.phase = SessionPhase::Inactive;
        self.ballot = None;
        self.rock_the_vote.reset();
        self.vote_extend.reset();
        info!(session = %previous, "Map session ended");
    }

    // ------------------------------------------------------------------
    // Nominations
    // ------------------------------------------------------------------

    /// Nominate the map matching `query` for `player`.
    pub fn nominate<N: NoticeEffects + ?Sized>(
        &mut self,
        env: &N,
        player: PlayerRef,
        query: &str,
    ) -> Result<NominationOutcome> {
        let outcome =
            self.nominations
                .nominate(player, query, &self.catalog, &self.session.exclusions)?;

        let notice = match &outcome {
            NominationOutcome::Added { map } => Notice::Nominated {
                player,
                map: map.clone(),
            },
            NominationOutcome::Changed { previous, map } => Notice::NominationChanged {
                player,
                from: previous.clone(),
                to: map.clone(),
            },
        };
        info!(player = %player, map = %outcome.map(), "Map nominated");
        env.notify(notice);
        Ok(outcome)
    }

    /// Withdraw `player`'s nomination, returning the freed map.
    pub fn remove_nomination<N: NoticeEffects + ?Sized>(
        &mut self,
        env: &N,
        player: PlayerRef,
    ) -> Option<MapId> {
        let map = self.nominations.remove(player)?;
        env.notify(Notice::NominationRemoved {
            player,
            map: map.clone(),
            reason: RemovalReason::Withdrawn,
        });
        Some(map)
    }

    /// Maps a player could nominate right now, in catalog order
    pub fn available_maps(&self) -> Vec<&MapMeta> {
        self.nominations
            .available_maps(&self.catalog, &self.session.exclusions)
    }

    /// Nomination menu, grouped by tier when configured
    pub fn nomination_menu(&self) -> NominationMenu {
        self.nominations.menu(
            &self.catalog,
            &self.session.exclusions,
            self.config.nominations.tiered_menu,
        )
    }

    // ------------------------------------------------------------------
    // Threshold votes
    // ------------------------------------------------------------------

    /// Register `player`'s rock-the-vote; opens the ballot immediately on pass.
    pub fn rock_the_vote<E: EngineEffects + ?Sized>(
        &mut self,
        env: &E,
        player: PlayerRef,
    ) -> Result<ThresholdProgress> {
        if !self.config.rock_the_vote.enabled {
            return Err(MapVoteError::Disabled);
        }
        match self.session.phase {
            SessionPhase::Inactive => return Err(MapVoteError::VoteNotActive),
            SessionPhase::BallotOpen => return Err(MapVoteError::VoteInProgress),
            SessionPhase::Resolved => return Err(MapVoteError::AlreadyResolved),
            SessionPhase::WaitingToPoll => {}
        }

        let progress =
            self.rock_the_vote
                .cast(player, env.connected_player_count(), env.game_time())?;
        if progress.started {
            if let Some(duration) = self.config.rock_the_vote.vote_duration() {
                self.schedule_once(
                    env,
                    TimerSlot::ThresholdExpire(ThresholdKind::RockTheVote),
                    duration,
                );
            }
        }

        debug!(
            player = %player,
            votes = progress.votes,
            needed = progress.needed,
            "Rock-the-vote cast"
        );
        env.notify(Notice::ThresholdProgress(progress));

        if progress.passed {
            self.on_rock_the_vote_passed(env);
        }
        Ok(progress)
    }

    /// Register `player`'s vote to extend the current map.
    ///
    /// A new episode may only start within the configured window before the
    /// time limit; a pass raises the time limit once per session.
    pub fn vote_extend<E: EngineEffects + ?Sized>(
        &mut self,
        env: &E,
        player: PlayerRef,
    ) -> Result<ThresholdProgress> {
        if !self.config.vote_extend.enabled {
            return Err(MapVoteError::Disabled);
        }
        if self.session.vote_extended {
            return Err(MapVoteError::AlreadyExtended);
        }
        match self.session.phase {
            SessionPhase::Inactive => return Err(MapVoteError::VoteNotActive),
            SessionPhase::BallotOpen => return Err(MapVoteError::VoteInProgress),
            SessionPhase::Resolved => {
                if let Some(map) = &self.session.next_map {
                    return Err(MapVoteError::LevelChangePending { map: map.clone() });
                }
            }
            SessionPhase::WaitingToPoll => {}
        }

        if !self.vote_extend.is_active() {
            let window = self.config.vote_extend.allow_window();
            match env.remaining_map_time() {
                Some(remaining) if remaining <= window => {}
                _ => {
                    return Err(MapVoteError::ExtendWindowClosed {
                        allowed_minutes: self.config.vote_extend.allow_time_remaining_minutes,
                    })
                }
            }
        }

        let progress =
            self.vote_extend
                .cast(player, env.connected_player_count(), env.game_time())?;
        if progress.started {
            if let Some(duration) = self.config.vote_extend.threshold().vote_duration() {
                self.schedule_once(
                    env,
                    TimerSlot::ThresholdExpire(ThresholdKind::VoteExtend),
                    duration,
                );
            }
        }

        debug!(
            player = %player,
            votes = progress.votes,
            needed = progress.needed,
            "Vote-extend cast"
        );
        env.notify(Notice::ThresholdProgress(progress));

        if progress.passed {
            self.apply_vote_extend(env);
        }
        Ok(progress)
    }

    // ------------------------------------------------------------------
    // Ballot
    // ------------------------------------------------------------------

    /// Record `player`'s choice on the open ballot; a later vote replaces an earlier one.
    pub fn cast_ballot<N: NoticeEffects + ?Sized>(
        &mut self,
        env: &N,
        player: PlayerRef,
        option: &BallotOption,
    ) -> Result<()> {
        let ballot = self.ballot.as_mut().ok_or(MapVoteError::NotOpen)?;
        ballot.vote(player, option)?;
        env.notify(Notice::BallotVoteRecorded {
            player,
            option: option.clone(),
        });
        Ok(())
    }

    /// Record `player`'s choice by its zero-based menu position.
    pub fn cast_ballot_index<N: NoticeEffects + ?Sized>(
        &mut self,
        env: &N,
        player: PlayerRef,
        index: usize,
    ) -> Result<BallotOption> {
        let ballot = self.ballot.as_mut().ok_or(MapVoteError::NotOpen)?;
        let option = ballot.vote_index(player, index)?;
        env.notify(Notice::BallotVoteRecorded {
            player,
            option: option.clone(),
        });
        Ok(option)
    }

    /// Open a ballot now, regardless of remaining time.
    pub fn force_ballot<E: EngineEffects + ?Sized>(&mut self, env: &E) -> Result<()> {
        match self.session.phase {
            SessionPhase::Inactive => Err(MapVoteError::VoteNotActive),
            SessionPhase::BallotOpen => Err(MapVoteError::VoteInProgress),
            SessionPhase::Resolved => Err(MapVoteError::AlreadyResolved),
            SessionPhase::WaitingToPoll => self.open_ballot(env, BallotTrigger::Forced),
        }
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    /// A player left.
    ///
    /// The host removes the player from its roster first, so
    /// `connected_player_count` already excludes them. Their nomination is
    /// dropped and both threshold votes are recounted; a recount may pass a
    /// vote. Ballot votes already cast still count.
    pub fn on_disconnect<E: EngineEffects + ?Sized>(&mut self, env: &E, player: PlayerRef) {
        if let Some(map) = self.nominations.remove(player) {
            env.notify(Notice::NominationRemoved {
                player,
                map,
                reason: RemovalReason::Disconnected,
            });
        }

        let connected = env.connected_player_count();
        if let Some(progress) = self.rock_the_vote.on_disconnect(player, connected) {
            env.notify(Notice::ThresholdProgress(progress));
            if progress.passed {
                info!(player = %player, "Rock-the-vote passed after disconnect");
                self.on_rock_the_vote_passed(env);
            }
        }
        if let Some(progress) = self.vote_extend.on_disconnect(player, connected) {
            env.notify(Notice::ThresholdProgress(progress));
            if progress.passed && !self.session.vote_extended {
                info!(player = %player, "Vote-extend passed after disconnect");
                self.apply_vote_extend(env);
            }
        }
    }

    /// A timer scheduled by this controller fired.
    ///
    /// Events stamped with another session's token are ignored.
    pub fn on_timer<E: EngineEffects + ?Sized>(&mut self, env: &E, event: TimerEvent) {
        if event.session != self.session.token {
            debug!(
                event_session = %event.session,
                session = %self.session.token,
                slot = ?event.slot,
                "Ignoring stale timer"
            );
            return;
        }

        match event.slot {
            TimerSlot::PollCheck => {
                self.poll_check(env);
            }
            TimerSlot::BallotClose => {
                self.timers.remove(&event.slot);
                self.close_ballot(env);
            }
            TimerSlot::ThresholdExpire(kind) => {
                self.timers.remove(&event.slot);
                self.expire_threshold(env, kind);
            }
            TimerSlot::LevelChange => {
                self.timers.remove(&event.slot);
                if let Some(map) = &self.session.next_map {
                    info!(map = %map, "Requesting level change");
                    env.request_level_change(map);
                }
            }
        }
    }

    /// Open the ballot if the remaining map time crossed the start threshold.
    ///
    /// Idempotent: does nothing outside `WaitingToPoll`. Returns whether a
    /// ballot was opened.
    pub fn poll_check<E: EngineEffects + ?Sized>(&mut self, env: &E) -> bool {
        if self.session.phase != SessionPhase::WaitingToPoll {
            return false;
        }
        match env.remaining_map_time() {
            Some(remaining) if remaining <= self.config.ballot.start_threshold() => {
                debug!(remaining_secs = remaining.as_secs(), "Start threshold reached");
                self.open_ballot(env, BallotTrigger::TimeLimit).is_ok()
            }
            _ => false,
        }
    }

    /// Snapshot of the engine for display
    pub fn status<S: ServerEffects + ?Sized>(&self, server: &S) -> EngineStatus {
        let connected = server.connected_player_count();
        EngineStatus {
            session: self.session.token,
            phase: self.session.phase,
            current_map: self.session.map.clone(),
            connected,
            extends: self.session.extends,
            max_extends: self.config.ballot.max_extends,
            vote_extended: self.session.vote_extended,
            next_map: self.session.next_map.clone(),
            nominations: self.nominations.snapshot().to_vec(),
            rock_the_vote: ThresholdStatus::of(&self.rock_the_vote, connected),
            vote_extend: ThresholdStatus::of(&self.vote_extend, connected),
            ballot: self.ballot.as_ref().map(BallotStatus::of),
            last_result: self.session.last_result.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn on_rock_the_vote_passed<E: EngineEffects + ?Sized>(&mut self, env: &E) {
        self.cancel_timer(env, TimerSlot::ThresholdExpire(ThresholdKind::RockTheVote));
        if let Err(e) = self.open_ballot(env, BallotTrigger::RockTheVote) {
            warn!(error = %e, "Rock-the-vote passed but no ballot could be opened");
        }
    }

    fn apply_vote_extend<E: EngineEffects + ?Sized>(&mut self, env: &E) {
        self.cancel_timer(env, TimerSlot::ThresholdExpire(ThresholdKind::VoteExtend));
        self.session.vote_extended = true;
        let minutes = self.config.vote_extend.extend_time_minutes;
        env.request_time_limit_increase(minutes);
        env.notify(Notice::MapExtended {
            minutes,
            source: ExtendSource::VoteExtend,
        });
        info!(minutes, "Map extended by vote-extend");
    }

    fn expire_threshold<E: EngineEffects + ?Sized>(&mut self, env: &E, kind: ThresholdKind) {
        let vote = match kind {
            ThresholdKind::RockTheVote => &mut self.rock_the_vote,
            ThresholdKind::VoteExtend => &mut self.vote_extend,
        };
        if let Some(progress) = vote.expire(env.connected_player_count()) {
            env.notify(Notice::ThresholdExpired {
                kind,
                votes: progress.votes,
                needed: progress.needed,
            });
        }
    }

    fn open_ballot<E: EngineEffects + ?Sized>(
        &mut self,
        env: &E,
        trigger: BallotTrigger,
    ) -> Result<()> {
        if self.session.phase != SessionPhase::WaitingToPoll {
            debug!(trigger = ?trigger, phase = ?self.session.phase, "Ballot already handled");
            return Ok(());
        }

        // An open ballot supersedes any running threshold episode
        for kind in [ThresholdKind::RockTheVote, ThresholdKind::VoteExtend] {
            self.cancel_timer(env, TimerSlot::ThresholdExpire(kind));
        }
        self.rock_the_vote.reset();
        self.vote_extend.reset();

        let ballot_config = &self.config.ballot;
        let include_extend =
            ballot_config.extend && self.session.extends < ballot_config.max_extends;
        let duration = ballot_config.vote_duration();
        let params = BallotParams {
            nominations: self.nominations.snapshot(),
            catalog: &self.catalog,
            excluded: &self.session.exclusions,
            slot_count: ballot_config.include_maps,
            include_extend,
        };

        match Ballot::open(params, env, env.game_time(), duration) {
            Ok(ballot) => {
                let options = ballot.options().to_vec();
                self.ballot = Some(ballot);
                self.session.phase = SessionPhase::BallotOpen;
                self.schedule_once(env, TimerSlot::BallotClose, duration);
                info!(
                    trigger = ?trigger,
                    options = options.len(),
                    duration_secs = duration.as_secs(),
                    "Ballot opened"
                );
                env.notify(Notice::BallotOpened {
                    trigger,
                    options,
                    duration_secs: duration.as_secs(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(trigger = ?trigger, "No eligible maps for ballot; keeping current map");
                self.session.phase = SessionPhase::Resolved;
                self.session.last_result = Some(BallotResult {
                    outcome: BallotOutcome::NoChange,
                    winning_votes: 0,
                    counts: Vec::new(),
                });
                env.notify(Notice::NoEligibleMaps);
                Err(e)
            }
        }
    }

    fn close_ballot<E: EngineEffects + ?Sized>(&mut self, env: &E) {
        let Some(mut ballot) = self.ballot.take() else {
            return;
        };
        let result = ballot.tally();
        info!(
            outcome = ?result.outcome,
            winning_votes = result.winning_votes,
            voters = ballot.vote_count(),
            "Ballot closed"
        );
        env.notify(Notice::BallotResult {
            outcome: result.outcome.clone(),
            winning_votes: result.winning_votes,
            counts: result.counts.clone(),
        });

        match &result.outcome {
            BallotOutcome::ExtendMap => {
                self.session.extends += 1;
                let minutes = self.config.ballot.extend_time_minutes;
                env.request_time_limit_increase(minutes);
                env.notify(Notice::MapExtended {
                    minutes,
                    source: ExtendSource::Ballot,
                });
                self.session.phase = SessionPhase::WaitingToPoll;
                info!(
                    extends = self.session.extends,
                    max_extends = self.config.ballot.max_extends,
                    "Map extended by ballot"
                );
            }
            BallotOutcome::ChangeTo(map) => {
                let delay = self.config.ballot.change_delay();
                self.session.next_map = Some(map.clone());
                self.session.phase = SessionPhase::Resolved;
                self.schedule_once(env, TimerSlot::LevelChange, delay);
                env.notify(Notice::LevelChangeScheduled {
                    map: map.clone(),
                    delay_secs: delay.as_secs(),
                });
            }
            BallotOutcome::NoChange => {
                self.session.phase = SessionPhase::Resolved;
            }
        }
        self.session.last_result = Some(result);
    }

    fn schedule_once<S: SchedulerEffects + ?Sized>(
        &mut self,
        scheduler: &S,
        slot: TimerSlot,
        delay: Duration,
    ) {
        self.cancel_timer(scheduler, slot);
        let event = TimerEvent {
            session: self.session.token,
            slot,
        };
        let handle = scheduler.schedule_once(delay, event);
        self.timers.insert(slot, handle);
    }

    fn schedule_repeating<S: SchedulerEffects + ?Sized>(
        &mut self,
        scheduler: &S,
        slot: TimerSlot,
        interval: Duration,
    ) {
        self.cancel_timer(scheduler, slot);
        let event = TimerEvent {
            session: self.session.token,
            slot,
        };
        let handle = scheduler.schedule_repeating(interval, event);
        self.timers.insert(slot, handle);
    }

    fn cancel_timer<S: SchedulerEffects + ?Sized>(&mut self, scheduler: &S, slot: TimerSlot) {
        if let Some(handle) = self.timers.remove(&slot) {
            scheduler.cancel(handle);
        }
    }

    fn cancel_all_timers<S: SchedulerEffects + ?Sized>(&mut self, scheduler: &S) {
        for (_, handle) in std::mem::take(&mut self.timers) {
            scheduler.cancel(handle);
        }
    }
}
