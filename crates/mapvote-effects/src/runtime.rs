//! Single-writer engine runtime
//!
//! One tokio task owns the [`MapVoteController`] and consumes
//! [`EngineCommand`]s from an unbounded channel, one at a time. Host events,
//! player commands, timer callbacks and catalog refresh results all travel
//! through that channel, so the controller never sees concurrent access.
//!
//! ```text
//! MapVoteHandle ──┐
//! TokioScheduler ─┼─▶ mpsc ─▶ engine task ─▶ MapVoteController
//! catalog refresh ┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use mapvote_core::{
    load_catalog, BallotOption, Catalog, CatalogError, ConfigError, EngineStatus,
    FallbackMapSource, MapId,
    MapSourceEffects, MapVoteConfig, MapVoteController, MapVoteError, NominationMenu,
    NominationOutcome, Notice, NoticeEffects, PlayerRef, RandomEffects, SchedulerEffects,
    ServerEffects, ThresholdProgress, TierRange, TimerEvent, TimerHandle,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::map_source::StaticMapSource;
use crate::random::RealRandomHandler;
use crate::scheduler::TokioScheduler;

/// Errors surfaced by [`MapVoteHandle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The engine task has stopped
    #[error("Map vote runtime is not running")]
    Closed,

    /// The engine rejected the command
    #[error(transparent)]
    Engine(#[from] MapVoteError),
}

/// Result type for runtime calls
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Host services the runtime needs besides timers and randomness.
pub trait HostEffects: ServerEffects + NoticeEffects + Send + Sync + 'static {}

impl<T> HostEffects for T where T: ServerEffects + NoticeEffects + Send + Sync + 'static {}

/// Everything the engine task processes, in arrival order.
#[derive(Debug)]
pub enum EngineCommand {
    /// A new map started
    StartMap,
    /// The current map ended
    EndMap,
    /// A player nominates a map
    Nominate {
        /// Nominating player
        player: PlayerRef,
        /// Typed map name
        query: String,
        /// Reply channel
        reply: oneshot::Sender<mapvote_core::Result<NominationOutcome>>,
    },
    /// A player withdraws their nomination
    RemoveNomination {
        /// Owner
        player: PlayerRef,
        /// Reply channel
        reply: oneshot::Sender<Option<MapId>>,
    },
    /// A player votes to rock the vote
    RockTheVote {
        /// Voter
        player: PlayerRef,
        /// Reply channel
        reply: oneshot::Sender<mapvote_core::Result<ThresholdProgress>>,
    },
    /// A player votes to extend the map
    VoteExtend {
        /// Voter
        player: PlayerRef,
        /// Reply channel
        reply: oneshot::Sender<mapvote_core::Result<ThresholdProgress>>,
    },
    /// A player picks a ballot option
    CastBallot {
        /// Voter
        player: PlayerRef,
        /// Chosen option
        option: BallotOption,
        /// Reply channel
        reply: oneshot::Sender<mapvote_core::Result<()>>,
    },
    /// A player picks a ballot option by menu position
    CastBallotIndex {
        /// Voter
        player: PlayerRef,
        /// Zero-based menu position
        index: usize,
        /// Reply channel
        reply: oneshot::Sender<mapvote_core::Result<BallotOption>>,
    },
    /// A player left; the host already removed them from its roster
    Disconnect {
        /// Departed player
        player: PlayerRef,
    },
    /// An admin opens the ballot now
    ForceBallot {
        /// Reply channel
        reply: oneshot::Sender<mapvote_core::Result<()>>,
    },
    /// Snapshot request
    Status {
        /// Reply channel
        reply: oneshot::Sender<EngineStatus>,
    },
    /// Nomination menu request
    NominationMenu {
        /// Reply channel
        reply: oneshot::Sender<NominationMenu>,
    },
    /// Next map request
    NextMap {
        /// Reply channel
        reply: oneshot::Sender<Option<MapId>>,
    },
    /// Reload the catalog in the background
    RefreshCatalog,
    /// A background refresh finished
    ReplaceCatalog(Catalog),
    /// A scheduled timer fired
    Timer(TimerEvent),
    /// Stop the engine task
    Shutdown,
}

/// Effect bundle handed to the controller inside the engine task.
#[derive(Debug)]
pub struct RuntimeEffects<H> {
    host: Arc<H>,
    scheduler: TokioScheduler,
    random: RealRandomHandler,
}

impl<H> RuntimeEffects<H> {
    /// Bundle `host` with a scheduler posting into `commands`
    pub fn new(host: Arc<H>, commands: mpsc::UnboundedSender<EngineCommand>) -> Self {
        Self {
            host,
            scheduler: TokioScheduler::new(commands),
            random: RealRandomHandler::new(),
        }
    }

    /// Timer scheduler
    pub fn scheduler(&self) -> &TokioScheduler {
        &self.scheduler
    }
}

impl<H: ServerEffects> ServerEffects for RuntimeEffects<H> {
    fn is_map_valid(&self, map: &MapId) -> bool {
        self.host.is_map_valid(map)
    }

    fn current_map(&self) -> MapId {
        self.host.current_map()
    }

    fn connected_player_count(&self) -> usize {
        self.host.connected_player_count()
    }

    fn remaining_map_time(&self) -> Option<Duration> {
        self.host.remaining_map_time()
    }

    fn game_time(&self) -> Duration {
        self.host.game_time()
    }

    fn request_time_limit_increase(&self, minutes: u32) {
        self.host.request_time_limit_increase(minutes);
    }

    fn request_level_change(&self, map: &MapId) {
        self.host.request_level_change(map);
    }
}

impl<H> SchedulerEffects for RuntimeEffects<H> {
    fn schedule_once(&self, delay: Duration, event: TimerEvent) -> TimerHandle {
        self.scheduler.schedule_once(delay, event)
    }

    fn schedule_repeating(&self, interval: Duration, event: TimerEvent) -> TimerHandle {
        self.scheduler.schedule_repeating(interval, event)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.scheduler.cancel(handle);
    }
}

impl<H> RandomEffects for RuntimeEffects<H> {
    fn random_index(&self, bound: usize) -> usize {
        self.random.random_index(bound)
    }
}

impl<H: NoticeEffects> NoticeEffects for RuntimeEffects<H> {
    fn notify(&self, notice: Notice) {
        self.host.notify(notice);
    }
}

/// Cloneable front end of a running engine.
#[derive(Debug, Clone)]
pub struct MapVoteHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl MapVoteHandle {
    fn send(&self, command: EngineCommand) -> RuntimeResult<()> {
        self.commands
            .send(command)
            .map_err(|_| RuntimeError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> RuntimeResult<T> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply))?;
        response.await.map_err(|_| RuntimeError::Closed)
    }

    /// Report a map start
    pub fn start_map(&self) -> RuntimeResult<()> {
        self.send(EngineCommand::StartMap)
    }

    /// Report a map end
    pub fn end_map(&self) -> RuntimeResult<()> {
        self.send(EngineCommand::EndMap)
    }

    /// Report a disconnect; call after removing the player from the roster
    pub fn disconnect(&self, player: PlayerRef) -> RuntimeResult<()> {
        self.send(EngineCommand::Disconnect { player })
    }

    /// Reload the catalog in the background
    pub fn refresh_catalog(&self) -> RuntimeResult<()> {
        self.send(EngineCommand::RefreshCatalog)
    }

    /// Nominate a map
    pub async fn nominate(
        &self,
        player: PlayerRef,
        query: impl Into<String>,
    ) -> RuntimeResult<NominationOutcome> {
        let query = query.into();
        Ok(self
            .request(|reply| EngineCommand::Nominate {
                player,
                query,
                reply,
            })
            .await??)
    }

    /// Withdraw a nomination
    pub async fn remove_nomination(&self, player: PlayerRef) -> RuntimeResult<Option<MapId>> {
        self.request(|reply| EngineCommand::RemoveNomination { player, reply })
            .await
    }

    /// Vote to rock the vote
    pub async fn rock_the_vote(&self, player: PlayerRef) -> RuntimeResult<ThresholdProgress> {
        Ok(self
            .request(|reply| EngineCommand::RockTheVote { player, reply })
            .await??)
    }

    /// Vote to extend the current map
    pub async fn vote_extend(&self, player: PlayerRef) -> RuntimeResult<ThresholdProgress> {
        Ok(self
            .request(|reply| EngineCommand::VoteExtend { player, reply })
            .await??)
    }

    /// Vote on the open ballot
    pub async fn cast_ballot(&self, player: PlayerRef, option: BallotOption) -> RuntimeResult<()> {
        Ok(self
            .request(|reply| EngineCommand::CastBallot {
                player,
                option,
                reply,
            })
            .await??)
    }

    /// Vote on the open ballot by menu position
    pub async fn cast_ballot_index(
        &self,
        player: PlayerRef,
        index: usize,
    ) -> RuntimeResult<BallotOption> {
        Ok(self
            .request(|reply| EngineCommand::CastBallotIndex {
                player,
                index,
                reply,
            })
            .await??)
    }

    /// Open the ballot now
    pub async fn force_ballot(&self) -> RuntimeResult<()> {
        Ok(self
            .request(|reply| EngineCommand::ForceBallot { reply })
            .await??)
    }

    /// Engine snapshot
    pub async fn status(&self) -> RuntimeResult<EngineStatus> {
        self.request(|reply| EngineCommand::Status { reply }).await
    }

    /// Nomination menu
    pub async fn nomination_menu(&self) -> RuntimeResult<NominationMenu> {
        self.request(|reply| EngineCommand::NominationMenu { reply })
            .await
    }

    /// Map chosen by the last ballot
    pub async fn next_map(&self) -> RuntimeResult<Option<MapId>> {
        self.request(|reply| EngineCommand::NextMap { reply }).await
    }
}

/// A running engine task.
#[derive(Debug)]
pub struct MapVoteRuntime {
    handle: MapVoteHandle,
    task: JoinHandle<()>,
}

impl MapVoteRuntime {
    /// Spawn the engine task on the current tokio runtime.
    ///
    /// The task loads the catalog from `source` (falling back to
    /// `config.catalog.fallback_maps`) before processing any command; commands
    /// sent meanwhile are queued. Fails without spawning if `config` does not
    /// validate.
    pub fn spawn<H, S>(config: MapVoteConfig, host: Arc<H>, source: S) -> Result<Self, ConfigError>
    where
        H: HostEffects,
        S: MapSourceEffects + 'static,
    {
        config.validate()?;
        let (commands, inbox) = mpsc::unbounded_channel();
        let tiers = config.catalog.tier_range();
        let fallback = StaticMapSource::from_names(&config.catalog.fallback_maps);
        let engine = EngineTask {
            controller: MapVoteController::new(config),
            env: RuntimeEffects::new(Arc::clone(&host), commands.clone()),
            host,
            source: Arc::new(FallbackMapSource::new(source, fallback)),
            tiers,
            commands: commands.clone(),
        };
        let task = tokio::spawn(engine.run(inbox));
        Ok(Self {
            handle: MapVoteHandle { commands },
            task,
        })
    }

    /// Handle for sending commands
    pub fn handle(&self) -> MapVoteHandle {
        self.handle.clone()
    }

    /// Stop the engine and wait for it to finish; pending timers are aborted
    pub async fn shutdown(self) {
        let _ = self.handle.send(EngineCommand::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Map vote engine task ended abnormally");
        }
    }
}

struct EngineTask<H, S> {
    controller: MapVoteController,
    env: RuntimeEffects<H>,
    host: Arc<H>,
    source: Arc<S>,
    tiers: Option<TierRange>,
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl<H, S> EngineTask<H, S>
where
    H: HostEffects,
    S: MapSourceEffects + 'static,
{
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<EngineCommand>) {
        match self.load().await {
            Ok(catalog) => self.controller.replace_catalog(catalog),
            Err(e) => warn!(error = %e, "Initial catalog load failed; starting with an empty catalog"),
        }

        while let Some(command) = inbox.recv().await {
            if !self.handle(command) {
                break;
            }
        }

        self.controller.end_map(&self.env);
        self.env.scheduler().shutdown();
        info!("Map vote engine stopped");
    }

    async fn load(&self) -> Result<Catalog, CatalogError> {
        load_catalog(self.source.as_ref(), self.host.as_ref(), self.tiers).await
    }

    fn spawn_refresh(&self) {
        let source = Arc::clone(&self.source);
        let host = Arc::clone(&self.host);
        let tiers = self.tiers;
        let commands = self.commands.clone();
        tokio::spawn(async move {
            match load_catalog(source.as_ref(), host.as_ref(), tiers).await {
                Ok(catalog) => {
                    let _ = commands.send(EngineCommand::ReplaceCatalog(catalog));
                }
                Err(e) => warn!(error = %e, "Catalog refresh failed; keeping current catalog"),
            }
        });
    }

    /// Apply one command; returns false on shutdown
    fn handle(&mut self, command: EngineCommand) -> bool {
        let env = &self.env;
        let controller = &mut self.controller;
        match command {
            EngineCommand::StartMap => controller.start_map(env),
            EngineCommand::EndMap => controller.end_map(env),
            EngineCommand::Nominate {
                player,
                query,
                reply,
            } => {
                let _ = reply.send(controller.nominate(env, player, &query));
            }
            EngineCommand::RemoveNomination { player, reply } => {
                let _ = reply.send(controller.remove_nomination(env, player));
            }
            EngineCommand::RockTheVote { player, reply } => {
                let _ = reply.send(controller.rock_the_vote(env, player));
            }
            EngineCommand::VoteExtend { player, reply } => {
                let _ = reply.send(controller.vote_extend(env, player));
            }
            EngineCommand::CastBallot {
                player,
                option,
                reply,
            } => {
                let _ = reply.send(controller.cast_ballot(env, player, &option));
            }
            EngineCommand::CastBallotIndex {
                player,
                index,
                reply,
            } => {
                let _ = reply.send(controller.cast_ballot_index(env, player, index));
            }
            EngineCommand::Disconnect { player } => controller.on_disconnect(env, player),
            EngineCommand::ForceBallot { reply } => {
                let _ = reply.send(controller.force_ballot(env));
            }
            EngineCommand::Status { reply } => {
                let _ = reply.send(controller.status(env));
            }
            EngineCommand::NominationMenu { reply } => {
                let _ = reply.send(controller.nomination_menu());
            }
            EngineCommand::NextMap { reply } => {
                let _ = reply.send(controller.next_map().cloned());
            }
            EngineCommand::RefreshCatalog => {
                debug!("Refreshing catalog");
                self.spawn_refresh();
            }
            EngineCommand::ReplaceCatalog(catalog) => controller.replace_catalog(catalog),
            EngineCommand::Timer(event) => controller.on_timer(env, event),
            EngineCommand::Shutdown => return false,
        }
        true
    }
}
