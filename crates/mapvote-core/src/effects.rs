//! Effect traits through which the engine talks to its host.
//!
//! # Effect Classification
//!
//! - **Category**: Host effects
//! - **Implementation**: `mapvote-effects` (production), `mapvote-testkit` (deterministic)
//! - **Usage**: `MapVoteController` is generic over [`EngineEffects`]
//!
//! The engine never reads clocks, rosters or console variables directly and never
//! sleeps. Every spontaneous transition arrives as a [`TimerEvent`] that the host's
//! scheduler hands back to the controller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CatalogError;
use crate::notice::Notice;
use crate::threshold::ThresholdKind;
use crate::types::{MapId, MapMeta};

/// Game server queries and commands.
pub trait ServerEffects {
    /// Whether the server can load this map
    fn is_map_valid(&self, map: &MapId) -> bool;

    /// Map currently being played
    fn current_map(&self) -> MapId;

    /// Number of connected human players
    fn connected_player_count(&self) -> usize;

    /// Time left before the time limit ends the map; `None` when there is no limit
    fn remaining_map_time(&self) -> Option<Duration>;

    /// Elapsed game time, used to timestamp votes
    fn game_time(&self) -> Duration;

    /// Raise the map time limit
    fn request_time_limit_increase(&self, minutes: u32);

    /// Switch to another map now
    fn request_level_change(&self, map: &MapId);
}

/// Generation number of a map session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionToken(pub u64);

impl SessionToken {
    /// Following generation
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Which session-scoped timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimerSlot {
    /// Repeating remaining-time check
    PollCheck,
    /// End of the ballot window
    BallotClose,
    /// End of a threshold vote episode
    ThresholdExpire(ThresholdKind),
    /// Delayed level change after a ballot result
    LevelChange,
}

/// A scheduled callback, stamped with the session that scheduled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerEvent {
    /// Session that scheduled the timer
    pub session: SessionToken,
    /// Timer purpose
    pub slot: TimerSlot,
}

/// Handle for cancelling a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerHandle(pub Uuid);

impl TimerHandle {
    /// Fresh random handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer scheduling.
///
/// Implementations deliver fired events back to
/// [`MapVoteController::on_timer`](crate::lifecycle::MapVoteController::on_timer)
/// through the host's serialized event path, never re-entrantly.
pub trait SchedulerEffects {
    /// Fire `event` once after `delay`
    fn schedule_once(&self, delay: Duration, event: TimerEvent) -> TimerHandle;

    /// Fire `event` every `interval` until cancelled
    fn schedule_repeating(&self, interval: Duration, event: TimerEvent) -> TimerHandle;

    /// Cancel a timer; unknown or already-fired handles are ignored
    fn cancel(&self, handle: TimerHandle);
}

/// Source of uniform randomness for the ballot fill.
pub trait RandomEffects {
    /// Uniform index in `[0, bound)`; `bound` is never zero
    fn random_index(&self, bound: usize) -> usize;
}

/// Sink for player-facing notifications.
pub trait NoticeEffects {
    /// Deliver a notification for the host to render
    fn notify(&self, notice: Notice);
}

/// Upstream provider of candidate maps (database, file, static list).
#[async_trait]
pub trait MapSourceEffects: Send + Sync {
    /// Fetch the candidate map list in presentation order
    async fn query_candidate_maps(&self) -> Result<Vec<MapMeta>, CatalogError>;

    /// Fetch candidates and keep those `eligible` accepts, in order
    async fn query_eligible_maps(
        &self,
        eligible: &(dyn for<'m> Fn(&'m MapMeta) -> bool + Send + Sync),
    ) -> Result<Vec<MapMeta>, CatalogError> {
        let candidates = self.query_candidate_maps().await?;
        Ok(candidates.into_iter().filter(|meta| eligible(meta)).collect())
    }
}

/// Everything the controller needs from its host.
pub trait EngineEffects: ServerEffects + SchedulerEffects + RandomEffects + NoticeEffects {}

impl<T> EngineEffects for T where
    T: ServerEffects + SchedulerEffects + RandomEffects + NoticeEffects + ?Sized
{
}

/// Blanket implementation for Arc<T> where T: MapSourceEffects
#[async_trait]
impl<T: MapSourceEffects + ?Sized> MapSourceEffects for Arc<T> {
    async fn query_candidate_maps(&self) -> Result<Vec<MapMeta>, CatalogError> {
        (**self).query_candidate_maps().await
    }

    async fn query_eligible_maps(
        &self,
        eligible: &(dyn for<'m> Fn(&'m MapMeta) -> bool + Send + Sync),
    ) -> Result<Vec<MapMeta>, CatalogError> {
        (**self).query_eligible_maps(eligible).await
    }
}
