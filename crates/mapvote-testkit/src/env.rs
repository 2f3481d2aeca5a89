//! Combined deterministic environment
//!
//! [`TestEnv`] implements every effect the controller needs and drives its
//! timers on a virtual clock shared by the server and the scheduler.

use std::time::Duration;

use mapvote_core::{
    MapId, MapVoteController, Notice, NoticeEffects, RandomEffects, SchedulerEffects,
    ServerEffects, TimerEvent, TimerHandle,
};

use crate::notices::RecordingNotices;
use crate::random::SeededRandom;
use crate::scheduler::ManualScheduler;
use crate::server::MockServer;

/// Deterministic host for a [`MapVoteController`].
#[derive(Debug)]
pub struct TestEnv {
    /// Game server state and received commands
    pub server: MockServer,
    /// Virtual-clock timers
    pub scheduler: ManualScheduler,
    /// Seeded ballot randomness
    pub random: SeededRandom,
    /// Recorded notices
    pub notices: RecordingNotices,
}

impl TestEnv {
    /// Environment playing `map`, with randomness seeded by `seed`
    pub fn new(map: impl Into<MapId>, seed: u64) -> Self {
        Self {
            server: MockServer::new(map),
            scheduler: ManualScheduler::new(),
            random: SeededRandom::new(seed),
            notices: RecordingNotices::new(),
        }
    }

    /// Set the connected player count
    pub fn set_connected(&self, connected: usize) {
        self.server.set_connected(connected);
    }

    /// Set the remaining map time
    pub fn set_remaining(&self, remaining: Duration) {
        self.server.set_remaining(Some(remaining));
    }

    /// Drain recorded notices
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Advance virtual time by `duration`, delivering every timer that comes
    /// due to `controller` in order.
    pub fn run_for(&self, controller: &mut MapVoteController, duration: Duration) {
        let deadline = self.scheduler.now() + duration;
        loop {
            let before = self.scheduler.now();
            let Some(event) = self.scheduler.fire_next(deadline) else {
                break;
            };
            self.server
                .advance(self.scheduler.now().saturating_sub(before));
            controller.on_timer(self, event);
        }
        let before = self.scheduler.now();
        self.scheduler.advance_to(deadline);
        self.server.advance(deadline.saturating_sub(before));
    }

    /// Hand `event` to the controller directly, without touching the clock
    pub fn deliver(&self, controller: &mut MapVoteController, event: TimerEvent) {
        controller.on_timer(self, event);
    }
}

impl ServerEffects for TestEnv {
    fn is_map_valid(&self, map: &MapId) -> bool {
        self.server.is_map_valid(map)
    }

    fn current_map(&self) -> MapId {
        self.server.current_map()
    }

    fn connected_player_count(&self) -> usize {
        self.server.connected_player_count()
    }

    fn remaining_map_time(&self) -> Option<Duration> {
        self.server.remaining_map_time()
    }

    fn game_time(&self) -> Duration {
        self.server.game_time()
    }

    fn request_time_limit_increase(&self, minutes: u32) {
        self.server.request_time_limit_increase(minutes);
    }

    fn request_level_change(&self, map: &MapId) {
        self.server.request_level_change(map);
    }
}

impl SchedulerEffects for TestEnv {
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

impl RandomEffects for TestEnv {
    fn random_index(&self, bound: usize) -> usize {
        self.random.random_index(bound)
    }
}

impl NoticeEffects for TestEnv {
    fn notify(&self, notice: Notice) {
        self.notices.notify(notice);
    }
}
