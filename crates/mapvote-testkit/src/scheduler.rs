//! Manually driven timer scheduler
//!
//! Timers live on a virtual clock that only moves when a test calls
//! [`ManualScheduler::advance_to`]. Firing order is by due time, then by
//! scheduling order.

use std::time::Duration;

use mapvote_core::{SchedulerEffects, TimerEvent, TimerHandle, TimerSlot};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct PendingTimer {
    handle: TimerHandle,
    event: TimerEvent,
    due: Duration,
    interval: Option<Duration>,
    seq: u64,
}

#[derive(Debug, Default)]
struct SchedulerState {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingTimer>,
    cancelled: Vec<TimerHandle>,
}

/// Deterministic scheduler on a virtual clock.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    state: Mutex<SchedulerState>,
}

impl ManualScheduler {
    /// Scheduler at virtual time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<Duration> {
        self.state.lock().pending.iter().map(|timer| timer.due).min()
    }

    /// Pop the earliest timer due at or before `deadline`, moving the clock to
    /// its due time. Repeating timers are re-armed.
    pub fn fire_next(&self, deadline: Duration) -> Option<TimerEvent> {
        let mut state = self.state.lock();
        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(index, _)| index)?;

        let timer = state.pending.remove(index);
        state.now = state.now.max(timer.due);
        if let Some(interval) = timer.interval {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pending.push(PendingTimer {
                due: timer.due + interval,
                seq,
                ..timer.clone()
            });
        }
        Some(timer.event)
    }

    /// Move the clock to `to` without firing anything
    pub fn advance_to(&self, to: Duration) {
        let mut state = self.state.lock();
        state.now = state.now.max(to);
    }

    /// Events of every pending timer
    pub fn pending(&self) -> Vec<TimerEvent> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|timer| timer.event)
            .collect()
    }

    /// Whether a timer for `slot` is pending
    pub fn is_pending(&self, slot: TimerSlot) -> bool {
        self.state
            .lock()
            .pending
            .iter()
            .any(|timer| timer.event.slot == slot)
    }

    /// Handles cancelled so far
    pub fn cancelled(&self) -> Vec<TimerHandle> {
        self.state.lock().cancelled.clone()
    }

    fn push(&self, delay: Duration, interval: Option<Duration>, event: TimerEvent) -> TimerHandle {
        let mut state = self.state.lock();
        let handle = TimerHandle::new();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + delay;
        state.pending.push(PendingTimer {
            handle,
            event,
            due,
            interval,
            seq,
        });
        handle
    }
}

impl SchedulerEffects for ManualScheduler {
    fn schedule_once(&self, delay: Duration, event: TimerEvent) -> TimerHandle {
        self.push(delay, None, event)
    }

    fn schedule_repeating(&self, interval: Duration, event: TimerEvent) -> TimerHandle {
        self.push(interval, Some(interval), event)
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut state = self.state.lock();
        state.pending.retain(|timer| timer.handle != handle);
        state.cancelled.push(handle);
    }
}
