//! Tokio timer scheduler
//!
//! Each timer is a spawned task that sleeps and then posts
//! [`EngineCommand::Timer`] into the runtime's command channel, so timer
//! callbacks are serialized with every other engine event.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for JoinHandle storage because:
//! 1. Operations are O(1) insert/remove or O(n) drain (shutdown only)
//! 2. Lock is never held across `.await` points
//! 3. No I/O or async work inside lock scope

use std::collections::HashMap;
use std::time::Duration;

use mapvote_core::{SchedulerEffects, TimerEvent, TimerHandle};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::runtime::EngineCommand;

/// Scheduler posting timer events into an engine command channel.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    commands: mpsc::UnboundedSender<EngineCommand>,
    handles: Mutex<HashMap<TimerHandle, JoinHandle<()>>>,
}

impl TokioScheduler {
    /// Scheduler delivering into `commands`
    pub fn new(commands: mpsc::UnboundedSender<EngineCommand>) -> Self {
        Self {
            commands,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Number of timers that have not finished
    pub fn active_timers(&self) -> usize {
        self.handles
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Abort every timer
    pub fn shutdown(&self) {
        for (_, handle) in self.handles.lock().drain() {
            handle.abort();
        }
    }

    fn track(&self, task: JoinHandle<()>) -> TimerHandle {
        let handle = TimerHandle::new();
        let mut handles = self.handles.lock();
        handles.retain(|_, task| !task.is_finished());
        handles.insert(handle, task);
        handle
    }
}

impl SchedulerEffects for TokioScheduler {
    fn schedule_once(&self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = commands.send(EngineCommand::Timer(event));
        });
        self.track(task)
    }

    fn schedule_repeating(&self, interval: Duration, event: TimerEvent) -> TimerHandle {
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                if commands.send(EngineCommand::Timer(event)).is_err() {
                    break;
                }
            }
        });
        self.track(task)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.handles.lock().remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
