//! Scriptable game server

use std::collections::HashSet;
use std::time::Duration;

use mapvote_core::{MapId, ServerEffects};
use parking_lot::Mutex;

/// Command the engine issued to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerRequest {
    /// `request_time_limit_increase(minutes)`
    TimeLimitIncrease(u32),
    /// `request_level_change(map)`
    LevelChange(MapId),
}

#[derive(Debug)]
struct ServerState {
    current_map: MapId,
    connected: usize,
    remaining: Option<Duration>,
    game_time: Duration,
    invalid_maps: HashSet<MapId>,
    requests: Vec<ServerRequest>,
}

/// In-memory game server.
///
/// Every map is valid unless marked otherwise. A time limit increase is
/// applied to the remaining time, like a real server would.
#[derive(Debug)]
pub struct MockServer {
    state: Mutex<ServerState>,
}

impl MockServer {
    /// Server playing `map` with no players and no time limit
    pub fn new(map: impl Into<MapId>) -> Self {
        Self {
            state: Mutex::new(ServerState {
                current_map: map.into(),
                connected: 0,
                remaining: None,
                game_time: Duration::ZERO,
                invalid_maps: HashSet::new(),
                requests: Vec::new(),
            }),
        }
    }

    /// Set the connected player count
    pub fn set_connected(&self, connected: usize) {
        self.state.lock().connected = connected;
    }

    /// Set the remaining map time
    pub fn set_remaining(&self, remaining: Option<Duration>) {
        self.state.lock().remaining = remaining;
    }

    /// Switch the map being played
    pub fn set_current_map(&self, map: impl Into<MapId>) {
        self.state.lock().current_map = map.into();
    }

    /// Make the server refuse to load `map`
    pub fn mark_invalid(&self, map: impl Into<MapId>) {
        self.state.lock().invalid_maps.insert(map.into());
    }

    /// Move game time forward, consuming remaining time
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.game_time += by;
        if let Some(remaining) = state.remaining.as_mut() {
            *remaining = remaining.saturating_sub(by);
        }
    }

    /// Commands received so far
    pub fn requests(&self) -> Vec<ServerRequest> {
        self.state.lock().requests.clone()
    }

    /// Level changes requested so far
    pub fn level_changes(&self) -> Vec<MapId> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                ServerRequest::LevelChange(map) => Some(map),
                ServerRequest::TimeLimitIncrease(_) => None,
            })
            .collect()
    }

    /// Minutes of every time limit increase requested so far
    pub fn time_limit_increases(&self) -> Vec<u32> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                ServerRequest::TimeLimitIncrease(minutes) => Some(minutes),
                ServerRequest::LevelChange(_) => None,
            })
            .collect()
    }
}

impl ServerEffects for MockServer {
    fn is_map_valid(&self, map: &MapId) -> bool {
        !self.state.lock().invalid_maps.contains(map)
    }

    fn current_map(&self) -> MapId {
        self.state.lock().current_map.clone()
    }

    fn connected_player_count(&self) -> usize {
        self.state.lock().connected
    }

    fn remaining_map_time(&self) -> Option<Duration> {
        self.state.lock().remaining
    }

    fn game_time(&self) -> Duration {
        self.state.lock().game_time
    }

    fn request_time_limit_increase(&self, minutes: u32) {
        let mut state = self.state.lock();
        if let Some(remaining) = state.remaining.as_mut() {
            *remaining += Duration::from_secs(u64::from(minutes) * 60);
        }
        state.requests.push(ServerRequest::TimeLimitIncrease(minutes));
    }

    fn request_level_change(&self, map: &MapId) {
        self.state
            .lock()
            .requests
            .push(ServerRequest::LevelChange(map.clone()));
    }
}
