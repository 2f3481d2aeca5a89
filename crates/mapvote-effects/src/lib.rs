//! Mapvote Effects - Production Effect Handlers
//!
//! Real implementations of the effect traits defined in `mapvote-core`, plus
//! the async runtime that hosts a controller.
//!
//! # Handlers
//!
//! - [`TokioScheduler`]: timers as spawned tokio tasks posting into the engine channel
//! - [`RealRandomHandler`]: thread-local RNG
//! - [`FileMapSource`], [`StaticMapSource`]: candidate map lists
//! - [`config::load_or_default`]: TOML configuration on disk
//!
//! # Runtime
//!
//! [`MapVoteRuntime`] owns the controller in a single task and serializes every
//! event through one command channel; [`MapVoteHandle`] is the cloneable
//! front end used by the game server integration.

#![forbid(unsafe_code)]

pub mod config;
pub mod map_source;
pub mod random;
pub mod runtime;
pub mod scheduler;

pub use config::load_or_default;
pub use map_source::{parse_map_list, FileMapSource, StaticMapSource, DEFAULT_MAPS};
pub use random::RealRandomHandler;
pub use runtime::{
    EngineCommand, HostEffects, MapVoteHandle, MapVoteRuntime, RuntimeEffects, RuntimeError,
    RuntimeResult,
};
pub use scheduler::TokioScheduler;
