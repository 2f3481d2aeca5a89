//! Mapvote Testing Infrastructure
//!
//! Deterministic implementations of every engine effect trait plus fixtures
//! shared by the integration tests of the workspace crates.
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! mapvote-testkit = { path = "../mapvote-testkit" }
//! ```
//!
//! Then in your tests:
//! ```rust,no_run
//! use mapvote_testkit::*;
//!
//! let env = TestEnv::new("surf_beginner", 42);
//! let mut controller = controller_with(test_config(), surf_catalog());
//! controller.start_map(&env);
//! env.set_remaining(std::time::Duration::from_secs(9 * 60));
//! env.run_for(&mut controller, std::time::Duration::from_secs(5));
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod env;
pub mod fixtures;
pub mod map_source;
pub mod notices;
pub mod random;
pub mod scheduler;
pub mod server;
pub mod strategies;

pub use env::*;
pub use fixtures::*;
pub use map_source::*;
pub use notices::*;
pub use random::*;
pub use scheduler::*;
pub use server::*;

/// Install a test tracing subscriber once; later calls are no-ops
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("mapvote_core=debug,mapvote_effects=debug"))
        .with_test_writer()
        .try_init();
}
