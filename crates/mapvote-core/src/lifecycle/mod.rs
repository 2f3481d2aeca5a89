//! Lifecycle controller
//!
//! Orchestrates one map session: the repeating remaining-time poll, ballot
//! triggers (time limit, rock-the-vote, forced), ballot close and its outcome,
//! and the delayed level change.
//!
//! Every timer carries the [`SessionToken`](crate::effects::SessionToken) of
//! the session that scheduled it; a timer from an earlier session is ignored
//! even if the host fails to cancel it.

mod controller;
mod session;
mod status;

pub use controller::MapVoteController;
pub use session::{SessionPhase, SessionState};
pub use status::{BallotStatus, EngineStatus, ThresholdStatus};
