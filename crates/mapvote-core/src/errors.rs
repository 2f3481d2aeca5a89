//! Error types for the map voting engine
//!
//! Player-facing failures are reported as `MapVoteError` values for the host
//! to render. None of them leave the engine in an inconsistent state.

use serde::{Deserialize, Serialize};

use crate::types::MapId;

/// Errors returned by nomination, threshold-vote and ballot operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MapVoteError {
    /// No catalog map matches the query
    #[error("Map '{query}' not found")]
    NotFound {
        /// The name the player asked for
        query: String,
    },

    /// The map exists but cannot be nominated right now
    #[error("Map '{map}' is unavailable: {reason}")]
    Unavailable {
        /// Resolved catalog map
        map: MapId,
        /// Why the map is unavailable
        reason: UnavailableReason,
    },

    /// The player already nominated this exact map
    #[error("You already nominated '{map}'")]
    AlreadyNominatedBySelf {
        /// The player's standing nomination
        map: MapId,
    },

    /// The nomination cap is reached
    #[error("The maximum of {max} nominations has been reached")]
    LimitReached {
        /// Configured cap
        max: usize,
    },

    /// The player is already a participant of this threshold vote
    #[error("You have already voted")]
    AlreadyVoted,

    /// The threshold vote has already passed for this episode
    #[error("This vote is no longer accepting votes")]
    VoteNotActive,

    /// Too few players are connected to start a threshold vote
    #[error("At least {required} players must be connected (currently {connected})")]
    NotEnoughPlayers {
        /// Configured minimum
        required: usize,
        /// Current connected count
        connected: usize,
    },

    /// No ballot is open
    #[error("No map vote is open")]
    NotOpen,

    /// The chosen option is not on the open ballot
    #[error("'{option}' is not an option on this ballot")]
    InvalidOption {
        /// Display form of the rejected option
        option: String,
    },

    /// The feature is disabled by configuration
    #[error("This vote is currently disabled")]
    Disabled,

    /// A ballot is currently open
    #[error("A map vote is already in progress")]
    VoteInProgress,

    /// The session already decided its outcome
    #[error("The map vote has already completed for this map")]
    AlreadyResolved,

    /// Vote-extend already succeeded on this map
    #[error("The map has already been extended")]
    AlreadyExtended,

    /// The vote-extend window has not opened yet
    #[error("An extend vote can only be started in the last {allowed_minutes} minutes of the map")]
    ExtendWindowClosed {
        /// Configured window length
        allowed_minutes: u32,
    },

    /// A level change has already been scheduled
    #[error("The map is already changing to '{map}'")]
    LevelChangePending {
        /// Scheduled next map
        map: MapId,
    },

    /// No map is eligible for a ballot
    #[error("No eligible maps are available")]
    NoEligibleMaps,
}

/// Why an existing map cannot be nominated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnavailableReason {
    /// Another player holds a nomination for it
    AlreadyNominated,
    /// It is the map currently being played
    CurrentMap,
    /// It is in the session exclusion set (recently played)
    Excluded,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            UnavailableReason::AlreadyNominated => "already nominated",
            UnavailableReason::CurrentMap => "it is the current map",
            UnavailableReason::Excluded => "excluded from nominations",
        };
        f.write_str(text)
    }
}

/// Errors raised while building the candidate map catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The upstream map source failed
    #[error("Map source unavailable: {reason}")]
    Unavailable {
        /// Failure description from the source
        reason: String,
    },

    /// No candidate survived validation and filtering
    #[error("No eligible maps in catalog")]
    NoEligibleMaps,

    /// Reading or writing a map list file failed
    #[error("Map list I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Create an unavailable-source error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML text could not be parsed
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The defaults could not be written out
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Create an out-of-range error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Standard result type for engine operations
pub type Result<T> = std::result::Result<T, MapVoteError>;
