//! Engine configuration.
//!
//! Every section deserializes with defaults, so a partial TOML file (or an
//! empty one) yields a working configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::TierRange;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapVoteConfig {
    /// Nomination registry settings
    pub nominations: NominationConfig,
    /// Ballot and scheduling settings
    pub ballot: BallotConfig,
    /// Rock-the-vote threshold settings
    pub rock_the_vote: ThresholdConfig,
    /// Vote-extend settings
    pub vote_extend: VoteExtendConfig,
    /// Catalog filtering settings
    pub catalog: CatalogConfig,
}

/// Nomination settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NominationConfig {
    /// Maximum number of standing nominations
    pub max_nominations: usize,
    /// Refuse nominations of the map currently being played
    pub exclude_current: bool,
    /// Group the nomination menu by tier
    pub tiered_menu: bool,
    /// Number of previously played maps excluded from nominations and ballots
    pub exclude_recent_maps: usize,
}

impl Default for NominationConfig {
    fn default() -> Self {
        Self {
            max_nominations: 5,
            exclude_current: true,
            tiered_menu: true,
            exclude_recent_maps: 3,
        }
    }
}

/// Ballot construction and scheduling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotConfig {
    /// Number of map slots on the ballot
    pub include_maps: usize,
    /// How long the ballot stays open
    pub vote_duration_secs: u64,
    /// Open the ballot when this many minutes of map time remain
    pub start_time_minutes: u32,
    /// Cadence of the remaining-time check
    pub poll_interval_secs: u64,
    /// Grace delay between the result and the level change
    pub change_delay_secs: u64,
    /// Offer an "extend current map" option
    pub extend: bool,
    /// Maximum ballot extensions per map
    pub max_extends: u32,
    /// Minutes added by a ballot extension
    pub extend_time_minutes: u32,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            include_maps: 5,
            vote_duration_secs: 30,
            start_time_minutes: 10,
            poll_interval_secs: 5,
            change_delay_secs: 5,
            extend: true,
            max_extends: 2,
            extend_time_minutes: 15,
        }
    }
}

impl BallotConfig {
    /// Ballot window
    pub fn vote_duration(&self) -> Duration {
        Duration::from_secs(self.vote_duration_secs)
    }

    /// Remaining-time threshold that opens the ballot
    pub fn start_threshold(&self) -> Duration {
        Duration::from_secs(u64::from(self.start_time_minutes) * 60)
    }

    /// Poll cadence
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Level change grace delay
    pub fn change_delay(&self) -> Duration {
        Duration::from_secs(self.change_delay_secs)
    }
}

/// Settings shared by every threshold vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Feature switch
    pub enabled: bool,
    /// Fraction of connected players needed to pass, in (0, 1]
    pub percentage: f64,
    /// Connected players required before an episode may start
    pub min_players: usize,
    /// Episode lifetime; `None` keeps it open until it passes or the map ends
    pub vote_duration_secs: Option<u64>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            percentage: 0.60,
            min_players: 2,
            vote_duration_secs: None,
        }
    }
}

impl ThresholdConfig {
    /// Episode lifetime, if bounded
    pub fn vote_duration(&self) -> Option<Duration> {
        self.vote_duration_secs.map(Duration::from_secs)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !(self.percentage > 0.0 && self.percentage <= 1.0) {
            return Err(ConfigError::invalid(
                field,
                format!("percentage must be in (0, 1], got {}", self.percentage),
            ));
        }
        if self.vote_duration_secs == Some(0) {
            return Err(ConfigError::invalid(field, "vote duration must be positive"));
        }
        Ok(())
    }
}

/// Vote-extend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteExtendConfig {
    /// Feature switch
    pub enabled: bool,
    /// Fraction of connected players needed to pass, in (0, 1]
    pub percentage: f64,
    /// Connected players required before an episode may start
    pub min_players: usize,
    /// Episode lifetime; `None` keeps it open until it passes or the map ends
    pub vote_duration_secs: Option<u64>,
    /// Minutes added when the vote passes
    pub extend_time_minutes: u32,
    /// Episodes may only start within this many minutes of the time limit
    pub allow_time_remaining_minutes: u32,
}

impl Default for VoteExtendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            percentage: 0.60,
            min_players: 2,
            vote_duration_secs: Some(30),
            extend_time_minutes: 15,
            allow_time_remaining_minutes: 10,
        }
    }
}

impl VoteExtendConfig {
    /// Threshold parameters of the vote
    pub fn threshold(&self) -> ThresholdConfig {
        ThresholdConfig {
            enabled: self.enabled,
            percentage: self.percentage,
            min_players: self.min_players,
            vote_duration_secs: self.vote_duration_secs,
        }
    }

    /// Window in which a vote-extend episode may start
    pub fn allow_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.allow_time_remaining_minutes) * 60)
    }
}

/// Catalog filtering settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Lowest tier served; `None` disables tier filtering
    pub server_tier: Option<i32>,
    /// Highest tier served; defaults to `server_tier`
    pub server_tier_max: Option<i32>,
    /// Maps used when every map source fails
    pub fallback_maps: Vec<String>,
}

impl CatalogConfig {
    /// Tier window derived from the server tier settings
    pub fn tier_range(&self) -> Option<TierRange> {
        self.server_tier
            .map(|min| TierRange::new(min, self.server_tier_max.unwrap_or(min)))
    }
}

impl MapVoteConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ballot.include_maps == 0 {
            return Err(ConfigError::invalid(
                "ballot.include_maps",
                "must be at least 1",
            ));
        }
        if self.ballot.vote_duration_secs == 0 {
            return Err(ConfigError::invalid(
                "ballot.vote_duration_secs",
                "must be positive",
            ));
        }
        if self.ballot.poll_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "ballot.poll_interval_secs",
                "must be positive",
            ));
        }
        self.rock_the_vote.validate("rock_the_vote")?;
        self.vote_extend.threshold().validate("vote_extend")?;
        Ok(())
    }
}
