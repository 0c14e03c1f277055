use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::{BoardError, PlayerError, PlayerId, RosterError, TeamError};

/// Activity ID (unique within the process)
pub type ActivityId = Uuid;

/// Final scores handed from an activity to its owner
pub type ScoreMap = BTreeMap<PlayerId, i64>;

/// Activity lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ActivityPhase {
    /// Accepting players
    Signups,
    /// Round loop is active
    Running,
    /// Finished through the normal end path
    Ended,
    /// Stopped early by an external actor or a fault
    ForceEnded,
}

impl ActivityPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, ActivityPhase::Ended | ActivityPhase::ForceEnded)
    }
}

impl fmt::Display for ActivityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityPhase::Signups => write!(f, "signups"),
            ActivityPhase::Running => write!(f, "running"),
            ActivityPhase::Ended => write!(f, "ended"),
            ActivityPhase::ForceEnded => write!(f, "force-ended"),
        }
    }
}

/// How an activity relates to the rest of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    /// Owns the channel; announces and records its outcome
    Standalone,
    /// Inner game of a convener
    Child { parent: ActivityId },
}

impl ActivityKind {
    pub fn is_standalone(&self) -> bool {
        matches!(self, ActivityKind::Standalone)
    }

    pub fn parent(&self) -> Option<ActivityId> {
        match self {
            ActivityKind::Child { parent } => Some(*parent),
            _ => None,
        }
    }
}

/// Why an activity was stopped before its normal end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceEndReason {
    /// A moderator ended the game
    Moderator,
    /// The process is shutting down
    Shutdown,
    /// The channel went away
    ChannelClosed,
    /// Signups closed without enough players
    NotEnoughPlayers,
    /// A deadline passed without the awaited input
    Expired,
    /// A player stopped the game (reject, cancel)
    Requested(PlayerId),
    /// The convener stopped, taking its inner game with it
    ParentEnded,
    /// The inner game stopped early
    ChildFailed,
    /// The inner game format could not be created
    SpawnFailed(String),
    /// A hook hit a programmer error
    Fault(String),
}

impl fmt::Display for ForceEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForceEndReason::Moderator => write!(f, "ended by a moderator"),
            ForceEndReason::Shutdown => write!(f, "shutdown"),
            ForceEndReason::ChannelClosed => write!(f, "channel closed"),
            ForceEndReason::NotEnoughPlayers => write!(f, "not enough players"),
            ForceEndReason::Expired => write!(f, "expired"),
            ForceEndReason::Requested(player) => write!(f, "requested by {}", player),
            ForceEndReason::ParentEnded => write!(f, "parent game ended"),
            ForceEndReason::ChildFailed => write!(f, "inner game failed"),
            ForceEndReason::SpawnFailed(format) => write!(f, "could not create {}", format),
            ForceEndReason::Fault(message) => write!(f, "fault: {}", message),
        }
    }
}

/// Numeric game options (`points`, `laps`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct GameOptions(BTreeMap<String, i64>);

impl GameOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: i64) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.get(name).copied()
    }

    pub fn get_or(&self, name: &str, default: i64) -> i64 {
        self.get(name).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: i64) {
        self.0.insert(name.to_string(), value);
    }

    /// Later values win
    pub fn merge(&mut self, other: &GameOptions) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), *value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, i64>> for GameOptions {
    fn from(map: BTreeMap<String, i64>) -> Self {
        GameOptions(map)
    }
}

/// Player limits and timing of one activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySettings {
    pub min_players: usize,
    pub max_players: Option<usize>,
    pub signup_timeout_ms: Option<u64>,
    pub round_delay_ms: u64,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: None,
            signup_timeout_ms: None,
            round_delay_ms: 5_000,
        }
    }
}

/// Outcome handed to the outcome recorder at the end of a standalone game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub activity: ActivityId,
    pub channel: String,
    pub format: String,
    pub players: Vec<PlayerId>,
    pub winners: ScoreMap,
    pub points: ScoreMap,
    pub rounds: u32,
}

/// Errors raised by activities and their hooks
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ActivityError {
    #[error("Signups are not open")]
    NotInSignups,

    #[error("Game is not running")]
    NotRunning,

    #[error("Not enough players: need {required}, have {actual}")]
    NotEnoughPlayers { required: usize, actual: usize },

    #[error("Game is full (max {0} players)")]
    Full(usize),

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A hook ran before the state it depends on was set up
    #[error("Missing required state: {0}")]
    MissingState(&'static str),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    #[error("Team error: {0}")]
    Team(#[from] TeamError),
}

impl ActivityError {
    /// Programmer errors abort the activity instead of being reported back
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActivityError::MissingState(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_is_finished() {
        assert!(!ActivityPhase::Signups.is_finished());
        assert!(!ActivityPhase::Running.is_finished());
        assert!(ActivityPhase::Ended.is_finished());
        assert!(ActivityPhase::ForceEnded.is_finished());
    }

    #[test]
    fn test_kind_parent() {
        let parent = Uuid::new_v4();
        assert_eq!(ActivityKind::Child { parent }.parent(), Some(parent));
        assert_eq!(ActivityKind::Standalone.parent(), None);
        assert!(ActivityKind::Standalone.is_standalone());
        assert!(!ActivityKind::Child { parent }.is_standalone());
    }

    #[test]
    fn test_options_merge_later_wins() {
        let mut options = GameOptions::new().with("points", 3).with("laps", 1);
        options.merge(&GameOptions::new().with("points", 10));

        assert_eq!(options.get("points"), Some(10));
        assert_eq!(options.get("laps"), Some(1));
        assert_eq!(options.get_or("rounds", 7), 7);
    }

    #[test]
    fn test_options_serialize_as_plain_map() {
        let options = GameOptions::new().with("points", 5);
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json, serde_json::json!({ "points": 5 }));
    }

    #[test]
    fn test_only_missing_state_is_fatal() {
        assert!(ActivityError::MissingState("teams").is_fatal());
        assert!(!ActivityError::NotRunning.is_fatal());
        assert!(!ActivityError::InvalidAction("roll".to_string()).is_fatal());
    }

    #[test]
    fn test_default_settings() {
        let settings = ActivitySettings::default();
        assert_eq!(settings.min_players, 2);
        assert_eq!(settings.round_delay_ms, 5_000);
        assert!(settings.max_players.is_none());
    }
}
