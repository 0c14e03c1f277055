use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{ActivitySettings, GameOptions};

/// Per-channel limits and timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChannelSettings {
    pub min_players: usize,
    pub max_players: Option<usize>,
    /// Start (or give up) this long after signups open
    pub signup_timeout_ms: Option<u64>,
    /// Delay between a round's UI being acknowledged and the next round
    pub round_delay_ms: u64,
    /// New games are refused for this long after a game ends
    pub cooldown_ms: Option<u64>,
    /// A challenger must wait this long before issuing another challenge
    pub challenge_cooldown_ms: Option<u64>,
    /// How long a defender has to accept a challenge
    pub challenge_accept_ms: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: None,
            signup_timeout_ms: None,
            round_delay_ms: 5_000,
            cooldown_ms: None,
            challenge_cooldown_ms: None,
            challenge_accept_ms: 120_000,
        }
    }
}

impl ChannelSettings {
    pub fn activity_settings(&self) -> ActivitySettings {
        ActivitySettings {
            min_players: self.min_players,
            max_players: self.max_players,
            signup_timeout_ms: self.signup_timeout_ms,
            round_delay_ms: self.round_delay_ms,
        }
    }
}

/// Per-channel overrides; unset fields fall back to the defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChannelOverrides {
    pub min_players: Option<usize>,
    pub max_players: Option<usize>,
    pub signup_timeout_ms: Option<u64>,
    pub round_delay_ms: Option<u64>,
    pub cooldown_ms: Option<u64>,
    pub challenge_cooldown_ms: Option<u64>,
    pub challenge_accept_ms: Option<u64>,
}

impl ChannelOverrides {
    fn apply(&self, base: &ChannelSettings) -> ChannelSettings {
        ChannelSettings {
            min_players: self.min_players.unwrap_or(base.min_players),
            max_players: self.max_players.or(base.max_players),
            signup_timeout_ms: self.signup_timeout_ms.or(base.signup_timeout_ms),
            round_delay_ms: self.round_delay_ms.unwrap_or(base.round_delay_ms),
            cooldown_ms: self.cooldown_ms.or(base.cooldown_ms),
            challenge_cooldown_ms: self.challenge_cooldown_ms.or(base.challenge_cooldown_ms),
            challenge_accept_ms: self.challenge_accept_ms.unwrap_or(base.challenge_accept_ms),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Engine configuration, populated externally and read-only to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    pub defaults: ChannelSettings,

    /// Keyed by channel name
    pub channels: BTreeMap<String, ChannelOverrides>,

    /// Option overrides applied to every instance of a format
    pub format_options: BTreeMap<String, GameOptions>,

    /// Option overrides applied when a format runs as the inner game of a
    /// head-to-head challenge
    pub challenge_options: BTreeMap<String, GameOptions>,

    /// Fixed RNG seed for reproducible shuffles and dice
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut all = vec![("defaults".to_string(), self.defaults.clone())];
        all.extend(
            self.channels
                .keys()
                .map(|name| (format!("channels.{}", name), self.channel(name))),
        );

        for (scope, settings) in all {
            if settings.min_players == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.min_players", scope),
                    reason: "must be at least 1".to_string(),
                });
            }
            if let Some(max) = settings.max_players {
                if max < settings.min_players {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}.max_players", scope),
                        reason: format!("{} is below min_players {}", max, settings.min_players),
                    });
                }
            }
        }
        Ok(())
    }

    /// Effective settings for a channel
    pub fn channel(&self, channel: &str) -> ChannelSettings {
        match self.channels.get(channel) {
            Some(overrides) => overrides.apply(&self.defaults),
            None => self.defaults.clone(),
        }
    }

    pub fn format_options(&self, format: &str) -> Option<&GameOptions> {
        self.format_options.get(format)
    }

    pub fn challenge_options(&self, format: &str) -> Option<&GameOptions> {
        self.challenge_options.get(format)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_defaults(mut self, defaults: ChannelSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_round_delay(mut self, ms: u64) -> Self {
        self.defaults.round_delay_ms = ms;
        self
    }

    pub fn with_cooldown(mut self, ms: u64) -> Self {
        self.defaults.cooldown_ms = Some(ms);
        self
    }

    pub fn with_channel(mut self, channel: &str, overrides: ChannelOverrides) -> Self {
        self.channels.insert(channel.to_string(), overrides);
        self
    }

    pub fn with_format_options(mut self, format: &str, options: GameOptions) -> Self {
        self.format_options.insert(format.to_string(), options);
        self
    }

    pub fn with_challenge_options(mut self, format: &str, options: GameOptions) -> Self {
        self.challenge_options.insert(format.to_string(), options);
        self
    }

    /// JSON schema of the configuration file
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(EngineConfig);
        serde_json::to_value(schema).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.defaults.min_players, 2);
        assert_eq!(config.defaults.round_delay_ms, 5_000);
        assert_eq!(config.defaults.challenge_accept_ms, 120_000);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_channel_overrides() {
        let config = EngineConfig::from_json(
            r#"{
                "defaults": { "round_delay_ms": 3000 },
                "channels": { "lobby": { "max_players": 6, "cooldown_ms": 60000 } }
            }"#,
        )
        .unwrap();

        let lobby = config.channel("lobby");
        assert_eq!(lobby.max_players, Some(6));
        assert_eq!(lobby.cooldown_ms, Some(60_000));
        assert_eq!(lobby.round_delay_ms, 3_000);

        let other = config.channel("other");
        assert_eq!(other.max_players, None);
    }

    #[test]
    fn test_option_maps() {
        let config = EngineConfig::from_json(
            r#"{ "challenge_options": { "pointrace": { "points": 7 } } }"#,
        )
        .unwrap();

        let options = config.challenge_options("pointrace").unwrap();
        assert_eq!(options.get("points"), Some(7));
        assert!(config.format_options("pointrace").is_none());
    }

    #[test]
    fn test_invalid_max_players() {
        let result = EngineConfig::from_json(
            r#"{ "channels": { "tiny": { "min_players": 4, "max_players": 2 } } }"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "channels.tiny.max_players"
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_json("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_seed(42)
            .with_round_delay(100)
            .with_cooldown(1_000)
            .with_format_options("laprace", GameOptions::new().with("laps", 2));

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.defaults.round_delay_ms, 100);
        assert_eq!(config.defaults.cooldown_ms, Some(1_000));
        assert_eq!(
            config.format_options("laprace").and_then(|o| o.get("laps")),
            Some(2)
        );
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = EngineConfig::json_schema().to_string();
        assert!(schema.contains("challenge_options"));
        assert!(schema.contains("round_delay_ms"));
    }
}
