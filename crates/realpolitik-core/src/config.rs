//! Configuration loading and typed config structures for a Realpolitik game.
//!
//! The canonical configuration lives in `realpolitik-config.yaml` at the
//! project root. Every field has a default, so an empty document is a valid
//! configuration. [`GameConfig::validate`] runs before a game is built.

use std::path::Path;

use realpolitik_agents::{DetectionConfig, MemoryConfig, TechTree};
use realpolitik_types::{ObservationMode, ResourceDistribution};
use realpolitik_world::spread_anchors;
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot be used.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// How decisions are fetched each turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionScheduling {
    /// Build all views, fetch all decisions at once, apply in order.
    #[default]
    Concurrent,
    /// Build, fetch, and apply one civilization at a time.
    Sequential,
}

/// Top-level game configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Map width in tiles.
    #[serde(default = "default_map_size")]
    pub map_width: u32,

    /// Map height in tiles.
    #[serde(default = "default_map_size")]
    pub map_height: u32,

    /// Number of civilizations.
    #[serde(default = "default_civilizations")]
    pub civilizations: u32,

    /// The game stops after this turn.
    #[serde(default = "default_max_turns")]
    pub max_turns: u64,

    /// Delay between autoplay turns in milliseconds.
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,

    /// Tile-resource frequency mode.
    #[serde(default)]
    pub resource_distribution: ResourceDistribution,

    /// Technologies every civilization starts with.
    #[serde(default = "default_starting_technologies")]
    pub starting_technologies: Vec<String>,

    /// When false every tile is visible to every civilization.
    #[serde(default = "default_true")]
    pub fog_of_war: bool,

    /// Initial observation mode for the presentation layer.
    #[serde(default)]
    pub observation_mode: ObservationMode,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Decision fetch mode.
    #[serde(default)]
    pub decision_scheduling: DecisionScheduling,

    /// Milliseconds a provider has before its decision is dropped.
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Whether random events fire.
    #[serde(default = "default_true")]
    pub random_events: bool,

    /// Memory retrieval limits.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Behavior detection thresholds and score weights.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Observer HTTP server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_width: default_map_size(),
            map_height: default_map_size(),
            civilizations: default_civilizations(),
            max_turns: default_max_turns(),
            turn_delay_ms: default_turn_delay_ms(),
            resource_distribution: ResourceDistribution::default(),
            starting_technologies: default_starting_technologies(),
            fog_of_war: true,
            observation_mode: ObservationMode::default(),
            seed: default_seed(),
            decision_scheduling: DecisionScheduling::default(),
            decision_timeout_ms: default_decision_timeout_ms(),
            random_events: true,
            memory: MemoryConfig::default(),
            detection: DetectionConfig::default(),
            observer: ObserverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `REALPOLITIK_SEED` overrides `seed`
    /// - `REALPOLITIK_MAX_TURNS` overrides `max_turns`
    /// - `OBSERVER_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override is not a number.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("REALPOLITIK_SEED") {
            self.seed = parse_override("seed", &val)?;
        }
        if let Some(val) = lookup("REALPOLITIK_MAX_TURNS") {
            self.max_turns = parse_override("max_turns", &val)?;
        }
        if let Some(val) = lookup("OBSERVER_PORT") {
            self.observer.port = parse_override("observer.port", &val)?;
        }
        Ok(())
    }

    /// Check the values make a playable game.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self, tree: &TechTree) -> Result<(), ConfigError> {
        if self.map_width == 0 || self.map_height == 0 {
            return Err(ConfigError::Invalid {
                field: "map_width",
                reason: format!("map must be non-empty, got {}x{}", self.map_width, self.map_height),
            });
        }
        if self.civilizations == 0 {
            return Err(ConfigError::Invalid {
                field: "civilizations",
                reason: "at least one civilization is required".to_owned(),
            });
        }
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid {
                field: "max_turns",
                reason: "must be at least 1".to_owned(),
            });
        }
        if let Err(err) = spread_anchors(self.map_width, self.map_height, self.civilizations) {
            return Err(ConfigError::Invalid {
                field: "civilizations",
                reason: err.to_string(),
            });
        }
        for tech in &self.starting_technologies {
            if tree.canonical(tech).is_none() {
                return Err(ConfigError::Invalid {
                    field: "starting_technologies",
                    reason: format!("unknown technology `{tech}`"),
                });
            }
        }
        let weights = &self.detection.weights;
        if weights.total() <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "detection.weights",
                reason: "weights must sum to a positive value".to_owned(),
            });
        }
        Ok(())
    }
}

fn parse_override<T: core::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_parse_err| ConfigError::Invalid {
        field,
        reason: format!("`{raw}` is not a valid number"),
    })
}

/// Observer HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Whether to start the observer server.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_map_size() -> u32 {
    20
}

const fn default_civilizations() -> u32 {
    4
}

const fn default_max_turns() -> u64 {
    100
}

const fn default_turn_delay_ms() -> u64 {
    1000
}

fn default_starting_technologies() -> Vec<String> {
    vec!["agriculture".to_owned()]
}

const fn default_seed() -> u64 {
    42
}

const fn default_decision_timeout_ms() -> u64 {
    30_000
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    fn parse_without_env(yaml: &str) -> GameConfig {
        let mut config: GameConfig = serde_yml::from_str(yaml).unwrap();
        config.apply_overrides(no_env).unwrap();
        config
    }

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert_eq!(config.map_width, 20);
        assert_eq!(config.civilizations, 4);
        assert_eq!(config.decision_scheduling, DecisionScheduling::Concurrent);
        assert_eq!(config.starting_technologies, vec!["agriculture".to_owned()]);
        assert!(config.validate(&TechTree::new()).is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
map_width: 8
map_height: 8
civilizations: 2
max_turns: 5
turn_delay_ms: 0
resource_distribution: scarce
starting_technologies: [agriculture, mining]
fog_of_war: false
observation_mode: diplomatic
seed: 7
decision_scheduling: sequential
decision_timeout_ms: 500
random_events: false

memory:
  token_budget: 800
  decision_cap: 2

detection:
  deception_severe: 4
  weights:
    deception: 5.0

observer:
  host: "127.0.0.1"
  port: 9090

logging:
  level: "debug"
"#;
        let config = parse_without_env(yaml);
        assert_eq!(config.map_width, 8);
        assert_eq!(config.resource_distribution, ResourceDistribution::Scarce);
        assert!(!config.fog_of_war);
        assert_eq!(config.observation_mode, ObservationMode::Diplomatic);
        assert_eq!(config.decision_scheduling, DecisionScheduling::Sequential);
        assert_eq!(config.memory.token_budget, 800);
        assert_eq!(config.memory.decision_cap, 2);
        // Unset memory caps keep their defaults.
        assert_eq!(config.memory.reflection_cap, 3);
        assert_eq!(config.detection.deception_severe, 4);
        assert!((config.detection.weights.deception - 5.0).abs() < f64::EPSILON);
        assert!((config.detection.weights.betrayal - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.observer.port, 9090);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate(&TechTree::new()).is_ok());
    }

    #[test]
    fn parse_empty_yaml() {
        let config = GameConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn overrides_apply() {
        let mut config = GameConfig::default();
        config
            .apply_overrides(|key| match key {
                "REALPOLITIK_SEED" => Some("99".to_owned()),
                "OBSERVER_PORT" => Some("3001".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.observer.port, 3001);
        assert_eq!(config.max_turns, 100);
    }

    #[test]
    fn bad_override_is_rejected() {
        let mut config = GameConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "REALPOLITIK_MAX_TURNS").then(|| "lots".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { field: "max_turns", .. })));
    }

    #[test]
    fn validation_failures() {
        let tree = TechTree::new();
        let config = GameConfig {
            civilizations: 0,
            ..GameConfig::default()
        };
        assert!(config.validate(&tree).is_err());

        let config = GameConfig {
            map_width: 2,
            map_height: 2,
            civilizations: 9,
            ..GameConfig::default()
        };
        assert!(config.validate(&tree).is_err());

        let config = GameConfig {
            starting_technologies: vec!["teleportation".to_owned()],
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(&tree),
            Err(ConfigError::Invalid { field: "starting_technologies", .. })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("realpolitik-config.yaml");
        if path.exists() {
            let config = GameConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
