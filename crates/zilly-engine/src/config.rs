//! Simulation configuration.
//!
//! A config describes one headless run: how many ticks, which physics flags
//! and tuning overrides, the fixture map, and every player's spawn point and
//! scripted inputs. It is read from and written to TOML.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use zilly_collision::MapLayers;
use zilly_common::{MapError, TuningError, MAX_CLIENTS};
use zilly_gameplay::{PhysicsConfig, PlayerInput, TuningParams};

/// Configuration file name.
pub const CONFIG_FILE: &str = "zilly.toml";

/// Upper bound on ticks in one run.
pub const MAX_TICKS: u32 = 1_000_000;

/// Errors raised while loading or checking a simulation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File is not valid TOML for this config
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Fixture map is malformed
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    /// Tuning override names an unknown parameter
    #[error("Tuning error: {0}")]
    Tuning(#[from] TuningError),

    /// Scenario is inconsistent
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// Input a player switches to from `tick` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedInput {
    /// First tick this input applies to
    pub tick: u32,
    /// The input
    #[serde(default)]
    pub input: PlayerInput,
}

/// One simulated player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScript {
    /// Character slot
    pub slot: u16,
    /// Spawn position in world units
    pub spawn: Vec2,
    /// Input changes, in any order
    #[serde(default)]
    pub inputs: Vec<ScriptedInput>,
}

/// Map used by the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Fixture rows, one glyph per tile (see `MapLayers::from_rows`)
    pub rows: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        let width = 32;
        let mut rows = vec![format!("#{}#", ".".repeat(width - 2)); 14];
        rows[0] = "#".repeat(width);
        rows[9] = format!("#{}{}#", ".".repeat(18), "-".repeat(width - 20));
        rows.push("#".repeat(width));
        Self { rows }
    }
}

/// Headless simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks to simulate
    pub ticks: u32,
    /// Seed for choosing between hook teleport destinations
    pub seed: u64,
    /// Apply scripted inputs (off simulates passive bodies)
    pub use_input: bool,
    /// Round every core to its network form after each tick
    pub quantize: bool,
    /// Trace output file (stdout when unset)
    pub trace_path: Option<PathBuf>,
    /// Physics behaviour flags
    pub physics: PhysicsConfig,
    /// Tuning overrides by parameter name, applied to both tuning sets
    pub tuning: BTreeMap<String, f32>,
    /// Map
    pub map: MapConfig,
    /// Players
    pub players: Vec<PlayerScript>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let walk_right = PlayerInput {
            direction: 1,
            target_x: 1,
            ..PlayerInput::default()
        };
        let jump_and_hook = PlayerInput {
            jump: 1,
            hook: 1,
            target_x: 10,
            target_y: -10,
            ..walk_right
        };
        Self {
            ticks: 250,
            seed: 0,
            use_input: true,
            quantize: true,
            trace_path: None,
            physics: PhysicsConfig::default(),
            tuning: BTreeMap::new(),
            map: MapConfig::default(),
            players: vec![
                PlayerScript {
                    slot: 0,
                    spawn: Vec2::new(80.0, 400.0),
                    inputs: vec![
                        ScriptedInput {
                            tick: 0,
                            input: walk_right,
                        },
                        ScriptedInput {
                            tick: 40,
                            input: jump_and_hook,
                        },
                        ScriptedInput {
                            tick: 120,
                            input: PlayerInput::default(),
                        },
                    ],
                },
                PlayerScript {
                    slot: 1,
                    spawn: Vec2::new(400.0, 400.0),
                    inputs: Vec::new(),
                },
            ],
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Load configuration from a specific path, reporting any failure.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp ranges and check the scenario is consistent.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.ticks = self.ticks.clamp(1, MAX_TICKS);

        if self.map.rows.is_empty() {
            return Err(ConfigError::Invalid("map has no rows".to_string()));
        }
        let rows: Vec<&str> = self.map.rows.iter().map(String::as_str).collect();
        MapLayers::from_rows(&rows)?;

        for name in self.tuning.keys() {
            TuningParams::index_of(name)?;
        }

        let mut seen = BTreeSet::new();
        for player in &self.players {
            if usize::from(player.slot) >= MAX_CLIENTS {
                return Err(ConfigError::Invalid(format!(
                    "player slot {} outside 0..{MAX_CLIENTS}",
                    player.slot
                )));
            }
            if !seen.insert(player.slot) {
                return Err(ConfigError::Invalid(format!(
                    "player slot {} used twice",
                    player.slot
                )));
            }
            if !player.spawn.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "player slot {} has a non-finite spawn",
                    player.slot
                )));
            }
        }
        Ok(())
    }

    /// Tuning set with the overrides applied.
    pub fn tuning_params(&self) -> Result<TuningParams, TuningError> {
        let mut params = TuningParams::default();
        for (name, value) in &self.tuning {
            params.set_by_name(name, *value)?;
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let mut config = SimConfig::default();
        assert_eq!(config.ticks, 250);
        assert!(config.physics.ddrace_prediction);
        assert_eq!(config.players.len(), 2);
        assert!(config.validate().is_ok());

        let width = config.map.rows[0].len();
        assert!(config.map.rows.iter().all(|r| r.len() == width));
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();
        config.ticks = 0;
        config.validate().expect("valid");
        assert_eq!(config.ticks, 1);

        config.players[1].slot = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.players[1].slot = 64;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.players[1].slot = 1;
        config.tuning.insert("warp".to_string(), 1.0);
        assert!(matches!(config.validate(), Err(ConfigError::Tuning(_))));

        config.tuning.clear();
        config.map.rows.push("..?".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Map(_))));
    }

    #[test]
    fn test_tuning_overrides() {
        let mut config = SimConfig::default();
        config.tuning.insert("Gravity".to_string(), 0.25);
        let params = config.tuning_params().expect("known name");
        assert_eq!(params.gravity.get(), 0.25);
        assert_eq!(params.hook_length.get(), 380.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = SimConfig::default();
        config.ticks = 77;
        config.seed = 12345;
        config.physics.old_teleport_hook = true;
        config.tuning.insert("hook_length".to_string(), 400.0);

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::try_load_from(&config_path).expect("Failed to load config");
        assert_eq!(loaded.ticks, 77);
        assert_eq!(loaded.seed, 12345);
        assert!(loaded.physics.old_teleport_hook);
        assert_eq!(loaded.tuning.get("hook_length"), Some(&400.0));
        assert_eq!(loaded.map, config.map);
        assert_eq!(loaded.players, config.players);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(
            &config_path,
            "ticks = 10\n\n[[players]]\nslot = 3\nspawn = [64.0, 64.0]\n\n[[players.inputs]]\ntick = 0\ninput = { direction = -1 }\n",
        )
        .expect("write");

        let config = SimConfig::try_load_from(&config_path).expect("parse");
        assert_eq!(config.ticks, 10);
        assert!(config.use_input);
        assert_eq!(config.players.len(), 1);
        assert_eq!(config.players[0].inputs[0].input.direction, -1);
        assert_eq!(config.players[0].inputs[0].input.target_x, 0);
        assert_eq!(config.map, MapConfig::default());
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/zilly.toml");
        assert_eq!(config.ticks, 250);
        assert!(matches!(
            SimConfig::try_load_from("/nonexistent/path/zilly.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_config_load_garbage_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "ticks = \"many\"").expect("write");

        assert!(matches!(
            SimConfig::try_load_from(&config_path),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(SimConfig::load_from(&config_path).ticks, 250);
    }
}
