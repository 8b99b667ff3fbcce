//! TOML game configuration: board geometry, economy, archetypes and rosters.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use hexa_core::{ArchetypeKey, ArchetypeTable, Delivery, HexLayout, Point, Team};
use hexa_system_rounds::Reinforcements;
use serde::Deserialize;
use thiserror::Error;

const BUILTIN_CONFIG: &str = include_str!("../config/default.toml");

/// Errors raised while loading or validating a [`GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config at {}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
    /// The document parsed but describes an unusable game.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Gold economy settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Economy {
    /// Gold held when the session starts.
    pub starting_gold: u32,
    /// Gold granted for each won round.
    pub round_reward: u32,
}

/// One unit of the opening roster.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RosterEntry {
    /// Archetype of the unit.
    pub archetype: ArchetypeKey,
    /// Team the unit fights for.
    pub team: Team,
    /// Initial world-space position, snapped to a cell after spawning.
    pub position: Point,
}

/// Complete description of a game session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Hex lattice geometry.
    pub grid: HexLayout,
    /// Starting gold and round reward.
    pub economy: Economy,
    /// Extra enemies added after each won round.
    pub reinforcements: Reinforcements,
    /// Archetypes offered for purchase.
    #[serde(default)]
    pub shop: Vec<ArchetypeKey>,
    /// Base statistics of every archetype.
    pub archetypes: ArchetypeTable,
    /// Units present when the session starts.
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
}

impl GameConfig {
    /// Configuration shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_CONFIG)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks that the configuration describes a playable game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.rows() == 0 || self.grid.columns() == 0 {
            return Err(invalid("grid must have at least one row and one column"));
        }
        if !(self.grid.cell_radius().is_finite() && self.grid.cell_radius() > 0.0) {
            return Err(invalid("grid cell_radius must be positive"));
        }
        if !(self.grid.cell_margin().is_finite() && self.grid.cell_margin() >= 0.0) {
            return Err(invalid("grid cell_margin must not be negative"));
        }
        if self.archetypes.is_empty() {
            return Err(invalid("at least one archetype must be defined"));
        }

        for (key, stats) in self.archetypes.iter() {
            if stats.hp() == 0 {
                return Err(invalid(format!("archetype `{key}` must have positive hp")));
            }
            if !(stats.move_speed().is_finite() && stats.move_speed() >= 0.0) {
                return Err(invalid(format!(
                    "archetype `{key}` must have a non-negative move_speed"
                )));
            }
            if let Delivery::Projectile { speed } = stats.delivery() {
                if !(speed.is_finite() && speed > 0.0) {
                    return Err(invalid(format!(
                        "archetype `{key}` must have a positive projectile speed"
                    )));
                }
            }
        }

        for key in &self.shop {
            self.require_archetype(key, "shop")?;
        }
        for entry in &self.roster {
            self.require_archetype(&entry.archetype, "roster")?;
        }
        self.require_archetype(self.reinforcements.archetype(), "reinforcements")?;
        Ok(())
    }

    fn require_archetype(&self, key: &ArchetypeKey, section: &str) -> Result<(), ConfigError> {
        if self.archetypes.contains(key) {
            Ok(())
        } else {
            Err(invalid(format!(
                "{section} references unknown archetype `{key}`"
            )))
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
