use serde::{Deserialize, Serialize};

/// Errors raised while building or validating a [`WorldConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid size must be at least 1")]
    ZeroSize,
    #[error("grid size {0} does not fit the coordinate type")]
    SizeTooLarge(usize),
    #[error("failed to parse world config: {0}")]
    Parse(String),
}

/// Construction-time settings of a Wumpus world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Side length of the square board.
    pub size: usize,
    /// Number of pits drawn at construction.
    pub hazard_count: usize,
    /// Arrows the agent holds after every reset.
    pub max_charges: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            size: 4,
            hazard_count: 3,
            max_charges: 1,
        }
    }
}

impl WorldConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_hazard_count(mut self, hazard_count: usize) -> Self {
        self.hazard_count = hazard_count;
        self
    }

    pub fn with_max_charges(mut self, max_charges: u32) -> Self {
        self.max_charges = max_charges;
        self
    }

    /// Checks the config can back a world. Zero pits is allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if i32::try_from(self.size).is_err() {
            return Err(ConfigError::SizeTooLarge(self.size));
        }
        Ok(())
    }

    /// Number of cells on the board.
    pub fn cell_count(&self) -> usize {
        self.size.saturating_mul(self.size)
    }
}
