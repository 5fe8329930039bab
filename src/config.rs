//! World configuration
//!
//! Uses RON (Rusty Object Notation) so settings files stay hand-editable.
//! Every field has a default, so a file only needs the values it changes.

use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};

/// Validation limits to keep a bad settings file from exhausting memory
pub mod limits {
    /// Maximum number of broad-phase cells (width * height)
    pub const MAX_GRID_CELLS: usize = 1 << 22;
    /// Longest substep accepted, in seconds
    pub const MAX_FIXED_STEP: f32 = 1.0;
}

/// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    ValidationError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::SerializeError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            ConfigError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Physics world settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Seconds simulated per substep
    pub fixed_step: f32,
    /// Edge length of one broad-phase cell, in world units
    pub cell_size: f32,
    /// Broad-phase cells along X
    pub grid_width: u32,
    /// Broad-phase cells along Y
    pub grid_height: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            cell_size: 32.0,
            grid_width: 64,
            grid_height: 64,
        }
    }
}

impl PhysicsConfig {
    /// Check that the settings describe a usable world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_step.is_finite() || self.fixed_step <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "fixed_step must be positive, got {}", self.fixed_step
            )));
        }
        if self.fixed_step > limits::MAX_FIXED_STEP {
            return Err(ConfigError::ValidationError(format!(
                "fixed_step too long ({} > {})", self.fixed_step, limits::MAX_FIXED_STEP
            )));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "cell_size must be positive, got {}", self.cell_size
            )));
        }
        let cells = (self.grid_width as usize).checked_mul(self.grid_height as usize);
        if !matches!(cells, Some(cells) if cells <= limits::MAX_GRID_CELLS) {
            return Err(ConfigError::ValidationError(format!(
                "grid too large ({}x{} cells > {})",
                self.grid_width, self.grid_height, limits::MAX_GRID_CELLS
            )));
        }
        Ok(())
    }

    /// World-space extent covered by the broad-phase grid.
    pub fn grid_extent(&self) -> (f32, f32) {
        (
            self.grid_width as f32 * self.cell_size,
            self.grid_height as f32 * self.cell_size,
        )
    }
}

/// Load settings from a RON string (for embedded settings or testing)
pub fn load_config_from_str(s: &str) -> Result<PhysicsConfig, ConfigError> {
    let config: PhysicsConfig = ron::from_str(s)?;
    config.validate()?;
    Ok(config)
}

/// Load settings from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PhysicsConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents).map_err(|e| {
        log::error!("failed to load physics config {}: {}", path.display(), e);
        e
    })?;
    log::debug!("loaded physics config from {}", path.display());
    Ok(config)
}

/// Save settings to a pretty-printed RON file
pub fn save_config<P: AsRef<Path>>(config: &PhysicsConfig, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(2)
        .indentor("  ".to_string());
    let ron_string = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, ron_string)?;
    Ok(())
}
