//! Simulation configuration.
//!
//! Every tunable lives here with a sensible default, so an empty JSON object
//! is a valid configuration. Physical constants stay in
//! `ventwork_logic::constants`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use ventwork_logic::ambient::{AmbientAtmosphere, AmbientPreset};
use ventwork_logic::constants::{thermal_defaults, MIN_TEMPERATURE, MIN_VOLUME, VACUUM_PRESSURE_FLOOR};
use ventwork_logic::flood::FloodSettings;
use ventwork_logic::node::SafetyFloors;
use ventwork_logic::thermal::ThermalState;
use ventwork_logic::voxel::GridSize;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed tick length, seconds.
    pub tick_length: f64,
    /// Multiplier applied to real time in `advance`.
    pub time_scale: f64,
    /// Upper bound on ticks run by a single `advance` call.
    pub max_ticks_per_frame: u32,
    /// Thermal coupling given to new pipes, W/K.
    pub pipe_thermal_conductance: f64,
    /// W/K
    pub heat_loss_coefficient: f64,
    /// K
    pub external_temperature: f64,
    /// kPa
    pub pressure_floor: f64,
    /// K
    pub temperature_floor: f64,
    /// m³
    pub volume_floor: f64,
    /// Seconds between validation passes; 0 disables validation.
    pub validation_interval: f64,
    pub zones: ZoneConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_length: 0.1,
            time_scale: 1.0,
            max_ticks_per_frame: 10,
            pipe_thermal_conductance: 10.0,
            heat_loss_coefficient: thermal_defaults::HEAT_LOSS_COEFFICIENT,
            external_temperature: thermal_defaults::EXTERNAL_TEMPERATURE,
            pressure_floor: VACUUM_PRESSURE_FLOOR,
            temperature_floor: MIN_TEMPERATURE,
            volume_floor: MIN_VOLUME,
            validation_interval: 0.0,
            zones: ZoneConfig::default(),
        }
    }
}

/// Voxel grid and zone detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub grid_size: GridSize,
    /// Edge length of one voxel, m. Each voxel holds `voxel_size³` m³.
    pub voxel_size: f64,
    pub max_flood_fill_depth: usize,
    pub grid_edges_sealed: bool,
    /// Regions smaller than this get no zone.
    pub min_zone_size: usize,
    pub ambient: AmbientPreset,
    /// Volume of the reservoir node exposed zones leak into, m³.
    pub exterior_volume: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            grid_size: GridSize::default(),
            voxel_size: 1.0,
            max_flood_fill_depth: 10_000,
            grid_edges_sealed: false,
            min_zone_size: 1,
            ambient: AmbientPreset::Vacuum,
            exterior_volume: 1000.0,
        }
    }
}

impl ZoneConfig {
    pub fn flood_settings(&self) -> FloodSettings {
        FloodSettings {
            max_depth: self.max_flood_fill_depth,
            edges_sealed: self.grid_edges_sealed,
        }
    }

    pub fn ambient_atmosphere(&self) -> AmbientAtmosphere {
        AmbientAtmosphere::from_preset(self.ambient)
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        }
        fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
            if value >= 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{} must not be negative, got {}",
                    name, value
                )))
            }
        }

        positive("tick_length", self.tick_length)?;
        non_negative("time_scale", self.time_scale)?;
        non_negative("pipe_thermal_conductance", self.pipe_thermal_conductance)?;
        non_negative("heat_loss_coefficient", self.heat_loss_coefficient)?;
        positive("external_temperature", self.external_temperature)?;
        positive("pressure_floor", self.pressure_floor)?;
        positive("temperature_floor", self.temperature_floor)?;
        positive("volume_floor", self.volume_floor)?;
        non_negative("validation_interval", self.validation_interval)?;
        if self.max_ticks_per_frame == 0 {
            return Err(ConfigError::Invalid(
                "max_ticks_per_frame must be at least 1".into(),
            ));
        }

        let z = &self.zones;
        let GridSize { x, y, z: depth } = z.grid_size;
        if x <= 0 || y <= 0 || depth <= 0 {
            return Err(ConfigError::Invalid(format!(
                "grid dimensions must be positive, got {}x{}x{}",
                x, y, depth
            )));
        }
        positive("voxel_size", z.voxel_size)?;
        positive("exterior_volume", z.exterior_volume)?;
        if z.max_flood_fill_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_flood_fill_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn safety_floors(&self) -> SafetyFloors {
        SafetyFloors {
            pressure: self.pressure_floor,
            temperature: self.temperature_floor,
            volume: self.volume_floor,
        }
    }

    /// Thermal state given to nodes the engine creates.
    pub fn thermal_template(&self) -> ThermalState {
        ThermalState {
            heat_loss_coefficient: self.heat_loss_coefficient,
            external_temperature: self.external_temperature,
            ..ThermalState::default()
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "Config parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
