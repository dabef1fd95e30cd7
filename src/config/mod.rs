//! Configuration - environment variables plus an optional TOML parameter file

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ballistics::SolverParams;
use crate::kinematics::{AxisOrder, ModelParams};
use crate::rotation::SchedulerConfig;
use crate::util::time::DEFAULT_TICK_RATE;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Driver configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Stop after this many ticks; `None` runs until interrupted
    pub run_ticks: Option<u64>,
    /// Emit a snapshot line every this many ticks
    pub snapshot_interval: u32,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Seed for the wandering target
    pub scenario_seed: u64,
    /// Overrides the scheduler's max turn rate (degrees per tick)
    pub turn_rate: Option<f32>,
    /// TOML file with `[projectile]`, `[player]`, `[solver]` and `[scheduler]` tables
    pub params_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::invalid("LOG_FORMAT", other)),
        };

        let snapshot_interval = parse(&lookup, "SNAPSHOT_INTERVAL")?.unwrap_or(1);
        if snapshot_interval == 0 {
            return Err(ConfigError::invalid("SNAPSHOT_INTERVAL", "0"));
        }

        let tick_rate = parse(&lookup, "TICK_RATE")?.unwrap_or(DEFAULT_TICK_RATE);
        if tick_rate == 0 {
            return Err(ConfigError::invalid("TICK_RATE", "0"));
        }

        Ok(Self {
            tick_rate,
            run_ticks: parse(&lookup, "RUN_TICKS")?,
            snapshot_interval,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            scenario_seed: parse(&lookup, "SCENARIO_SEED")?.unwrap_or(42),
            turn_rate: parse(&lookup, "TURN_RATE")?,
            params_file: lookup("SIM_PARAMS_FILE")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Simulation parameters: presets, then the parameter file, then env overrides
    pub fn simulation_params(&self) -> Result<SimulationParams, ConfigError> {
        let mut params = match &self.params_file {
            Some(path) => ParamsFile::load(path)?.resolve(),
            None => SimulationParams::default(),
        };
        if let Some(rate) = self.turn_rate {
            params.scheduler.max_turn_rate = rate;
        }
        Ok(params)
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, &raw)),
    }
}

/// Fully resolved parameters for every simulated component
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub projectile: ModelParams,
    pub player: ModelParams,
    pub solver: SolverParams,
    pub scheduler: SchedulerConfig,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            projectile: ModelParams::thrown_projectile(),
            player: ModelParams::player(),
            solver: SolverParams::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Partial [`ModelParams`]; unset keys keep the preset
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelOverrides {
    pub gravity: Option<f64>,
    /// Uniform air drag on every axis
    pub drag: Option<f64>,
    pub fluid_drag: Option<f64>,
    pub horizon: Option<u32>,
    pub launch_speed: Option<f64>,
    pub axis_order: Option<AxisOrder>,
    pub half_width: Option<f64>,
    pub height: Option<f64>,
    pub jump_velocity: Option<f64>,
}

impl ModelOverrides {
    pub fn apply(&self, mut params: ModelParams) -> ModelParams {
        if let Some(gravity) = self.gravity {
            params.gravity = gravity;
        }
        if let Some(drag) = self.drag {
            params.drag.air = glam::DVec3::splat(drag);
        }
        if let Some(drag) = self.fluid_drag {
            params.drag.fluid = glam::DVec3::splat(drag);
        }
        if let Some(horizon) = self.horizon {
            params.horizon = horizon;
        }
        if let Some(speed) = self.launch_speed {
            params.launch_speed = speed;
        }
        if let Some(order) = self.axis_order {
            params.axis_order = order;
        }
        if let Some(half_width) = self.half_width {
            params.half_width = half_width;
        }
        if let Some(height) = self.height {
            params.height = height;
        }
        if let Some(jump) = self.jump_velocity {
            params.jump_velocity = jump;
        }
        params
    }
}

/// Contents of `SIM_PARAMS_FILE`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamsFile {
    pub projectile: ModelOverrides,
    pub player: ModelOverrides,
    pub solver: SolverParams,
    pub scheduler: SchedulerConfig,
}

impl ParamsFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn resolve(&self) -> SimulationParams {
        SimulationParams {
            projectile: self.projectile.apply(ModelParams::thrown_projectile()),
            player: self.player.apply(ModelParams::player()),
            solver: self.solver,
            scheduler: self.scheduler,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to read parameter file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed parameter file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
        }
    }
}
