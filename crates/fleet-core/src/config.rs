//! Configuration loading and typed config structures for the fleet
//! simulation.
//!
//! The configuration lives in `fleet-config.yaml`. Every field has a
//! default matching the standard warehouse demo (5 s ticks, 8 s package
//! generation, the battery thresholds and event probabilities of the
//! tick engine), so an empty file or no file at all is valid.

use std::ops::Range;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

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

    /// A value parsed but is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `fleet-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FleetConfig {
    /// Schedule periods and seed.
    #[serde(default)]
    pub simulation: ScheduleConfig,

    /// Tick engine rules.
    #[serde(default)]
    pub rules: TickRules,

    /// Store and observer endpoints.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Demo fleet seeded into the in-memory store.
    #[serde(default)]
    pub fleet: DemoFleetConfig,
}

impl FleetConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides (see [`InfrastructureConfig::apply_env_overrides`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Check value ranges that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.tick_interval_ms == 0 {
            return Err(invalid("simulation.tick_interval_ms", "must be positive"));
        }
        if self.simulation.package_interval_ms == 0 {
            return Err(invalid("simulation.package_interval_ms", "must be positive"));
        }
        self.rules.validate()?;
        if self.infrastructure.db_max_connections == 0 {
            return Err(invalid("infrastructure.db_max_connections", "must be positive"));
        }
        if self.fleet.bin_capacity == 0 {
            return Err(invalid("fleet.bin_capacity", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

/// Periods of the two scheduled tasks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// Milliseconds between tick engine runs.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Milliseconds between package generator runs.
    #[serde(default = "default_package_interval_ms")]
    pub package_interval_ms: u64,

    /// Seed for the tick engine's random source. Absent means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            package_interval_ms: default_package_interval_ms(),
            seed: None,
        }
    }
}

impl ScheduleConfig {
    /// Tick period. Never zero.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Package generation period. Never zero.
    pub fn package_interval(&self) -> Duration {
        Duration::from_millis(self.package_interval_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// Tick rules
// ---------------------------------------------------------------------------

/// Thresholds, ranges, and probabilities applied by each tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TickRules {
    /// Battery drained per tick by an active robot, `[start, end)`.
    #[serde(default = "default_drain_range")]
    pub drain_range: Range<f64>,

    /// Battery restored per tick by a charging robot, `[start, end)`.
    #[serde(default = "default_charge_range")]
    pub charge_range: Range<f64>,

    /// An active robot at or below this level goes to charge.
    #[serde(default = "default_low_battery_threshold")]
    pub low_battery_threshold: u8,

    /// A charging robot at or above this level returns to active.
    #[serde(default = "default_resume_threshold")]
    pub resume_threshold: u8,

    /// Robots need strictly more battery than this to take a package.
    #[serde(default = "default_assignable_battery_min")]
    pub assignable_battery_min: u8,

    /// Chance per tick that one pending package gets assigned.
    #[serde(default = "default_assign_probability")]
    pub assign_probability: f64,

    /// Chance per tick that one processing package completes.
    #[serde(default = "default_complete_probability")]
    pub complete_probability: f64,

    /// Chance per tick that one bin's count drifts.
    #[serde(default = "default_bin_drift_probability")]
    pub bin_drift_probability: f64,
}

impl Default for TickRules {
    fn default() -> Self {
        Self {
            drain_range: default_drain_range(),
            charge_range: default_charge_range(),
            low_battery_threshold: default_low_battery_threshold(),
            resume_threshold: default_resume_threshold(),
            assignable_battery_min: default_assignable_battery_min(),
            assign_probability: default_assign_probability(),
            complete_probability: default_complete_probability(),
            bin_drift_probability: default_bin_drift_probability(),
        }
    }
}

impl TickRules {
    /// Check ranges and probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("rules.drain_range", &self.drain_range)?;
        check_range("rules.charge_range", &self.charge_range)?;
        check_probability("rules.assign_probability", self.assign_probability)?;
        check_probability("rules.complete_probability", self.complete_probability)?;
        check_probability("rules.bin_drift_probability", self.bin_drift_probability)?;
        if self.low_battery_threshold >= self.resume_threshold {
            return Err(invalid(
                "rules.low_battery_threshold",
                "must be below rules.resume_threshold",
            ));
        }
        Ok(())
    }
}

fn check_range(field: &'static str, range: &Range<f64>) -> Result<(), ConfigError> {
    if range.start.is_finite() && range.end.is_finite() && range.start >= 0.0 && range.start < range.end
    {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("expected 0 <= start < end, got {range:?}"),
        ))
    }
}

fn check_probability(field: &'static str, p: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(invalid(field, format!("expected a probability in [0, 1], got {p}")))
    }
}

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

/// Store and observer endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` URL. When absent the engine runs on the in-memory store.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Address the observer API binds to.
    #[serde(default = "default_observer_host")]
    pub observer_host: String,

    /// Port the observer API listens on.
    #[serde(default = "default_observer_port")]
    pub observer_port: u16,

    /// Maximum `PostgreSQL` pool connections.
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Seconds to wait for a `PostgreSQL` connection.
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
}

impl InfrastructureConfig {
    /// Override values from the environment:
    /// - `DATABASE_URL` overrides `database_url`
    /// - `FLEET_OBSERVER_PORT` overrides `observer_port` (ignored if not a port)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database_url = Some(val);
        }
        if let Ok(val) = std::env::var("FLEET_OBSERVER_PORT") {
            match val.parse() {
                Ok(port) => self.observer_port = port,
                Err(e) => tracing::warn!(value = %val, error = %e, "Ignoring FLEET_OBSERVER_PORT"),
            }
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            observer_host: default_observer_host(),
            observer_port: default_observer_port(),
            db_max_connections: default_db_max_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Demo fleet
// ---------------------------------------------------------------------------

/// Initial records for the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DemoFleetConfig {
    /// Number of robots to create.
    #[serde(default = "default_robots")]
    pub robots: u32,

    /// Number of bins to create.
    #[serde(default = "default_bins")]
    pub bins: u32,

    /// Capacity of every seeded bin.
    #[serde(default = "default_bin_capacity")]
    pub bin_capacity: u32,

    /// Pending packages to create up front.
    #[serde(default = "default_initial_packages")]
    pub initial_packages: u32,

    /// Start the control loop as soon as the engine is up.
    #[serde(default)]
    pub autostart: bool,
}

impl Default for DemoFleetConfig {
    fn default() -> Self {
        Self {
            robots: default_robots(),
            bins: default_bins(),
            bin_capacity: default_bin_capacity(),
            initial_packages: default_initial_packages(),
            autostart: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    5000
}
const fn default_package_interval_ms() -> u64 {
    8000
}
const fn default_drain_range() -> Range<f64> {
    2.0..5.0
}
const fn default_charge_range() -> Range<f64> {
    3.0..8.0
}
const fn default_low_battery_threshold() -> u8 {
    15
}
const fn default_resume_threshold() -> u8 {
    95
}
const fn default_assignable_battery_min() -> u8 {
    20
}
const fn default_assign_probability() -> f64 {
    0.7
}
const fn default_complete_probability() -> f64 {
    0.5
}
const fn default_bin_drift_probability() -> f64 {
    0.2
}
fn default_observer_host() -> String {
    String::from("0.0.0.0")
}
const fn default_observer_port() -> u16 {
    8080
}
const fn default_db_max_connections() -> u32 {
    10
}
const fn default_db_connect_timeout_secs() -> u64 {
    5
}
const fn default_robots() -> u32 {
    4
}
const fn default_bins() -> u32 {
    12
}
const fn default_bin_capacity() -> u32 {
    10
}
const fn default_initial_packages() -> u32 {
    3
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = FleetConfig::default();
        assert_eq!(config.simulation.tick_interval_ms, 5000);
        assert_eq!(config.simulation.package_interval_ms, 8000);
        assert_eq!(config.rules.low_battery_threshold, 15);
        assert_eq!(config.rules.resume_threshold, 95);
        assert_eq!(config.rules.assignable_battery_min, 20);
        assert_eq!(config.rules.assign_probability, 0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_empty_yaml() {
        let config = FleetConfig::parse("").unwrap();
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn shipped_config_file_matches_defaults() {
        let config = FleetConfig::parse(include_str!("../../../fleet-config.yaml")).unwrap();
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
simulation:
  tick_interval_ms: 1000
  seed: 42
rules:
  assign_probability: 1.0
  drain_range:
    start: 1.0
    end: 2.0
fleet:
  robots: 8
  autostart: true
";
        let config = FleetConfig::parse(yaml).unwrap();
        assert_eq!(config.simulation.tick_interval_ms, 1000);
        assert_eq!(config.simulation.package_interval_ms, 8000);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.rules.assign_probability, 1.0);
        assert_eq!(config.rules.drain_range, 1.0..2.0);
        assert_eq!(config.rules.charge_range, 3.0..8.0);
        assert_eq!(config.fleet.robots, 8);
        assert!(config.fleet.autostart);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reject_probability_above_one() {
        let mut config = FleetConfig::default();
        config.rules.complete_probability = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "rules.complete_probability",
                ..
            }
        ));
    }

    #[test]
    fn reject_zero_interval() {
        let mut config = FleetConfig::default();
        config.simulation.package_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_inverted_range() {
        let mut config = FleetConfig::default();
        config.rules.charge_range = 8.0..3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_invalid_yaml() {
        assert!(matches!(
            FleetConfig::parse("simulation: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn database_pool_settings_parse_and_validate() {
        let yaml = r"
infrastructure:
  db_max_connections: 4
  db_connect_timeout_secs: 12
";
        let config = FleetConfig::parse(yaml).unwrap();
        assert_eq!(config.infrastructure.db_max_connections, 4);
        assert_eq!(config.infrastructure.db_connect_timeout_secs, 12);
        assert!(config.validate().is_ok());

        let empty_pool = FleetConfig::parse("infrastructure:\n  db_max_connections: 0\n").unwrap();
        assert!(empty_pool.validate().is_err());
    }
}
