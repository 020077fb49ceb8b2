//! Control loop for the warehouse fleet simulation.
//!
//! This crate owns the periodic tick that moves robots, assigns and
//! completes packages, and drifts bin counts, along with the run-state
//! controller the operator uses to start, pause, and halt it.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `fleet-config.yaml` into
//!   strongly-typed structs.
//! - [`random`] -- [`RandomSource`] trait, seeded and scripted sources.
//! - [`tick`] -- The four-step tick engine.
//! - [`generator`] -- Periodic package injection.
//! - [`schedule`] -- Cancellable periodic tasks.
//! - [`controller`] -- Run-state machine driving both schedules.
//! - [`maintenance`] -- Operator bin maintenance switch.
//! - [`overview`] -- Fleet-wide dashboard counts.
//!
//! [`RandomSource`]: random::RandomSource

pub mod config;
pub mod controller;
pub mod generator;
pub mod maintenance;
pub mod overview;
pub mod random;
pub mod schedule;
pub mod tick;

pub use config::{ConfigError, FleetConfig, TickRules};
pub use controller::{ControlStatus, FleetController};
pub use generator::PackageGenerator;
pub use maintenance::{set_bin_maintenance, toggle_bin_maintenance};
pub use overview::{FleetOverview, Health, Ratio};
pub use random::{FixedRandom, RandomSource, SeededRandom};
pub use tick::{TickEngine, TickSummary};
