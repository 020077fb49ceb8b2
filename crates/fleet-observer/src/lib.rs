//! Observer API server for the warehouse fleet simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Dashboard REST endpoints** for robots, packages, bins, and the
//!   fleet overview, plus the bin maintenance switch
//! - **Operator REST endpoints** for run-state control (start, pause,
//!   emergency stop, status)
//! - **Minimal HTML status page** (`GET /`)
//!
//! Every handler reads from or writes to the entity store behind the
//! [`FleetController`](fleet_core::FleetController); the observer holds
//! no copy of fleet state of its own.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
