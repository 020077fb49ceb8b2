//! Entity store for the warehouse fleet simulation.
//!
//! The control loop reads and writes robot, package, and bin records only
//! through the [`EntityStore`] trait. Two backends are provided:
//!
//! ```text
//! fleet-core (tick, generator, controller)
//!     |
//!     +-- EntityStore
//!           |-- MemoryStore    (process-local, tests + demo mode)
//!           +-- PostgresStore  (robots / packages / bins tables)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The [`EntityStore`] trait
//! - [`memory`] -- In-memory backend with fault injection
//! - [`postgres`] -- `PostgreSQL` backend and connection pool configuration
//! - [`error`] -- Shared error type

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};
pub use store::EntityStore;
