//! Error types for the fleet engine binary.

/// Top-level error for the fleet engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fleet_core::ConfigError,
    },

    /// Connecting to, migrating, or seeding the entity store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: fleet_db::StoreError,
    },

    /// The observer API server failed.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: fleet_observer::ServerError,
    },
}
