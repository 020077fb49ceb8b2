//! Error types for the entity store.
//!
//! Every store operation reports failure through [`StoreError`]. The
//! control loop does not distinguish between variants: it logs and moves
//! on. The variants exist so logs and the observer API can say what broke.

use std::fmt::Display;

/// Errors that can occur in the entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// No record with the given id exists.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("robot", "package", "bin").
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// A stored column held a value the domain types reject.
    #[error("decode error: {0}")]
    Decode(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store is not reachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: &impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether this error means the record does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<fleet_types::UnknownStatus> for StoreError {
    fn from(err: fleet_types::UnknownStatus) -> Self {
        Self::Decode(err.to_string())
    }
}
