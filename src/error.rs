//! Mapper error types.

use thiserror::Error;

/// Errors raised by the mapper, its persisters and backends.
///
/// A missing entity is never an error: lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum OgmError {
    // Mapping errors
    #[error("No mapping registered for class: {0}")]
    UnmappedType(String),

    #[error("Unknown property '{property}' on {class}")]
    UnknownProperty { class: String, property: String },

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    // Backend errors
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Cypher query error: {message}")]
    Query { message: String, query: String },

    // Hydration errors
    #[error("Failed to hydrate {class}: {message}")]
    Hydration { class: String, message: String },

    #[error("Entity manager has been dropped; lazy relationship cannot be resolved")]
    ManagerClosed,

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OgmError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            OgmError::UnmappedType(_) => "UNMAPPED_TYPE",
            OgmError::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
            OgmError::InvalidMapping(_) => "INVALID_MAPPING",
            OgmError::Connection(_) => "CONNECTION_ERROR",
            OgmError::Query { .. } => "QUERY_ERROR",
            OgmError::Hydration { .. } => "HYDRATION_ERROR",
            OgmError::ManagerClosed => "MANAGER_CLOSED",
            OgmError::Config(_) => "CONFIG_ERROR",
            OgmError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn hydration(class: &str, message: impl std::fmt::Display) -> Self {
        OgmError::Hydration {
            class: class.to_string(),
            message: message.to_string(),
        }
    }
}
