//! Core error types for semana-core.
//!
//! This module defines the error hierarchy using thiserror so that every
//! fallible operation in the library reports a typed, printable cause.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for semana-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// LLM collaborator errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Row not found
    #[error("Row not found in {table}: {key}")]
    NotFound { table: String, key: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Task hierarchy violation (parent chain inconsistent with level)
    #[error("Invalid task hierarchy for '{task_id}': {message}")]
    InvalidHierarchy { task_id: String, message: String },

    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid state transition
    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// LLM collaborator errors.
///
/// The provider call itself lives outside this crate; these variants classify
/// whatever failure text comes back so the UI can show a stable message.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Provider could not be reached
    #[error("LLM provider unreachable: {0}")]
    Connectivity(String),

    /// No active provider configuration
    #[error("No active LLM configuration")]
    NotConfigured,

    /// Provider returned an error payload
    #[error("LLM provider error: {0}")]
    Provider(String),
}

impl LlmError {
    /// Classify a raw failure message by substring, mirroring how the
    /// surrounding application maps provider failures to user-facing text.
    pub fn classify(raw: &str) -> Self {
        if raw.contains("Failed to fetch") || raw.contains("connection") {
            LlmError::Connectivity(raw.to_string())
        } else if raw.contains("No hay configuración LLM activa") {
            LlmError::NotConfigured
        } else {
            LlmError::Provider(raw.to_string())
        }
    }

    /// Stable user-facing message for this error class.
    pub fn user_message(&self) -> &'static str {
        match self {
            LlmError::Connectivity(_) => {
                "No se pudo conectar con el asistente. Revisa tu conexión."
            }
            LlmError::NotConfigured => {
                "No hay un proveedor de IA configurado. Configúralo en ajustes."
            }
            LlmError::Provider(_) => "El asistente no pudo responder. Inténtalo de nuevo.",
        }
    }
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                table: "unknown".to_string(),
                key: "unknown".to_string(),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_classification() {
        assert!(matches!(
            LlmError::classify("TypeError: Failed to fetch"),
            LlmError::Connectivity(_)
        ));
        assert!(matches!(
            LlmError::classify("No hay configuración LLM activa"),
            LlmError::NotConfigured
        ));
        assert!(matches!(
            LlmError::classify("rate limit exceeded"),
            LlmError::Provider(_)
        ));
    }

    #[test]
    fn test_user_messages_are_stable() {
        let err = LlmError::classify("Failed to fetch");
        assert!(err.user_message().contains("conexión"));
    }
}
