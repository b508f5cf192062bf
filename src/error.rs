//! Error types for the triple store

use thiserror::Error;

/// Errors produced by the facade and the storage backends
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("invalid {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("clause type '{0}' not supported")]
    UnsupportedClause(String),

    #[error("invalid clause value '{value}': expecting a number")]
    InvalidClauseValue { value: String },

    #[error("triple already exists: {0}")]
    DuplicateTriple(String),

    #[error("no query clause specified")]
    MissingFilter,

    #[error("update has no effect since delta is zero and replace is false")]
    NoOpUpdate,

    #[error("{0} not supported by the configured store")]
    CapabilityUnsupported(&'static str),

    #[error("sqlite store: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl FabricError {
    /// Stable machine-readable code, used by the HTTP layer
    pub fn code(&self) -> &'static str {
        match self {
            FabricError::InvalidField { .. } => "INVALID_FIELD",
            FabricError::UnsupportedClause(_) => "UNSUPPORTED_CLAUSE",
            FabricError::InvalidClauseValue { .. } => "INVALID_CLAUSE_VALUE",
            FabricError::DuplicateTriple(_) => "DUPLICATE_TRIPLE",
            FabricError::MissingFilter => "MISSING_FILTER",
            FabricError::NoOpUpdate => "NO_OP_UPDATE",
            FabricError::CapabilityUnsupported(_) => "CAPABILITY_UNSUPPORTED",
            FabricError::Storage(_) => "STORAGE_ERROR",
            FabricError::LockPoisoned(_) => "STORAGE_ERROR",
        }
    }

    /// True for errors caused by the caller's input rather than the backend
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FabricError::InvalidField { .. }
                | FabricError::UnsupportedClause(_)
                | FabricError::InvalidClauseValue { .. }
                | FabricError::DuplicateTriple(_)
                | FabricError::MissingFilter
                | FabricError::NoOpUpdate
        )
    }
}

pub type Result<T> = std::result::Result<T, FabricError>;
