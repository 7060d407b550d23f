use thiserror::Error;

/// Failures raised by the record store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store not initialized")]
    NotInitialized,

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record codec: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Error kinds surfaced by the lesson store core. Callers pick the
/// user-facing message from the variant.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn lesson_not_found(id: &str) -> Self {
        CoreError::NotFound {
            kind: "lesson instance",
            id: id.to_string(),
        }
    }

    /// Stable IPC error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "bad_params",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Storage(_) => "storage_failed",
        }
    }
}
