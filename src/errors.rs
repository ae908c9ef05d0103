use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the view configuration store and its editing operations.
///
/// The derivation pipeline itself (filter, rank, sort, rollup) is infallible;
/// only configuration edits and persistence can fail.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid reorder: cannot move index {from} to {to} in a list of {len}")]
    InvalidReorder { from: usize, to: usize, len: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        ViewError::Serialization(err.to_string())
    }
}

impl ViewError {
    /// Whether the in-memory configuration is still usable after this error.
    ///
    /// Storage and serialization failures never invalidate the live view;
    /// rejected edits leave it untouched as well.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage(_)
            | Self::Serialization(_)
            | Self::InvalidReorder { .. }
            | Self::InvalidInput(_) => true,
            Self::Other(_) => false,
        }
    }

    /// Short machine-readable code for the error category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage_error",
            Self::InvalidReorder { .. } => "invalid_reorder",
            Self::InvalidInput(_) => "invalid_input",
            Self::Serialization(_) => "serialization_error",
            Self::Other(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_error_message_names_indices() {
        let err = ViewError::InvalidReorder {
            from: 7,
            to: 0,
            len: 6,
        };
        assert_eq!(
            err.to_string(),
            "Invalid reorder: cannot move index 7 to 0 in a list of 6"
        );
        assert_eq!(err.code(), "invalid_reorder");
        assert!(err.is_recoverable());
    }

    #[test]
    fn storage_errors_convert_and_stay_recoverable() {
        let err: ViewError = StorageError::OperationFailed("disk full".into()).into();
        assert!(matches!(err, ViewError::Storage(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn anyhow_errors_are_not_recoverable() {
        let err: ViewError = anyhow::anyhow!("boom").into();
        assert!(!err.is_recoverable());
        assert_eq!(err.code(), "internal_error");
    }
}
