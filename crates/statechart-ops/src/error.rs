//! Error types for the editing layer.

use statechart_core::{CoreError, ItemId, ItemKind};
use thiserror::Error;

/// Result type for editing operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while querying or editing a statechart.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A structural query needed a state and got something else.
    #[error("{id} is not a state (found {kind:?})")]
    NotAState { id: ItemId, kind: Option<ItemKind> },

    /// `begin_transaction` while another transaction is open.
    #[error("transaction '{open}' is already in progress")]
    TransactionInProgress { open: String },

    /// `end_transaction`/`cancel_transaction` with nothing open.
    #[error("no transaction in progress")]
    NoTransaction,

    /// Document tree misuse.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Precondition violation for a non-state item.
    pub fn not_a_state(id: ItemId, kind: Option<ItemKind>) -> Self {
        Self::NotAState { id, kind }
    }
}
