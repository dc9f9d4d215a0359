//! Error types for the document tree.

use thiserror::Error;

use crate::{Attr, ItemId, ItemKind};

/// Result type for document operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by structural misuse of a [`crate::Document`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// An item referenced by id is not in the arena.
    #[error("item not found: {id}")]
    ItemNotFound { id: ItemId },

    /// The parent cannot hold a child of this kind.
    #[error("{parent_kind:?} {parent} cannot contain {child_kind:?} {child}")]
    InvalidChild {
        parent: ItemId,
        parent_kind: ItemKind,
        child: ItemId,
        child_kind: ItemKind,
    },

    /// The child still has a parent and must be removed first.
    #[error("item {id} is already attached to {parent}")]
    AlreadyAttached { id: ItemId, parent: ItemId },

    /// An item cannot be inserted below itself.
    #[error("inserting {id} under {parent} would create a cycle")]
    Cycle { id: ItemId, parent: ItemId },

    /// Sequence index outside the children of a parent.
    #[error("index {index} out of range for {parent} with {len} items")]
    IndexOutOfRange {
        parent: ItemId,
        index: usize,
        len: usize,
    },

    /// The attribute does not exist on this kind of item, or has the wrong type.
    #[error("attribute {attr:?} does not apply to {kind:?} {id}")]
    InvalidAttribute { id: ItemId, kind: ItemKind, attr: Attr },

    /// The root statechart cannot be removed or re-parented.
    #[error("the root statechart {id} cannot be moved")]
    RootImmutable { id: ItemId },

    /// A document file could not be interpreted.
    #[error("malformed document: {message}")]
    MalformedDocument { message: String },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a malformed document error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: message.into(),
        }
    }
}
