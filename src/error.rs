use crate::model::{ElementType, Guid, Violation};
use itertools::Itertools;
use thiserror::Error;

/// Errors raised when reading the flow model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Element '{guid}' does not exist in the flow")]
    NotFound { guid: Guid },
}

/// Why a branch merge was refused by `can_merge_ended_branch`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeRefusal {
    #[error("the element is not a decision or wait")]
    NotBranching,

    #[error("the element has no branch at this index")]
    BranchOutOfRange,

    #[error("the branch does not end in an End element")]
    BranchNotEnded,

    #[error("the merge point already continues to '{continuation}' without any merging branch")]
    ContinuationConflict { continuation: Guid },
}

/// Typed failures of the structural mutation engine.
///
/// These are expected, user-triggered states. The engine returns them instead of a new
/// model and the input model is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid anchor {anchor}: {reason}")]
    InvalidAnchor { anchor: String, reason: String },

    #[error("Element '{guid}' does not exist in the flow")]
    ElementNotFound { guid: Guid },

    #[error(
        "Deleting '{guid}' is ambiguous: branches {} are not empty, choose the one to keep",
        non_empty_branches.iter().join(", ")
    )]
    AmbiguousDelete {
        guid: Guid,
        non_empty_branches: Vec<usize>,
    },

    #[error("Element '{guid}' has no branch {index} to keep")]
    InvalidResolution { guid: Guid, index: usize },

    #[error("Element '{guid}' already has a fault path")]
    AlreadyHasFault { guid: Guid },

    #[error("Element '{guid}' of type {element_type} does not support a fault path")]
    FaultNotSupported {
        guid: Guid,
        element_type: ElementType,
    },

    #[error("The root element '{guid}' cannot be deleted")]
    CannotDeleteRoot { guid: Guid },

    #[error("The root element cannot be moved")]
    CannotMoveRoot,

    #[error("Branch {index} of '{parent}' cannot be merged: {reason}")]
    MergeRefused {
        parent: Guid,
        index: usize,
        reason: MergeRefusal,
    },

    #[error("Invalid selection: {reason}")]
    InvalidSelection { reason: String },

    #[error(
        "The command would produce an invalid flow: {}",
        violations.iter().join("; ")
    )]
    InvalidResult { violations: Vec<Violation> },

    #[error("Event '{event}' requires the '{field}' field")]
    MissingField { event: String, field: String },
}

impl From<ModelError> for CommandError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound { guid } => CommandError::ElementNotFound { guid },
        }
    }
}

/// Fatal precondition failures of the layout engine.
///
/// Missing branch heads are not errors: they are rendered as stubs and reported as
/// violations on the render tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("The flow has no root element '{root}'")]
    MissingRoot { root: Guid },

    #[error("Element '{guid}' is reached twice while laying out the flow")]
    CycleDetected { guid: Guid },
}

/// Errors from the snapshot based undo/redo history.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Errors that can occur when converting an interchange definition into a `FlowModel`.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to parse flow JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Element '{guid}' has an unknown element type '{type_name}'")]
    UnknownElementType { guid: Guid, type_name: String },

    #[error("Element '{0}' is defined more than once")]
    DuplicateGuid(Guid),

    #[error("Root element '{0}' is not defined")]
    MissingRoot(Guid),
}

/// Errors surfaced by an `EditorSession`.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
