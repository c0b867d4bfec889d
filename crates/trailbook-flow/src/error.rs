//! Error types for the deletion workflow.

use thiserror::Error;

use trailbook_core::NodeId;

use crate::request::WorkflowStage;
use crate::store::StoreError;

/// Errors raised by workflow operations.
///
/// A blocked deletion is not an error: it is a normal stage of the state
/// machine, surfaced with the list of blocking references.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Scope invariant violation: cloud removal is only meaningful for
    /// photos actually being detached. Rejected locally; the workflow
    /// stage is unchanged and no collaborator call is made.
    #[error("cloud file deletion requires child photos to be in scope")]
    CloudRequiresPhotos,

    /// The operation is not legal in the current stage.
    #[error("'{action}' is not valid while the workflow is {stage}")]
    InvalidStage {
        action: &'static str,
        stage: WorkflowStage,
    },

    /// A second deletion request was started while one is in flight.
    #[error("a deletion of {node} is already in flight")]
    RequestInFlight { node: NodeId },

    /// A blocking-reference index out of range.
    #[error("no blocking reference at index {index}")]
    NoSuchReference { index: usize },

    /// A navigation return with a token that was never issued or was
    /// already consumed.
    #[error("navigation token does not match a pending return point")]
    UnknownToken,

    /// The persistence collaborator reported a failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
