//! Workflow stages and the transient deletion request.

use serde::{Deserialize, Serialize};
use strum::Display;

use trailbook_core::{ContentNode, DescendantSummary, JournalGraph, Location, Photo};
use trailbook_index::CrossReference;

use crate::scope::DeletionScope;

/// Stage of the deletion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
pub enum WorkflowStage {
    /// No deletion in progress.
    #[default]
    Idle,
    /// The operator is narrowing the proposed scope.
    ScopeSelection,
    /// Awaiting the local-only / with-cloud choice.
    Confirming,
    /// The cross-reference query is being evaluated.
    CrossRefCheck,
    /// Blocking references exist; awaiting remediation or fall-back.
    Blocked,
    /// The reference check came back clear; awaiting final dispatch.
    ReadyToCommit,
    /// The mutation was dispatched to the persistence collaborator.
    Committed,
    /// The request was discarded without any mutation.
    Cancelled,
}

impl WorkflowStage {
    /// Check whether the stage is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }

    /// Check whether a request is live in this stage.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Committed | Self::Cancelled)
    }
}

/// A transient deletion request.
///
/// Created when the operator initiates deletion; destroyed on commit,
/// cancel, or navigation away that discards the flow. Survives cooperative
/// navigation while blocked.
#[derive(Debug, Clone)]
pub struct DeletionRequest {
    /// The node being deleted (owned snapshot).
    pub target: ContentNode,
    /// The location the deletion happens in. Usages inside it never block.
    pub origin: Location,
    /// The current scope.
    pub scope: DeletionScope,
    /// Descendants of the target at the last snapshot read.
    pub descendants: DescendantSummary,
    /// The snapshot read at the last check entry (or at begin).
    pub snapshot: JournalGraph,
    /// References blocking a cloud deletion, from the last check.
    pub blocking_refs: Vec<CrossReference>,
    /// Photos whose cloud deletion is still pending. Narrowed to the
    /// failed subset after a partial commit.
    pub pending_cloud: Vec<Photo>,
}

impl DeletionRequest {
    /// Create a new request.
    pub fn new(
        target: ContentNode,
        origin: Location,
        scope: DeletionScope,
        descendants: DescendantSummary,
        snapshot: JournalGraph,
    ) -> Self {
        Self {
            target,
            origin,
            scope,
            descendants,
            snapshot,
            blocking_refs: Vec::new(),
            pending_cloud: Vec::new(),
        }
    }
}
