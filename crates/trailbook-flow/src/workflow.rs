//! The cascade deletion state machine.
//!
//! `Idle → ScopeSelection → Confirming → {CrossRefCheck} → Blocked ⇄
//! CrossRefCheck → ReadyToCommit → Committed`, with `Cancelled` reachable
//! from every non-terminal stage. The workflow advances only in response
//! to explicit operator actions; the single automatic transition is the
//! re-check on return from navigation, since returning is itself the
//! operator's signal that they attempted remediation.

use compact_str::CompactString;
use indexmap::IndexSet;
use serde::Serialize;

use trailbook_core::{
    ContentNode, ContentTree, DescendantSummary, JournalGraph, Location, LocationKind, MomentId,
    Photo, PhotoId, RefPath, SessionId,
};
use trailbook_index::{find_references, CrossReference, ReferenceQuery};

use crate::config::WorkflowConfig;
use crate::error::FlowError;
use crate::navigation::{NavToken, NavigationMemory, Navigator, ReturnPoint};
use crate::request::{DeletionRequest, WorkflowStage};
use crate::scope::{default_scope, DeletionScope, ScopeField};
use crate::store::{JournalStore, StoreError};

/// One cloud file that could not be deleted during a commit.
///
/// Carries enough detail (which file, what went wrong) for the operator to
/// act on it; its local reference was kept intact.
#[derive(Debug, Clone, Serialize)]
pub struct CommitFailure {
    /// The photo whose cloud deletion failed.
    pub photo: PhotoId,
    /// The physical file reference on the remote store.
    pub file: CompactString,
    /// What the collaborator reported.
    pub message: String,
}

/// Result of dispatching a commit.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Everything in scope was removed.
    Committed {
        /// Local references removed, in order.
        removed: Vec<RefPath>,
        /// Cloud files deleted, in order.
        cloud_deleted: Vec<PhotoId>,
    },
    /// One or more cloud deletions failed. Local references for the failed
    /// files were kept; the workflow is back at `ReadyToCommit` with the
    /// pending set narrowed to the failed subset, allowing retry.
    Partial {
        /// Cloud files that were deleted before/despite the failures.
        cloud_deleted: Vec<PhotoId>,
        /// Individually actionable failures.
        failures: Vec<CommitFailure>,
    },
}

/// Where a with-cloud confirmation landed.
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// The scope had cloud files excluded, so no reference check was
    /// needed and the commit ran immediately.
    Committed(CommitOutcome),
    /// Blocking references were found; see `blocking_refs`.
    Blocked,
    /// The reference check came back clear.
    ReadyToCommit,
}

/// The deletion workflow.
///
/// Collaborators are injected by constructor argument, never looked up
/// ambiently. One workflow drives one request at a time; deletions of
/// unrelated nodes may run on independent workflow instances.
#[derive(Debug)]
pub struct DeletionWorkflow<S, N> {
    store: S,
    navigator: N,
    config: WorkflowConfig,
    stage: WorkflowStage,
    request: Option<DeletionRequest>,
    memory: NavigationMemory,
}

impl<S: JournalStore, N: Navigator> DeletionWorkflow<S, N> {
    /// Create a workflow with default configuration.
    pub fn new(store: S, navigator: N) -> Self {
        Self::with_config(store, navigator, WorkflowConfig::default())
    }

    /// Create a workflow with explicit configuration.
    pub fn with_config(store: S, navigator: N, config: WorkflowConfig) -> Self {
        Self {
            store,
            navigator,
            config,
            stage: WorkflowStage::Idle,
            request: None,
            memory: NavigationMemory::new(),
        }
    }

    /// Current stage.
    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Current scope, if a request is live.
    pub fn scope(&self) -> Option<DeletionScope> {
        self.request.as_ref().map(|r| r.scope)
    }

    /// The live request, if any.
    pub fn request(&self) -> Option<&DeletionRequest> {
        self.request.as_ref()
    }

    /// Blocking references to surface, truncated per configuration.
    /// Truncation affects presentation only, never the gating decision.
    pub fn blocking_refs(&self) -> &[CrossReference] {
        let refs = self
            .request
            .as_ref()
            .map(|r| r.blocking_refs.as_slice())
            .unwrap_or(&[]);
        if self.config.max_blocking_refs > 0 && refs.len() > self.config.max_blocking_refs {
            &refs[..self.config.max_blocking_refs]
        } else {
            refs
        }
    }

    /// Access the persistence collaborator.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the persistence collaborator.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Access the navigation collaborator.
    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Start a deletion request for a node.
    ///
    /// Loads a fresh snapshot, computes the descendant summary, and
    /// proposes a default scope. Nodes with no descendants skip scope
    /// selection and land directly in `Confirming`. Refuses to start while
    /// another request is in flight (single-writer-per-node discipline).
    pub fn begin(
        &mut self,
        target: ContentNode,
        origin: Location,
    ) -> Result<WorkflowStage, FlowError> {
        if self.stage.is_active() {
            let node = match &self.request {
                Some(req) => req.target.node_id(),
                None => target.node_id(),
            };
            return Err(FlowError::RequestInFlight { node });
        }

        let tree = ContentTree::new(self.store.load_snapshot()?);
        let descendants = tree.descendants_of(&target);
        let (scope, stage) = match default_scope(&target, &descendants) {
            Some(scope) => (scope, WorkflowStage::ScopeSelection),
            None => (DeletionScope::node_only(), WorkflowStage::Confirming),
        };

        tracing::info!(node = %target.node_id(), origin = %origin, stage = %stage, "deletion started");
        self.request = Some(DeletionRequest::new(
            target,
            origin,
            scope,
            descendants,
            tree.graph,
        ));
        self.stage = stage;
        Ok(stage)
    }

    /// Toggle one scope category.
    ///
    /// A toggle that violates the cloud-files invariant is rejected with
    /// the stage unchanged and no collaborator call made.
    pub fn toggle_scope(
        &mut self,
        field: ScopeField,
        value: bool,
    ) -> Result<DeletionScope, FlowError> {
        self.expect_stage("toggle scope", &[WorkflowStage::ScopeSelection])?;
        let Some(req) = self.request.as_mut() else {
            return Err(FlowError::InvalidStage {
                action: "toggle scope",
                stage: self.stage,
            });
        };
        req.scope = req.scope.apply_toggle(field, value)?;
        Ok(req.scope)
    }

    /// Accept the current scope and move to confirmation.
    pub fn accept_scope(&mut self) -> Result<WorkflowStage, FlowError> {
        self.expect_stage("accept scope", &[WorkflowStage::ScopeSelection])?;
        self.stage = WorkflowStage::Confirming;
        Ok(self.stage)
    }

    /// Commit removing references from the index only, keeping all cloud
    /// files.
    ///
    /// Never queries the cross-reference index and never deletes a cloud
    /// file: removing a local reference is always permitted regardless of
    /// other usages. Also the fall-back choice from `Blocked`.
    pub fn confirm_local(&mut self) -> Result<CommitOutcome, FlowError> {
        self.expect_stage(
            "confirm local-only",
            &[WorkflowStage::Confirming, WorkflowStage::Blocked],
        )?;
        if let Some(req) = self.request.as_mut() {
            // Narrowing cloud off is always legal; a later retry stays local.
            req.scope.delete_cloud_files = false;
            req.pending_cloud.clear();
            req.blocking_refs.clear();
        }
        self.dispatch()
    }

    /// Confirm the deletion including cloud files.
    ///
    /// If the accepted scope has cloud files excluded, nothing leaves the
    /// remote store and the commit runs immediately without a reference
    /// check. Otherwise the cross-reference index is queried (excluding
    /// the origin) and the workflow lands in `Blocked` or `ReadyToCommit`.
    pub fn confirm_cloud(&mut self) -> Result<ConfirmOutcome, FlowError> {
        self.expect_stage("confirm with cloud", &[WorkflowStage::Confirming])?;
        let wants_cloud = self
            .request
            .as_ref()
            .is_some_and(|r| r.scope.delete_cloud_files);
        if !wants_cloud {
            return Ok(ConfirmOutcome::Committed(self.dispatch()?));
        }

        match self.run_check()? {
            WorkflowStage::Blocked => Ok(ConfirmOutcome::Blocked),
            _ => Ok(ConfirmOutcome::ReadyToCommit),
        }
    }

    /// Explicitly re-run the reference check from `Blocked`.
    pub fn recheck(&mut self) -> Result<WorkflowStage, FlowError> {
        self.expect_stage("re-check references", &[WorkflowStage::Blocked])?;
        self.run_check()
    }

    /// Follow one blocking reference.
    ///
    /// Records a return point, then fires the navigation collaborator and
    /// forgets about it. The pending request survives; the workflow stays
    /// `Blocked` until the operator returns or falls back.
    pub fn follow_reference(&mut self, index: usize) -> Result<NavToken, FlowError> {
        self.expect_stage("follow reference", &[WorkflowStage::Blocked])?;
        let Some(req) = self.request.as_ref() else {
            return Err(FlowError::InvalidStage {
                action: "follow reference",
                stage: self.stage,
            });
        };
        let reference = req
            .blocking_refs
            .get(index)
            .ok_or(FlowError::NoSuchReference { index })?;

        let token = self.memory.remember(ReturnPoint {
            location: req.origin.clone(),
        });
        tracing::debug!(to = %reference.location, "following blocking reference");
        self.navigator.go_to(&reference.location, &reference.anchor);
        Ok(token)
    }

    /// Return from navigation while blocked.
    ///
    /// Consumes the token and automatically re-enters the reference check
    /// exactly once — returning is the operator's signal that they
    /// attempted remediation.
    pub fn return_from_navigation(&mut self, token: NavToken) -> Result<WorkflowStage, FlowError> {
        self.expect_stage("return from navigation", &[WorkflowStage::Blocked])?;
        self.memory.consume(token).ok_or(FlowError::UnknownToken)?;
        self.run_check()
    }

    /// Dispatch the full mutation after a clear reference check.
    pub fn commit(&mut self) -> Result<CommitOutcome, FlowError> {
        self.expect_stage("commit", &[WorkflowStage::ReadyToCommit])?;
        self.dispatch()
    }

    /// Discard the request. No mutation has occurred.
    pub fn cancel(&mut self) -> Result<(), FlowError> {
        if !self.stage.is_active() {
            return Err(FlowError::InvalidStage {
                action: "cancel",
                stage: self.stage,
            });
        }
        tracing::info!(stage = %self.stage, "deletion cancelled");
        self.stage = WorkflowStage::Cancelled;
        self.request = None;
        self.memory.clear();
        Ok(())
    }

    fn expect_stage(
        &self,
        action: &'static str,
        allowed: &[WorkflowStage],
    ) -> Result<(), FlowError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(FlowError::InvalidStage {
                action,
                stage: self.stage,
            })
        }
    }

    /// Enter the reference check: re-read the snapshot (a cached result is
    /// never trusted), recompute the photo set implied by the scope, and
    /// query the index excluding the origin.
    fn run_check(&mut self) -> Result<WorkflowStage, FlowError> {
        self.stage = WorkflowStage::CrossRefCheck;
        let snapshot = self.store.load_snapshot()?;
        let Some(req) = self.request.as_mut() else {
            return Err(FlowError::InvalidStage {
                action: "reference check",
                stage: self.stage,
            });
        };

        let tree = ContentTree::new(snapshot);
        req.descendants = tree.descendants_of(&req.target);
        req.snapshot = tree.graph;

        let ids = req.scope.implied_photo_ids(&req.descendants);
        req.pending_cloud = photos_for_ids(&req.descendants, &ids);

        let query = ReferenceQuery::new(ids, req.origin.clone());
        let refs = find_references(&req.snapshot, &query);

        if refs.is_empty() {
            req.blocking_refs.clear();
            self.stage = WorkflowStage::ReadyToCommit;
        } else {
            tracing::info!(count = refs.len(), "deletion blocked by outside usages");
            req.blocking_refs = refs;
            self.stage = WorkflowStage::Blocked;
        }
        Ok(self.stage)
    }

    /// Dispatch the mutation encoded in the scope.
    ///
    /// Cloud phase first, per photo: the local reference of a child is
    /// finalized only once its cloud deletion succeeded, so the graph
    /// never claims "deleted" for a file still physically present. Any
    /// failure stops before the structural phase and returns the workflow
    /// to `ReadyToCommit` with the pending set narrowed to the failures.
    fn dispatch(&mut self) -> Result<CommitOutcome, FlowError> {
        let Some(req) = self.request.as_mut() else {
            return Err(FlowError::InvalidStage {
                action: "commit",
                stage: self.stage,
            });
        };

        let mut removed = Vec::new();
        let mut cloud_deleted = Vec::new();
        let mut failures = Vec::new();

        if req.scope.delete_cloud_files {
            let pending = std::mem::take(&mut req.pending_cloud);
            for photo in pending {
                match self.store.delete_cloud_file(&photo.id) {
                    Ok(()) => {
                        cloud_deleted.push(photo.id.clone());
                        for path in photo_paths_in_origin(&req.snapshot, &req.origin, &photo.id) {
                            match self.store.remove_local_reference(&path) {
                                Ok(()) => removed.push(path),
                                Err(StoreError::ReferenceNotFound { .. }) => {}
                                Err(err) => failures.push(CommitFailure {
                                    photo: photo.id.clone(),
                                    file: photo.file.clone(),
                                    message: err.to_string(),
                                }),
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(photo = %photo.id, error = %err, "cloud deletion failed");
                        failures.push(CommitFailure {
                            photo: photo.id.clone(),
                            file: photo.file.clone(),
                            message: err.to_string(),
                        });
                        req.pending_cloud.push(photo);
                    }
                }
            }

            if !failures.is_empty() {
                self.stage = WorkflowStage::ReadyToCommit;
                return Ok(CommitOutcome::Partial {
                    cloud_deleted,
                    failures,
                });
            }
        }

        for path in structural_paths(req) {
            match self.store.remove_local_reference(&path) {
                Ok(()) => removed.push(path),
                // Already gone, possibly removed along with a parent.
                Err(StoreError::ReferenceNotFound { .. }) => {}
                Err(err) => {
                    self.stage = WorkflowStage::ReadyToCommit;
                    return Err(err.into());
                }
            }
        }

        tracing::info!(
            removed = removed.len(),
            cloud_deleted = cloud_deleted.len(),
            "deletion committed"
        );
        self.stage = WorkflowStage::Committed;
        self.request = None;
        self.memory.clear();
        Ok(CommitOutcome::Committed {
            removed,
            cloud_deleted,
        })
    }
}

/// Resolve photo ids back to photo entries, direct photos first.
fn photos_for_ids(descendants: &DescendantSummary, ids: &IndexSet<PhotoId>) -> Vec<Photo> {
    let mut seen = IndexSet::new();
    let mut photos = Vec::new();
    for photo in descendants
        .direct_photos
        .iter()
        .chain(descendants.photos_in_posts.iter())
    {
        if ids.contains(&photo.id) && seen.insert(photo.id.clone()) {
            photos.push(photo.clone());
        }
    }
    photos
}

/// Every list entry carrying a photo id within one location.
fn photo_paths_in_origin(graph: &JournalGraph, origin: &Location, photo: &PhotoId) -> Vec<RefPath> {
    let mut paths = Vec::new();
    match origin.kind {
        LocationKind::Moment => {
            let moment_id = MomentId::new(origin.id.clone());
            if let Some(moment) = graph.find_moment(&moment_id) {
                if moment.photos.iter().any(|p| &p.id == photo) {
                    paths.push(RefPath::MomentPhoto {
                        moment: moment_id.clone(),
                        photo: photo.clone(),
                    });
                }
                for post in &moment.posts {
                    if post.photos.iter().any(|p| &p.id == photo) {
                        paths.push(RefPath::PostPhoto {
                            moment: moment_id.clone(),
                            post: post.id.clone(),
                            photo: photo.clone(),
                        });
                    }
                }
            }
        }
        LocationKind::Session => {
            let session_id = SessionId::new(origin.id.clone());
            if let Some(session) = graph.find_session(&session_id) {
                for message in &session.messages {
                    if message.photos.iter().any(|p| &p.id == photo) {
                        paths.push(RefPath::MessagePhoto {
                            session: session_id.clone(),
                            message: message.id.clone(),
                            photo: photo.clone(),
                        });
                    }
                }
            }
        }
    }
    paths
}

/// Local references the structural phase removes, per scope and target.
fn structural_paths(req: &DeletionRequest) -> Vec<RefPath> {
    let scope = &req.scope;
    match &req.target {
        ContentNode::Moment(moment) => {
            if scope.remove_node {
                // Removing the moment takes its posts and photo entries
                // with it.
                return vec![RefPath::Moment {
                    moment: moment.id.clone(),
                }];
            }
            let mut paths = Vec::new();
            if scope.delete_child_posts {
                for post in &req.descendants.posts {
                    paths.push(RefPath::Post {
                        moment: moment.id.clone(),
                        post: post.id.clone(),
                    });
                }
            }
            if scope.delete_child_photos {
                for photo_id in req.descendants.direct_photo_ids() {
                    paths.push(RefPath::MomentPhoto {
                        moment: moment.id.clone(),
                        photo: photo_id,
                    });
                }
            }
            paths
        }
        ContentNode::Post(post) => {
            let moment = MomentId::new(req.origin.id.clone());
            if scope.remove_node {
                return vec![RefPath::Post {
                    moment,
                    post: post.id.clone(),
                }];
            }
            let mut paths = Vec::new();
            if scope.delete_child_photos {
                for photo_id in req.descendants.direct_photo_ids() {
                    paths.push(RefPath::PostPhoto {
                        moment: moment.clone(),
                        post: post.id.clone(),
                        photo: photo_id,
                    });
                }
            }
            paths
        }
        ContentNode::Photo(photo) => {
            if scope.remove_node {
                photo_paths_in_origin(&req.snapshot, &req.origin, &photo.id)
            } else {
                Vec::new()
            }
        }
    }
}
