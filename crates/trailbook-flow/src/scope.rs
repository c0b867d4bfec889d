//! Deletion scope: which categories a single deletion action includes.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use strum::Display;

use trailbook_core::{ContentNode, DescendantSummary, PhotoId};

use crate::error::FlowError;

/// The operator-selected set of categories included in one deletion.
///
/// Invariant: `delete_cloud_files` implies `delete_child_photos` — cloud
/// removal is only meaningful for photos actually being detached. The
/// coupling is enforced in exactly one place, [`DeletionScope::apply_toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionScope {
    /// Remove the target node itself from the index.
    pub remove_node: bool,
    /// Delete the node's posts (notes).
    pub delete_child_posts: bool,
    /// Detach the node's photos (direct, plus in-post when posts go too).
    pub delete_child_photos: bool,
    /// Also delete the detached photos' physical files on the remote store.
    pub delete_cloud_files: bool,
}

/// A toggleable scope category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScopeField {
    #[strum(to_string = "remove node")]
    RemoveNode,
    #[strum(to_string = "child posts")]
    ChildPosts,
    #[strum(to_string = "child photos")]
    ChildPhotos,
    #[strum(to_string = "cloud files")]
    CloudFiles,
}

impl DeletionScope {
    /// Scope for a node with no descendants: remove the node, nothing else.
    pub fn node_only() -> Self {
        Self {
            remove_node: true,
            delete_child_posts: false,
            delete_child_photos: false,
            delete_cloud_files: false,
        }
    }

    /// Default scope proposed for a node and its descendants.
    ///
    /// Notes and photos default to included; cloud-file deletion defaults
    /// to excluded — the operator must opt in to an irreversible remote
    /// deletion.
    pub fn default_for(descendants: &DescendantSummary) -> Self {
        Self {
            remove_node: true,
            delete_child_posts: !descendants.posts.is_empty(),
            delete_child_photos: descendants.photo_ref_count() > 0,
            delete_cloud_files: false,
        }
    }

    /// Apply one toggle, enforcing the cloud-files invariant.
    ///
    /// Enabling cloud files while child photos are excluded is rejected
    /// with [`FlowError::CloudRequiresPhotos`]. Disabling child photos
    /// forces cloud files off. No other implicit coupling exists.
    pub fn apply_toggle(mut self, field: ScopeField, value: bool) -> Result<Self, FlowError> {
        match field {
            ScopeField::RemoveNode => self.remove_node = value,
            ScopeField::ChildPosts => self.delete_child_posts = value,
            ScopeField::ChildPhotos => {
                self.delete_child_photos = value;
                if !value {
                    self.delete_cloud_files = false;
                }
            }
            ScopeField::CloudFiles => {
                if value && !self.delete_child_photos {
                    return Err(FlowError::CloudRequiresPhotos);
                }
                self.delete_cloud_files = value;
            }
        }
        Ok(self)
    }

    /// The distinct photo ids this scope detaches from the target.
    ///
    /// Photos inside posts are only detached when the posts themselves are
    /// being deleted; direct photos are detached whenever child photos are
    /// in scope. Empty unless cloud files are requested — this set exists
    /// to drive the cross-reference check.
    pub fn implied_photo_ids(&self, descendants: &DescendantSummary) -> IndexSet<PhotoId> {
        if !self.delete_cloud_files {
            return IndexSet::new();
        }

        let mut ids = IndexSet::new();
        if self.delete_child_photos {
            ids.extend(descendants.direct_photo_ids());
            if self.delete_child_posts {
                ids.extend(descendants.post_photo_ids());
            }
        }
        ids
    }

    /// Check whether anything at all is in scope.
    pub fn is_empty(&self) -> bool {
        !self.remove_node
            && !self.delete_child_posts
            && !self.delete_child_photos
            && !self.delete_cloud_files
    }
}

/// Propose a default scope for a deletion target.
///
/// Returns `None` when the node has no descendants: the selector step is
/// skipped entirely and the workflow proceeds straight to confirmation
/// with a node-only scope.
pub fn default_scope(node: &ContentNode, descendants: &DescendantSummary) -> Option<DeletionScope> {
    if node.is_photo() || descendants.is_empty() {
        None
    } else {
        Some(DeletionScope::default_for(descendants))
    }
}
