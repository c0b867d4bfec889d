//! Persistence collaborator interface and an in-memory implementation.

use std::collections::HashSet;

use thiserror::Error;

use trailbook_core::{GraphError, JournalGraph, PhotoId, RefPath};

/// Errors reported by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entry does not exist (or was already removed).
    #[error("no such reference: {path}")]
    ReferenceNotFound { path: String },

    /// A cloud file could not be deleted. Failures are independent per
    /// file; one failing file never implies anything about the others.
    #[error("cloud file '{file}' could not be deleted: {reason}")]
    CloudUnavailable { file: String, reason: String },

    /// Any other backend failure.
    #[error("storage backend error: {message}")]
    Backend { message: String },
}

impl From<GraphError> for StoreError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::ReferenceNotFound { path } => Self::ReferenceNotFound { path },
            GraphError::LocationNotFound { location } => Self::ReferenceNotFound {
                path: location,
            },
        }
    }
}

/// The persistence collaborator.
///
/// The workflow owns no storage: every mutation is delegated here. Local
/// reference removal and cloud-file deletion are separate operations with
/// independent failure; no atomicity is assumed across multiple files.
pub trait JournalStore {
    /// Read a fresh snapshot of the whole graph.
    fn load_snapshot(&mut self) -> Result<JournalGraph, StoreError>;

    /// Remove one local reference (a list entry, post, or moment) from the
    /// index. Never touches physical files.
    fn remove_local_reference(&mut self, path: &RefPath) -> Result<(), StoreError>;

    /// Delete one physical photo file on the remote store.
    fn delete_cloud_file(&mut self, photo: &PhotoId) -> Result<(), StoreError>;
}

/// In-memory store over a [`JournalGraph`].
///
/// Records every call and supports per-photo cloud failure injection, so
/// workflow tests can assert exactly which collaborator calls were made.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: JournalGraph,
    failing_cloud: HashSet<PhotoId>,
    /// Photos whose cloud files were deleted, in call order.
    pub cloud_deleted: Vec<PhotoId>,
    /// Local references removed, in call order.
    pub removed_refs: Vec<RefPath>,
    /// Number of snapshot reads served.
    pub snapshot_loads: usize,
}

impl MemoryStore {
    /// Create a store over a graph.
    pub fn new(graph: JournalGraph) -> Self {
        Self {
            graph,
            ..Default::default()
        }
    }

    /// Make future cloud deletions of this photo fail.
    pub fn fail_cloud_deletion(&mut self, photo: PhotoId) {
        self.failing_cloud.insert(photo);
    }

    /// Let future cloud deletions of this photo succeed again.
    pub fn restore_cloud(&mut self, photo: &PhotoId) {
        self.failing_cloud.remove(photo);
    }

    /// Access the current graph state.
    pub fn graph(&self) -> &JournalGraph {
        &self.graph
    }

    /// Mutate the graph directly, simulating an edit made elsewhere while
    /// a deletion request is parked.
    pub fn graph_mut(&mut self) -> &mut JournalGraph {
        &mut self.graph
    }
}

impl JournalStore for MemoryStore {
    fn load_snapshot(&mut self) -> Result<JournalGraph, StoreError> {
        self.snapshot_loads += 1;
        Ok(self.graph.clone())
    }

    fn remove_local_reference(&mut self, path: &RefPath) -> Result<(), StoreError> {
        self.graph.remove_reference(path)?;
        self.removed_refs.push(path.clone());
        Ok(())
    }

    fn delete_cloud_file(&mut self, photo: &PhotoId) -> Result<(), StoreError> {
        if self.failing_cloud.contains(photo) {
            return Err(StoreError::CloudUnavailable {
                file: photo.to_string(),
                reason: "remote store rejected the delete".to_string(),
            });
        }
        self.cloud_deleted.push(photo.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use trailbook_core::{Moment, Photo};

    fn store_with_photo() -> MemoryStore {
        let mut moment = Moment::new("m1", "Lisbon", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        moment.photos.push(Photo::new("a.jpg", "drive/a.jpg"));
        MemoryStore::new(JournalGraph {
            moments: vec![moment],
            sessions: Vec::new(),
        })
    }

    #[test]
    fn test_snapshot_load_counts() {
        let mut store = store_with_photo();
        store.load_snapshot().unwrap();
        store.load_snapshot().unwrap();
        assert_eq!(store.snapshot_loads, 2);
    }

    #[test]
    fn test_cloud_failure_injection() {
        let mut store = store_with_photo();
        store.fail_cloud_deletion("a.jpg".into());

        let err = store.delete_cloud_file(&"a.jpg".into()).unwrap_err();
        assert!(matches!(err, StoreError::CloudUnavailable { .. }));
        assert!(store.cloud_deleted.is_empty());

        store.restore_cloud(&"a.jpg".into());
        store.delete_cloud_file(&"a.jpg".into()).unwrap();
        assert_eq!(store.cloud_deleted.len(), 1);
    }

    #[test]
    fn test_remove_reference_mutates_graph() {
        let mut store = store_with_photo();
        store
            .remove_local_reference(&RefPath::MomentPhoto {
                moment: "m1".into(),
                photo: "a.jpg".into(),
            })
            .unwrap();
        assert!(store.graph().moments[0].photos.is_empty());
        assert_eq!(store.removed_refs.len(), 1);
    }
}
