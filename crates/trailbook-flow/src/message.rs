//! Message-photo deletion.
//!
//! Deleting a photo attached to a chat message is a short two-choice flow
//! rather than a full workflow request: remove the reference from the
//! message, or also delete the physical file. The with-file path runs the
//! same cross-reference check as the main workflow and refuses to delete a
//! file still used elsewhere; `legacy_message_path` restores the old
//! unchecked behavior.

use trailbook_core::{ContentTree, Location, MessageId, PhotoId, RefPath, SessionId};
use trailbook_index::{find_references, CrossReference, ReferenceQuery};

use crate::config::WorkflowConfig;
use crate::error::FlowError;
use crate::store::{JournalStore, StoreError};

/// Result of a with-file message-photo deletion.
#[derive(Debug)]
pub enum MessageDeleteOutcome {
    /// The reference is gone; the file was deleted too if requested.
    Removed {
        /// Whether the physical file was deleted.
        cloud_deleted: bool,
    },
    /// The file is referenced outside this session; nothing was mutated.
    Blocked {
        /// The outside usages, in index order.
        refs: Vec<CrossReference>,
    },
}

/// Remove a photo reference from a chat message, keeping the file.
///
/// Always permitted: detaching a reference never needs a usage check.
pub fn remove_message_photo<S: JournalStore>(
    store: &mut S,
    session: &SessionId,
    message: &MessageId,
    photo: &PhotoId,
) -> Result<(), FlowError> {
    let path = RefPath::MessagePhoto {
        session: session.clone(),
        message: message.clone(),
        photo: photo.clone(),
    };
    store.remove_local_reference(&path)?;
    tracing::debug!(%path, "message photo reference removed");
    Ok(())
}

/// Remove a photo reference from a chat message and delete its file.
///
/// Queries the cross-reference index first, excluding this session; any
/// outside usage blocks the deletion with nothing mutated. The file is
/// deleted before the reference is finalized, mirroring the main commit
/// discipline.
pub fn delete_message_photo_with_file<S: JournalStore>(
    store: &mut S,
    config: &WorkflowConfig,
    session: &SessionId,
    message: &MessageId,
    photo: &PhotoId,
) -> Result<MessageDeleteOutcome, FlowError> {
    if !config.legacy_message_path {
        let tree = ContentTree::new(store.load_snapshot()?);
        let query = ReferenceQuery::single(photo.clone(), Location::session(session));
        let refs = find_references(&tree.graph, &query);
        if !refs.is_empty() {
            tracing::info!(%photo, count = refs.len(), "message photo deletion blocked");
            return Ok(MessageDeleteOutcome::Blocked { refs });
        }
    }

    store.delete_cloud_file(photo)?;
    let path = RefPath::MessagePhoto {
        session: session.clone(),
        message: message.clone(),
        photo: photo.clone(),
    };
    match store.remove_local_reference(&path) {
        Ok(()) | Err(StoreError::ReferenceNotFound { .. }) => {}
        Err(err) => return Err(err.into()),
    }
    tracing::info!(%photo, "message photo and file deleted");
    Ok(MessageDeleteOutcome::Removed {
        cloud_deleted: true,
    })
}
