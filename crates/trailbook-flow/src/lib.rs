//! Cascade deletion workflow for trailbook.
//!
//! This crate drives deletions of journal content as an explicit state
//! machine: scope selection over the target's descendants, a two-choice
//! confirmation, a cross-reference check guarding every cloud-file
//! deletion, cooperative navigation to blocking usages, and a per-photo
//! commit that never finalizes a local removal before the physical file is
//! gone. Storage and navigation are injected collaborators.

mod config;
mod error;
mod message;
mod navigation;
mod request;
mod scope;
mod store;
mod workflow;

pub use config::{WorkflowConfig, WorkflowConfigBuilder};
pub use error::FlowError;
pub use message::{delete_message_photo_with_file, remove_message_photo, MessageDeleteOutcome};
pub use navigation::{NavToken, NavigationMemory, Navigator, RecordingNavigator, ReturnPoint};
pub use request::{DeletionRequest, WorkflowStage};
pub use scope::{default_scope, DeletionScope, ScopeField};
pub use store::{JournalStore, MemoryStore, StoreError};
pub use workflow::{CommitFailure, CommitOutcome, ConfirmOutcome, DeletionWorkflow};
