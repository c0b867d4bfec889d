//! Core types for trailbook.
//!
//! This crate provides the fundamental data structures used throughout the
//! trailbook ecosystem: journal content nodes, the graph snapshot, and the
//! read-only content tree with descendant summaries.

mod error;
mod node;
mod tree;

pub use error::GraphError;
pub use node::{
    ChatMessage, ChatSession, ContentNode, Location, LocationKind, MessageId, Moment, MomentId,
    NodeId, Photo, PhotoId, Post, PostId, RefPath, SessionId,
};
pub use tree::{ContentTree, DescendantSummary, GraphStats, JournalGraph};
