//! Journal graph snapshot and the read-only content tree.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node::{
    ChatSession, ContentNode, Moment, MomentId, Photo, PhotoId, Post, PostId, RefPath, SessionId,
};

/// One persisted snapshot of the whole data graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalGraph {
    /// All moments, in chronological order.
    pub moments: Vec<Moment>,
    /// All chat sessions, in chronological order.
    pub sessions: Vec<ChatSession>,
}

impl JournalGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a moment by id.
    pub fn find_moment(&self, id: &MomentId) -> Option<&Moment> {
        self.moments.iter().find(|m| &m.id == id)
    }

    /// Find a session by id.
    pub fn find_session(&self, id: &SessionId) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Find a post and its containing moment.
    pub fn find_post(&self, id: &PostId) -> Option<(&Moment, &Post)> {
        self.moments
            .iter()
            .find_map(|m| m.find_post(id).map(|p| (m, p)))
    }

    /// Remove a single local reference from the graph.
    ///
    /// Removes a list entry (or a whole moment/post), never a physical file.
    pub fn remove_reference(&mut self, path: &RefPath) -> Result<(), GraphError> {
        let found = match path {
            RefPath::Moment { moment } => {
                let before = self.moments.len();
                self.moments.retain(|m| &m.id != moment);
                self.moments.len() < before
            }
            RefPath::Post { moment, post } => self
                .moments
                .iter_mut()
                .find(|m| &m.id == moment)
                .is_some_and(|m| {
                    let before = m.posts.len();
                    m.posts.retain(|p| &p.id != post);
                    m.posts.len() < before
                }),
            RefPath::MomentPhoto { moment, photo } => self
                .moments
                .iter_mut()
                .find(|m| &m.id == moment)
                .is_some_and(|m| {
                    let before = m.photos.len();
                    m.photos.retain(|p| &p.id != photo);
                    m.photos.len() < before
                }),
            RefPath::PostPhoto {
                moment,
                post,
                photo,
            } => self
                .moments
                .iter_mut()
                .find(|m| &m.id == moment)
                .and_then(|m| m.posts.iter_mut().find(|p| &p.id == post))
                .is_some_and(|p| {
                    let before = p.photos.len();
                    p.photos.retain(|ph| &ph.id != photo);
                    p.photos.len() < before
                }),
            RefPath::MessagePhoto {
                session,
                message,
                photo,
            } => self
                .sessions
                .iter_mut()
                .find(|s| &s.id == session)
                .and_then(|s| s.messages.iter_mut().find(|m| &m.id == message))
                .is_some_and(|m| {
                    let before = m.photos.len();
                    m.photos.retain(|ph| &ph.id != photo);
                    m.photos.len() < before
                }),
        };

        if found {
            Ok(())
        } else {
            Err(GraphError::ReferenceNotFound {
                path: path.to_string(),
            })
        }
    }
}

/// Summary statistics for a graph snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total number of moments.
    pub moment_count: usize,
    /// Total number of posts across all moments.
    pub post_count: usize,
    /// Total number of photo references across all locations.
    pub photo_ref_count: usize,
    /// Total number of chat sessions.
    pub session_count: usize,
    /// Total number of chat messages.
    pub message_count: usize,
}

impl GraphStats {
    /// Compute stats for a graph.
    pub fn for_graph(graph: &JournalGraph) -> Self {
        let mut stats = Self {
            moment_count: graph.moments.len(),
            session_count: graph.sessions.len(),
            ..Default::default()
        };

        for moment in &graph.moments {
            stats.post_count += moment.posts.len();
            stats.photo_ref_count += moment.photo_count();
        }
        for session in &graph.sessions {
            stats.message_count += session.messages.len();
            stats.photo_ref_count += session
                .messages
                .iter()
                .map(|m| m.photos.len())
                .sum::<usize>();
        }

        stats
    }
}

/// Descendants of a content node, split by category.
#[derive(Debug, Clone, Default)]
pub struct DescendantSummary {
    /// Posts owned by the node.
    pub posts: Vec<Post>,
    /// Photos owned directly by the node.
    pub direct_photos: Vec<Photo>,
    /// Photos owned by the node's posts.
    pub photos_in_posts: Vec<Photo>,
}

impl DescendantSummary {
    /// Check whether the node has any descendants at all.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.direct_photos.is_empty() && self.photos_in_posts.is_empty()
    }

    /// Total number of photo references across both categories.
    pub fn photo_ref_count(&self) -> usize {
        self.direct_photos.len() + self.photos_in_posts.len()
    }

    /// Distinct photo ids among the direct photos, in display order.
    pub fn direct_photo_ids(&self) -> IndexSet<PhotoId> {
        self.direct_photos.iter().map(|p| p.id.clone()).collect()
    }

    /// Distinct photo ids among photos inside posts, in display order.
    pub fn post_photo_ids(&self) -> IndexSet<PhotoId> {
        self.photos_in_posts.iter().map(|p| p.id.clone()).collect()
    }
}

/// Read-only hierarchical view over a graph snapshot.
#[derive(Debug, Clone)]
pub struct ContentTree {
    /// The snapshot this view reads.
    pub graph: JournalGraph,
    /// When the snapshot was loaded.
    pub loaded_at: DateTime<Utc>,
    /// Summary statistics.
    pub stats: GraphStats,
}

impl ContentTree {
    /// Build a tree view over a snapshot.
    pub fn new(graph: JournalGraph) -> Self {
        let stats = GraphStats::for_graph(&graph);
        Self {
            graph,
            loaded_at: Utc::now(),
            stats,
        }
    }

    /// Compute the descendants of a node, split by category.
    ///
    /// Pure function of the snapshot; no mutation. A bare photo is terminal
    /// and always reports zero descendants. Prefers the snapshot's copy of
    /// the node over the one passed in, so a re-read sees current children.
    pub fn descendants_of(&self, node: &ContentNode) -> DescendantSummary {
        match node {
            ContentNode::Photo(_) => DescendantSummary::default(),
            ContentNode::Post(post) => {
                let current = self
                    .graph
                    .find_post(&post.id)
                    .map(|(_, p)| p)
                    .unwrap_or(post);
                DescendantSummary {
                    posts: Vec::new(),
                    direct_photos: current.photos.clone(),
                    photos_in_posts: Vec::new(),
                }
            }
            ContentNode::Moment(moment) => {
                let current = self.graph.find_moment(&moment.id).unwrap_or(moment);
                DescendantSummary {
                    posts: current.posts.clone(),
                    direct_photos: current.photos.clone(),
                    photos_in_posts: current
                        .posts
                        .iter()
                        .flat_map(|p| p.photos.iter().cloned())
                        .collect(),
                }
            }
        }
    }
}
