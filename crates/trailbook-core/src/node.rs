//! Journal content types: moments, posts, photos, chat sessions.

use chrono::{DateTime, NaiveDate, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub CompactString);

        impl $name {
            /// Create a new id.
            pub fn new(id: impl Into<CompactString>) -> Self {
                Self(id.into())
            }

            /// Get the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a moment (top-level journal entry).
    MomentId
);
string_id!(
    /// Identifier of a post (a note nested under a moment).
    PostId
);
string_id!(
    /// Stable identifier of a photo: its filename or storage id.
    PhotoId
);
string_id!(
    /// Identifier of a chat session.
    SessionId
);
string_id!(
    /// Identifier of a single chat message.
    MessageId
);

/// Identifier of any node the persistence collaborator can remove.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    Moment(MomentId),
    Post(PostId),
    Photo(PhotoId),
    Message(MessageId),
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moment(id) => write!(f, "moment:{id}"),
            Self::Post(id) => write!(f, "post:{id}"),
            Self::Photo(id) => write!(f, "photo:{id}"),
            Self::Message(id) => write!(f, "message:{id}"),
        }
    }
}

/// A photo reference as it appears in a moment, post, or message.
///
/// The entry is owned by its containing list, but the underlying physical
/// file on the remote store may be shared with other locations. Removing an
/// entry removes a reference, not necessarily the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Stable identifier (filename or storage id).
    pub id: PhotoId,
    /// Reference to the physical file on the remote store.
    pub file: CompactString,
    /// Thumbnail file reference, if one exists.
    pub thumbnail: Option<CompactString>,
}

impl Photo {
    /// Create a new photo reference.
    pub fn new(id: impl Into<PhotoId>, file: impl Into<CompactString>) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            thumbnail: None,
        }
    }

    /// Attach a thumbnail reference.
    pub fn with_thumbnail(mut self, thumbnail: impl Into<CompactString>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// A text post ("note") nested under a moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier.
    pub id: PostId,
    /// Post title.
    pub title: CompactString,
    /// Body text.
    pub body: String,
    /// Photos owned by this post, in display order.
    pub photos: Vec<Photo>,
}

impl Post {
    /// Create a new post with no photos.
    pub fn new(id: impl Into<PostId>, title: impl Into<CompactString>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            photos: Vec::new(),
        }
    }

    /// Attach photos in display order.
    pub fn with_photos(mut self, photos: Vec<Photo>) -> Self {
        self.photos = photos;
        self
    }
}

/// A top-level journal entry grouping posts and photos for one or more days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    /// Unique identifier.
    pub id: MomentId,
    /// Moment title.
    pub title: CompactString,
    /// Date of the moment, used for chronological ordering.
    pub date: NaiveDate,
    /// Posts owned by this moment, in display order.
    pub posts: Vec<Post>,
    /// Moment-level photos, in display order.
    pub photos: Vec<Photo>,
}

impl Moment {
    /// Create a new empty moment.
    pub fn new(id: impl Into<MomentId>, title: impl Into<CompactString>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            date,
            posts: Vec::new(),
            photos: Vec::new(),
        }
    }

    /// Get the number of direct posts.
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Get the number of photos owned anywhere under this moment.
    pub fn photo_count(&self) -> usize {
        self.photos.len() + self.posts.iter().map(|p| p.photos.len()).sum::<usize>()
    }

    /// Find a post by id.
    pub fn find_post(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|p| &p.id == id)
    }
}

/// A single message in a chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier.
    pub id: MessageId,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
    /// Message text.
    pub text: String,
    /// Photos attached to this message.
    pub photos: Vec<Photo>,
}

impl ChatMessage {
    /// Create a new text-only message.
    pub fn new(id: impl Into<MessageId>, sent_at: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sent_at,
            text: text.into(),
            photos: Vec::new(),
        }
    }

    /// Attach photos to the message.
    pub fn with_photos(mut self, photos: Vec<Photo>) -> Self {
        self.photos = photos;
        self
    }
}

/// A chat-like session that can reference photos from its messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique identifier.
    pub id: SessionId,
    /// Session title.
    pub title: CompactString,
    /// When the session started, used for chronological ordering.
    pub started_at: DateTime<Utc>,
    /// Messages in send order.
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Create a new empty session.
    pub fn new(
        id: impl Into<SessionId>,
        title: impl Into<CompactString>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            started_at,
            messages: Vec::new(),
        }
    }

    /// Find a message by id.
    pub fn find_message(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }
}

/// A content node targeted by a deletion.
///
/// Holds an owned snapshot of the target; the core never caches a node
/// beyond the lifetime of one deletion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContentNode {
    /// A whole moment, including everything it owns.
    Moment(Moment),
    /// A single post under a moment.
    Post(Post),
    /// A single photo. Terminal: deletion of a photo never cascades.
    Photo(Photo),
}

impl ContentNode {
    /// Get the node id for the persistence collaborator.
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Moment(m) => NodeId::Moment(m.id.clone()),
            Self::Post(p) => NodeId::Post(p.id.clone()),
            Self::Photo(p) => NodeId::Photo(p.id.clone()),
        }
    }

    /// Get a human-readable label for the node.
    pub fn label(&self) -> &str {
        match self {
            Self::Moment(m) => &m.title,
            Self::Post(p) => &p.title,
            Self::Photo(p) => p.id.as_str(),
        }
    }

    /// Check if this node is a bare photo.
    pub fn is_photo(&self) -> bool {
        matches!(self, Self::Photo(_))
    }
}

/// Path to one local reference in the data graph.
///
/// Photo ids name physical files and may be shared across locations, so a
/// bare id is not enough to identify a single list entry. A `RefPath` pins
/// the entry down to its owning moment, post, or message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefPath {
    /// A whole moment.
    Moment { moment: MomentId },
    /// A post under a moment.
    Post { moment: MomentId, post: PostId },
    /// A moment-level photo entry.
    MomentPhoto { moment: MomentId, photo: PhotoId },
    /// A photo entry inside a post.
    PostPhoto {
        moment: MomentId,
        post: PostId,
        photo: PhotoId,
    },
    /// A photo entry attached to a chat message.
    MessagePhoto {
        session: SessionId,
        message: MessageId,
        photo: PhotoId,
    },
}

impl RefPath {
    /// Get the id of the node this path removes.
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Moment { moment } => NodeId::Moment(moment.clone()),
            Self::Post { post, .. } => NodeId::Post(post.clone()),
            Self::MomentPhoto { photo, .. }
            | Self::PostPhoto { photo, .. }
            | Self::MessagePhoto { photo, .. } => NodeId::Photo(photo.clone()),
        }
    }
}

impl std::fmt::Display for RefPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moment { moment } => write!(f, "moment:{moment}"),
            Self::Post { moment, post } => write!(f, "moment:{moment}/post:{post}"),
            Self::MomentPhoto { moment, photo } => write!(f, "moment:{moment}/photo:{photo}"),
            Self::PostPhoto {
                moment,
                post,
                photo,
            } => write!(f, "moment:{moment}/post:{post}/photo:{photo}"),
            Self::MessagePhoto {
                session,
                message,
                photo,
            } => write!(f, "session:{session}/message:{message}/photo:{photo}"),
        }
    }
}

/// Kind of location a photo usage lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocationKind {
    /// A moment (directly or via one of its posts).
    Moment,
    /// A chat session (via one of its messages).
    Session,
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moment => write!(f, "moment"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// A place in the data graph: a moment or a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Whether this is a moment or a session.
    pub kind: LocationKind,
    /// Identifier of the moment or session.
    pub id: CompactString,
}

impl Location {
    /// Location of a moment.
    pub fn moment(id: &MomentId) -> Self {
        Self {
            kind: LocationKind::Moment,
            id: id.0.clone(),
        }
    }

    /// Location of a session.
    pub fn session(id: &SessionId) -> Self {
        Self {
            kind: LocationKind::Session,
            id: id.0.clone(),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_creation() {
        let photo = Photo::new("IMG_001.jpg", "drive/photos/IMG_001.jpg")
            .with_thumbnail("drive/thumbs/IMG_001.jpg");
        assert_eq!(photo.id.as_str(), "IMG_001.jpg");
        assert!(photo.thumbnail.is_some());
    }

    #[test]
    fn test_moment_photo_count() {
        let mut moment = Moment::new("m1", "Lisbon", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        moment.photos.push(Photo::new("a.jpg", "drive/a.jpg"));
        moment.posts.push(
            Post::new("p1", "Day one", "Arrived late.").with_photos(vec![
                Photo::new("b.jpg", "drive/b.jpg"),
                Photo::new("c.jpg", "drive/c.jpg"),
            ]),
        );

        assert_eq!(moment.post_count(), 1);
        assert_eq!(moment.photo_count(), 3);
    }

    #[test]
    fn test_content_node_id() {
        let node = ContentNode::Photo(Photo::new("a.jpg", "drive/a.jpg"));
        assert!(node.is_photo());
        assert_eq!(node.node_id().to_string(), "photo:a.jpg");
    }

    #[test]
    fn test_location_display() {
        let loc = Location::moment(&MomentId::new("m1"));
        assert_eq!(loc.to_string(), "moment:m1");
        assert_eq!(loc.kind, LocationKind::Moment);
    }
}
