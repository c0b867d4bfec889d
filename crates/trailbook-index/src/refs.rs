//! Cross-reference lookup over a graph snapshot.
//!
//! Given a set of candidate photo ids, finds every other moment or session
//! that still uses them. The result is derived, never stored: each query
//! re-reads the snapshot it is given, so a repeated query after an edit
//! naturally observes the change.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use indexmap::IndexSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use trailbook_core::{JournalGraph, Location, PhotoId};

/// A query for photo usages outside one location.
#[derive(Debug, Clone)]
pub struct ReferenceQuery {
    /// Photo ids to look for.
    pub photo_ids: IndexSet<PhotoId>,
    /// The location the operator is deleting from. Usages inside it do not
    /// count: a photo whose only use is in the node being deleted must not
    /// block that deletion.
    pub excluding: Location,
}

impl ReferenceQuery {
    /// Create a new query.
    pub fn new(photo_ids: IndexSet<PhotoId>, excluding: Location) -> Self {
        Self {
            photo_ids,
            excluding,
        }
    }

    /// Query for a single photo id.
    pub fn single(photo_id: PhotoId, excluding: Location) -> Self {
        Self::new(IndexSet::from([photo_id]), excluding)
    }
}

/// Enough information to navigate to a photo usage and highlight it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// The post or message id holding the usage, if it is not a
    /// location-level usage.
    pub item: Option<CompactString>,
    /// Human title of the location.
    pub title: CompactString,
    /// Message timestamp, used to order chat previews.
    pub timestamp: Option<DateTime<Utc>>,
}

/// One usage of a photo from a location other than the one being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    /// The shared photo.
    pub photo: PhotoId,
    /// Where the usage lives.
    pub location: Location,
    /// How to navigate to and highlight it.
    pub anchor: Anchor,
}

/// Find every usage of the queried photos outside the excluded location.
///
/// Ordering is a contract, not cosmetics: moment references come before
/// session references, and within each group the targets appear in natural
/// chronological order. Two identical queries against an unchanged graph
/// return identical, identically ordered results.
pub fn find_references(graph: &JournalGraph, query: &ReferenceQuery) -> Vec<CrossReference> {
    let mut refs = Vec::new();

    for moment in graph
        .moments
        .iter()
        .sorted_by_key(|m| (m.date, m.id.clone()))
    {
        let location = Location::moment(&moment.id);
        if location == query.excluding {
            continue;
        }

        for photo in &moment.photos {
            if query.photo_ids.contains(&photo.id) {
                refs.push(CrossReference {
                    photo: photo.id.clone(),
                    location: location.clone(),
                    anchor: Anchor {
                        item: None,
                        title: moment.title.clone(),
                        timestamp: None,
                    },
                });
            }
        }
        for post in &moment.posts {
            for photo in &post.photos {
                if query.photo_ids.contains(&photo.id) {
                    refs.push(CrossReference {
                        photo: photo.id.clone(),
                        location: location.clone(),
                        anchor: Anchor {
                            item: Some(post.id.0.clone()),
                            title: moment.title.clone(),
                            timestamp: None,
                        },
                    });
                }
            }
        }
    }

    for session in graph
        .sessions
        .iter()
        .sorted_by_key(|s| (s.started_at, s.id.clone()))
    {
        let location = Location::session(&session.id);
        if location == query.excluding {
            continue;
        }

        for message in &session.messages {
            for photo in &message.photos {
                if query.photo_ids.contains(&photo.id) {
                    refs.push(CrossReference {
                        photo: photo.id.clone(),
                        location: location.clone(),
                        anchor: Anchor {
                            item: Some(message.id.0.clone()),
                            title: session.title.clone(),
                            timestamp: Some(message.sent_at),
                        },
                    });
                }
            }
        }
    }

    tracing::debug!(
        photos = query.photo_ids.len(),
        excluding = %query.excluding,
        found = refs.len(),
        "cross-reference query"
    );

    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use trailbook_core::{ChatMessage, ChatSession, Moment, Photo, Post};

    fn shared_graph() -> JournalGraph {
        let mut lisbon = Moment::new("m1", "Lisbon", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        lisbon.photos.push(Photo::new("tram.jpg", "drive/tram.jpg"));

        let mut porto = Moment::new("m2", "Porto", NaiveDate::from_ymd_opt(2024, 5, 5).unwrap());
        porto.posts.push(
            Post::new("p1", "Riverside", "Walked the Ribeira.")
                .with_photos(vec![Photo::new("tram.jpg", "drive/tram.jpg")]),
        );

        let mut session = ChatSession::new(
            "s1",
            "Trip chat",
            Utc.with_ymd_and_hms(2024, 5, 3, 9, 0, 0).unwrap(),
        );
        session.messages.push(
            ChatMessage::new(
                "msg1",
                Utc.with_ymd_and_hms(2024, 5, 3, 9, 5, 0).unwrap(),
                "look at this",
            )
            .with_photos(vec![Photo::new("tram.jpg", "drive/tram.jpg")]),
        );

        JournalGraph {
            moments: vec![lisbon, porto],
            sessions: vec![session],
        }
    }

    #[test]
    fn test_excludes_deleting_location() {
        let graph = shared_graph();
        let query = ReferenceQuery::single(
            "tram.jpg".into(),
            Location::moment(&"m1".into()),
        );

        let refs = find_references(&graph, &query);
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.location.id != "m1"));
    }

    #[test]
    fn test_moments_before_sessions() {
        let graph = shared_graph();
        let query = ReferenceQuery::single(
            "tram.jpg".into(),
            Location::moment(&"m9".into()),
        );

        let refs = find_references(&graph, &query);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].location.kind, trailbook_core::LocationKind::Moment);
        assert_eq!(refs[1].location.kind, trailbook_core::LocationKind::Moment);
        assert_eq!(refs[2].location.kind, trailbook_core::LocationKind::Session);
    }

    #[test]
    fn test_anchor_carries_item_and_timestamp() {
        let graph = shared_graph();
        let query = ReferenceQuery::single(
            "tram.jpg".into(),
            Location::moment(&"m1".into()),
        );

        let refs = find_references(&graph, &query);
        let post_ref = &refs[0];
        assert_eq!(post_ref.anchor.item.as_deref(), Some("p1"));
        assert_eq!(post_ref.anchor.title, "Porto");

        let session_ref = &refs[1];
        assert_eq!(session_ref.anchor.item.as_deref(), Some("msg1"));
        assert!(session_ref.anchor.timestamp.is_some());
    }

    #[test]
    fn test_only_use_inside_target_is_not_blocking() {
        let mut graph = JournalGraph::new();
        let mut moment =
            Moment::new("m1", "Solo", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        moment.photos.push(Photo::new("one.jpg", "drive/one.jpg"));
        graph.moments.push(moment);

        let query = ReferenceQuery::single(
            "one.jpg".into(),
            Location::moment(&"m1".into()),
        );
        assert!(find_references(&graph, &query).is_empty());
    }
}
