use chrono::{NaiveDate, TimeZone, Utc};
use indexmap::IndexSet;

use trailbook_core::{ChatMessage, ChatSession, JournalGraph, Location, Moment, Photo, Post};
use trailbook_index::{find_references, ReferenceQuery};

/// Three moments and two sessions, deliberately inserted out of
/// chronological order, all sharing one photo.
fn scrambled_graph() -> JournalGraph {
    let photo = || Photo::new("sunset.jpg", "drive/sunset.jpg");

    let mut late = Moment::new("m3", "Faro", NaiveDate::from_ymd_opt(2024, 5, 9).unwrap());
    late.photos.push(photo());

    let mut early = Moment::new("m1", "Lisbon", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    early
        .posts
        .push(Post::new("p1", "Miradouro", "Golden hour.").with_photos(vec![photo()]));

    let mut middle = Moment::new("m2", "Porto", NaiveDate::from_ymd_opt(2024, 5, 5).unwrap());
    middle.photos.push(photo());

    let mut second_chat = ChatSession::new(
        "s2",
        "Work chat",
        Utc.with_ymd_and_hms(2024, 5, 8, 18, 0, 0).unwrap(),
    );
    second_chat.messages.push(
        ChatMessage::new(
            "msg9",
            Utc.with_ymd_and_hms(2024, 5, 8, 18, 3, 0).unwrap(),
            "view from the office trip",
        )
        .with_photos(vec![photo()]),
    );

    let mut first_chat = ChatSession::new(
        "s1",
        "Family chat",
        Utc.with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap(),
    );
    first_chat.messages.push(
        ChatMessage::new(
            "msg2",
            Utc.with_ymd_and_hms(2024, 5, 4, 10, 1, 0).unwrap(),
            "sunset!",
        )
        .with_photos(vec![photo()]),
    );

    JournalGraph {
        moments: vec![late, early, middle],
        sessions: vec![second_chat, first_chat],
    }
}

#[test]
fn test_results_are_chronological_moments_first() {
    let graph = scrambled_graph();
    let query = ReferenceQuery::single("sunset.jpg".into(), Location::moment(&"m9".into()));

    let refs = find_references(&graph, &query);
    let locations: Vec<String> = refs.iter().map(|r| r.location.id.to_string()).collect();
    assert_eq!(locations, vec!["m1", "m2", "m3", "s1", "s2"]);
}

#[test]
fn test_repeated_query_is_deterministic() {
    let graph = scrambled_graph();
    let query = ReferenceQuery::single("sunset.jpg".into(), Location::moment(&"m2".into()));

    let first = find_references(&graph, &query);
    let second = find_references(&graph, &query);
    assert_eq!(first, second);
}

#[test]
fn test_query_observes_edits_to_the_snapshot() {
    let mut graph = scrambled_graph();
    let query = ReferenceQuery::single("sunset.jpg".into(), Location::moment(&"m2".into()));
    assert_eq!(find_references(&graph, &query).len(), 4);

    // Drop every chat usage; the next query sees only the moments.
    for session in &mut graph.sessions {
        for message in &mut session.messages {
            message.photos.clear();
        }
    }
    let refs = find_references(&graph, &query);
    assert_eq!(refs.len(), 2);
    assert!(refs.iter().all(|r| r.location.id.starts_with('m')));
}

#[test]
fn test_multi_photo_query_reports_each_usage() {
    let mut graph = scrambled_graph();
    graph.moments[1]
        .photos
        .push(Photo::new("door.jpg", "drive/door.jpg"));

    let ids: IndexSet<_> = ["sunset.jpg", "door.jpg"]
        .into_iter()
        .map(Into::into)
        .collect();
    let query = ReferenceQuery::new(ids, Location::session(&"s1".into()));

    let refs = find_references(&graph, &query);
    assert_eq!(refs.len(), 5);
    assert_eq!(
        refs.iter().filter(|r| r.photo.as_str() == "door.jpg").count(),
        1
    );
}

#[test]
fn test_excluded_session_never_appears() {
    let graph = scrambled_graph();
    let query = ReferenceQuery::single("sunset.jpg".into(), Location::session(&"s1".into()));

    let refs = find_references(&graph, &query);
    assert_eq!(refs.len(), 4);
    assert!(refs.iter().all(|r| r.location.id != "s1"));
}
