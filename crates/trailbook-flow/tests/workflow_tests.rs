//! End-to-end tests for the deletion workflow against the in-memory store.

use chrono::{NaiveDate, TimeZone, Utc};

use trailbook_core::{
    ChatMessage, ChatSession, ContentNode, JournalGraph, Location, Moment, Photo, PhotoId, Post,
};
use trailbook_flow::{
    CommitOutcome, ConfirmOutcome, DeletionWorkflow, FlowError, MemoryStore, RecordingNavigator,
    ScopeField, WorkflowConfig, WorkflowStage,
};

/// A moment holding a photo that a chat session also references.
fn graph_with_shared_photo() -> JournalGraph {
    let mut moment = Moment::new("m1", "Lisbon", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    moment.photos.push(Photo::new("tram.jpg", "drive/tram.jpg"));

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
        moments: vec![moment],
        sessions: vec![session],
    }
}

/// A moment with two photos nobody else references.
fn graph_with_private_photos() -> JournalGraph {
    let mut moment = Moment::new("m1", "Porto", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    moment.photos.push(Photo::new("a.jpg", "drive/a.jpg"));
    moment.photos.push(Photo::new("b.jpg", "drive/b.jpg"));
    JournalGraph {
        moments: vec![moment],
        sessions: Vec::new(),
    }
}

fn workflow_over(graph: JournalGraph) -> DeletionWorkflow<MemoryStore, RecordingNavigator> {
    DeletionWorkflow::new(MemoryStore::new(graph), RecordingNavigator::default())
}

fn begin_moment_deletion(flow: &mut DeletionWorkflow<MemoryStore, RecordingNavigator>) {
    let moment = flow.store().graph().moments[0].clone();
    let origin = Location::moment(&moment.id);
    flow.begin(ContentNode::Moment(moment), origin).unwrap();
}

#[test]
fn test_cloud_excluded_scope_commits_without_reference_check() {
    let mut flow = workflow_over(graph_with_shared_photo());
    begin_moment_deletion(&mut flow);
    assert_eq!(flow.stage(), WorkflowStage::ScopeSelection);

    // Default scope keeps cloud files out.
    assert!(!flow.scope().unwrap().delete_cloud_files);
    flow.accept_scope().unwrap();

    let outcome = flow.confirm_cloud().unwrap();
    assert!(matches!(outcome, ConfirmOutcome::Committed(_)));
    assert_eq!(flow.stage(), WorkflowStage::Committed);

    // Only the snapshot read at begin: no re-check ever ran.
    assert_eq!(flow.store().snapshot_loads, 1);
    assert!(flow.store().cloud_deleted.is_empty());
    assert!(flow.store().graph().moments.is_empty());
    // The session's reference to the shared file is untouched.
    assert_eq!(flow.store().graph().sessions[0].messages[0].photos.len(), 1);
}

#[test]
fn test_cloud_deletion_blocked_by_outside_usage() {
    let mut flow = workflow_over(graph_with_shared_photo());
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();

    let outcome = flow.confirm_cloud().unwrap();
    assert!(matches!(outcome, ConfirmOutcome::Blocked));
    assert_eq!(flow.stage(), WorkflowStage::Blocked);

    let refs = flow.blocking_refs();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].location.id, "s1");
    assert_eq!(refs[0].photo.as_str(), "tram.jpg");

    // Nothing was mutated while blocked.
    assert!(flow.store().cloud_deleted.is_empty());
    assert!(flow.store().removed_refs.is_empty());
}

#[test]
fn test_local_fallback_from_blocked_keeps_the_file() {
    let mut flow = workflow_over(graph_with_shared_photo());
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();
    flow.confirm_cloud().unwrap();
    assert_eq!(flow.stage(), WorkflowStage::Blocked);

    let outcome = flow.confirm_local().unwrap();
    assert!(matches!(outcome, CommitOutcome::Committed { .. }));
    assert_eq!(flow.stage(), WorkflowStage::Committed);

    assert!(flow.store().cloud_deleted.is_empty());
    assert!(flow.store().graph().moments.is_empty());
    assert_eq!(flow.store().graph().sessions[0].messages[0].photos.len(), 1);
}

#[test]
fn test_remediation_via_navigation_unblocks_the_deletion() {
    let mut flow = workflow_over(graph_with_shared_photo());
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();
    flow.confirm_cloud().unwrap();

    let token = flow.follow_reference(0).unwrap();
    assert_eq!(flow.stage(), WorkflowStage::Blocked);
    assert_eq!(flow.navigator().visits.len(), 1);
    assert_eq!(flow.navigator().visits[0].0.id, "s1");

    // The operator removes the session's copy while "over there".
    flow.store_mut()
        .graph_mut()
        .sessions[0]
        .messages[0]
        .photos
        .clear();

    // Returning re-runs the check against a fresh snapshot.
    let stage = flow.return_from_navigation(token).unwrap();
    assert_eq!(stage, WorkflowStage::ReadyToCommit);

    let outcome = flow.commit().unwrap();
    match outcome {
        CommitOutcome::Committed {
            removed,
            cloud_deleted,
        } => {
            assert_eq!(cloud_deleted, vec![PhotoId::new("tram.jpg")]);
            assert!(!removed.is_empty());
        }
        other => panic!("expected Committed, got {other:?}"),
    }
    assert_eq!(flow.stage(), WorkflowStage::Committed);
    assert!(flow.store().graph().moments.is_empty());
    assert!(flow.request().is_none());
}

#[test]
fn test_navigation_token_is_single_use() {
    let mut flow = workflow_over(graph_with_shared_photo());
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();
    flow.confirm_cloud().unwrap();

    let token = flow.follow_reference(0).unwrap();
    // First return re-checks; the graph is unchanged so it blocks again.
    assert_eq!(
        flow.return_from_navigation(token).unwrap(),
        WorkflowStage::Blocked
    );
    // The consumed token no longer works.
    let err = flow.return_from_navigation(token).unwrap_err();
    assert!(matches!(err, FlowError::UnknownToken));
}

#[test]
fn test_recheck_is_idempotent_on_unchanged_graph() {
    let mut flow = workflow_over(graph_with_shared_photo());
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();
    flow.confirm_cloud().unwrap();

    let first = flow.blocking_refs().to_vec();
    assert_eq!(flow.recheck().unwrap(), WorkflowStage::Blocked);
    assert_eq!(flow.blocking_refs(), first.as_slice());
    assert_eq!(flow.recheck().unwrap(), WorkflowStage::Blocked);
    assert_eq!(flow.blocking_refs(), first.as_slice());
}

#[test]
fn test_partial_cloud_failure_narrows_and_allows_retry() {
    let mut flow = workflow_over(graph_with_private_photos());
    flow.store_mut().fail_cloud_deletion("a.jpg".into());

    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();
    assert!(matches!(
        flow.confirm_cloud().unwrap(),
        ConfirmOutcome::ReadyToCommit
    ));

    let outcome = flow.commit().unwrap();
    match outcome {
        CommitOutcome::Partial {
            cloud_deleted,
            failures,
        } => {
            assert_eq!(cloud_deleted, vec![PhotoId::new("b.jpg")]);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].photo.as_str(), "a.jpg");
        }
        other => panic!("expected Partial, got {other:?}"),
    }

    // Back at ReadyToCommit; the failed photo's reference survived and the
    // moment itself was not touched.
    assert_eq!(flow.stage(), WorkflowStage::ReadyToCommit);
    let moment = &flow.store().graph().moments[0];
    assert_eq!(moment.photos.len(), 1);
    assert_eq!(moment.photos[0].id.as_str(), "a.jpg");

    // Retry after the remote store recovers deletes only the remainder.
    flow.store_mut().restore_cloud(&"a.jpg".into());
    let outcome = flow.commit().unwrap();
    assert!(matches!(outcome, CommitOutcome::Committed { .. }));
    assert_eq!(flow.stage(), WorkflowStage::Committed);
    assert_eq!(
        flow.store().cloud_deleted,
        vec![PhotoId::new("b.jpg"), PhotoId::new("a.jpg")]
    );
    assert!(flow.store().graph().moments.is_empty());
}

#[test]
fn test_zero_descendants_skip_scope_selection() {
    let graph = JournalGraph {
        moments: vec![Moment::new(
            "m1",
            "Empty day",
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        )],
        sessions: Vec::new(),
    };
    let mut flow = workflow_over(graph);
    begin_moment_deletion(&mut flow);
    assert_eq!(flow.stage(), WorkflowStage::Confirming);

    let scope = flow.scope().unwrap();
    assert!(scope.remove_node);
    assert!(!scope.delete_child_photos);

    flow.confirm_local().unwrap();
    assert!(flow.store().graph().moments.is_empty());
}

#[test]
fn test_photo_target_is_terminal() {
    let mut flow = workflow_over(graph_with_shared_photo());
    let photo = flow.store().graph().moments[0].photos[0].clone();
    let origin = Location::moment(&"m1".into());

    flow.begin(ContentNode::Photo(photo), origin).unwrap();
    // No selector for a bare photo.
    assert_eq!(flow.stage(), WorkflowStage::Confirming);

    flow.confirm_local().unwrap();
    assert!(flow.store().graph().moments[0].photos.is_empty());
    assert!(flow.store().cloud_deleted.is_empty());
    // The session's copy of the same file id is untouched.
    assert_eq!(flow.store().graph().sessions[0].messages[0].photos.len(), 1);
}

#[test]
fn test_post_deletion_scoped_to_its_moment() {
    let mut moment = Moment::new("m1", "Lisbon", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    moment.posts.push(
        Post::new("p1", "Day one", "Arrived late.")
            .with_photos(vec![Photo::new("b.jpg", "drive/b.jpg")]),
    );
    let graph = JournalGraph {
        moments: vec![moment],
        sessions: Vec::new(),
    };

    let mut flow = workflow_over(graph);
    let post = flow.store().graph().moments[0].posts[0].clone();
    flow.begin(ContentNode::Post(post), Location::moment(&"m1".into()))
        .unwrap();
    assert_eq!(flow.stage(), WorkflowStage::ScopeSelection);

    flow.accept_scope().unwrap();
    flow.confirm_local().unwrap();
    assert!(flow.store().graph().moments[0].posts.is_empty());
    // The moment itself survives a post deletion.
    assert_eq!(flow.store().graph().moments.len(), 1);
}

#[test]
fn test_scope_toggle_rejected_without_photos() {
    let mut moment = Moment::new("m1", "Notes only", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    moment.posts.push(Post::new("p1", "Day one", "text"));
    let graph = JournalGraph {
        moments: vec![moment],
        sessions: Vec::new(),
    };

    let mut flow = workflow_over(graph);
    begin_moment_deletion(&mut flow);
    // Default scope has no child photos: no photo refs exist.
    assert!(!flow.scope().unwrap().delete_child_photos);

    let err = flow.toggle_scope(ScopeField::CloudFiles, true).unwrap_err();
    assert!(matches!(err, FlowError::CloudRequiresPhotos));
    // The rejection leaves the stage and scope unchanged.
    assert_eq!(flow.stage(), WorkflowStage::ScopeSelection);
    assert!(!flow.scope().unwrap().delete_cloud_files);
}

#[test]
fn test_stage_guards() {
    let mut flow = workflow_over(graph_with_shared_photo());

    // Nothing to commit or cancel while idle.
    assert!(matches!(
        flow.commit().unwrap_err(),
        FlowError::InvalidStage { .. }
    ));
    assert!(matches!(
        flow.cancel().unwrap_err(),
        FlowError::InvalidStage { .. }
    ));

    begin_moment_deletion(&mut flow);
    flow.accept_scope().unwrap();

    // Scope is frozen once accepted.
    assert!(matches!(
        flow.toggle_scope(ScopeField::ChildPosts, false).unwrap_err(),
        FlowError::InvalidStage { .. }
    ));

    // A second request cannot start while one is in flight.
    let other = ContentNode::Photo(Photo::new("x.jpg", "drive/x.jpg"));
    let err = flow
        .begin(other, Location::moment(&"m1".into()))
        .unwrap_err();
    assert!(matches!(err, FlowError::RequestInFlight { .. }));
}

#[test]
fn test_cancel_discards_without_mutation() {
    let mut flow = workflow_over(graph_with_shared_photo());
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();
    flow.confirm_cloud().unwrap();
    assert_eq!(flow.stage(), WorkflowStage::Blocked);

    flow.cancel().unwrap();
    assert_eq!(flow.stage(), WorkflowStage::Cancelled);
    assert!(flow.request().is_none());
    assert!(flow.store().removed_refs.is_empty());
    assert!(flow.store().cloud_deleted.is_empty());
    assert_eq!(flow.store().graph().moments.len(), 1);

    // A fresh request may start after cancellation.
    begin_moment_deletion(&mut flow);
    assert_eq!(flow.stage(), WorkflowStage::ScopeSelection);
}

#[test]
fn test_blocking_ref_truncation_does_not_unblock() {
    let mut graph = graph_with_shared_photo();
    // A second outside usage of the same file.
    let mut porto = Moment::new("m2", "Porto", NaiveDate::from_ymd_opt(2024, 5, 5).unwrap());
    porto.photos.push(Photo::new("tram.jpg", "drive/tram.jpg"));
    graph.moments.push(porto);

    let config = WorkflowConfig::builder()
        .max_blocking_refs(1usize)
        .build()
        .unwrap();
    let mut flow = DeletionWorkflow::with_config(
        MemoryStore::new(graph),
        RecordingNavigator::default(),
        config,
    );
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();

    assert!(matches!(
        flow.confirm_cloud().unwrap(),
        ConfirmOutcome::Blocked
    ));
    // Two usages exist; only one is surfaced, but the gate still holds.
    assert_eq!(flow.blocking_refs().len(), 1);
    assert_eq!(flow.stage(), WorkflowStage::Blocked);
}

#[test]
fn test_unshared_photo_passes_the_check() {
    let mut flow = workflow_over(graph_with_private_photos());
    begin_moment_deletion(&mut flow);
    flow.toggle_scope(ScopeField::CloudFiles, true).unwrap();
    flow.accept_scope().unwrap();

    assert!(matches!(
        flow.confirm_cloud().unwrap(),
        ConfirmOutcome::ReadyToCommit
    ));

    let outcome = flow.commit().unwrap();
    assert!(matches!(outcome, CommitOutcome::Committed { .. }));
    assert_eq!(flow.store().cloud_deleted.len(), 2);
    assert!(flow.store().graph().moments.is_empty());
}
