//! Version navigation and deletion.

mod common;

use pretty_assertions::assert_eq;

use common::{CHAPTER, Harness, id};
use quire_session::{
    ConfirmRequest, DeleteVersionOutcome, EditorError, NavigateOutcome, RemoteError, RemoteOp,
    SaveOutcome, Session, VersionConfig, VersionNavigator, VersionTargets,
};
use quire_types::Block;

/// Give p1 three versions: the original plus two saves.
async fn with_three_versions(h: &Harness) {
    for text in ["second", "third"] {
        h.store.start_editing(&id("p1")).await;
        h.store.update_paragraph_draft(text);
        assert_eq!(h.store.save_active_block().await, SaveOutcome::Saved);
    }
}

#[tokio::test]
async fn test_navigate_without_session() {
    let h = Harness::new();
    with_three_versions(&h).await;
    let nav = h.store.version_navigator(&id("p1"));

    assert_eq!(
        nav.targets(),
        VersionTargets {
            previous: Some(2),
            next: None
        }
    );
    assert_eq!(nav.navigate_previous().await, NavigateOutcome::Navigated);

    let block = h.block("p1").unwrap();
    assert_eq!(block.active_version, 2);
    assert_eq!(block.version_count, 3);
    assert_eq!(block.content.preview(), "second");
    assert_eq!(
        nav.targets(),
        VersionTargets {
            previous: Some(1),
            next: Some(3)
        }
    );
}

#[tokio::test]
async fn test_navigate_to_current_or_zero_is_noop() {
    let h = Harness::new();
    with_three_versions(&h).await;
    let nav = h.store.version_navigator(&id("p1"));
    let calls = h.world.remote.calls(RemoteOp::UpdateBlock);

    assert_eq!(nav.navigate_to_version(0).await, NavigateOutcome::Unchanged);
    assert_eq!(nav.navigate_to_version(3).await, NavigateOutcome::Unchanged);
    assert_eq!(h.world.remote.calls(RemoteOp::UpdateBlock), calls);
}

#[tokio::test]
async fn test_navigation_refreshes_clean_session() {
    let h = Harness::new();
    with_three_versions(&h).await;
    h.store.start_editing(&id("p1")).await;

    let nav = h.store.version_navigator(&id("p1"));
    nav.navigate_to_version(1).await;
    assert!(h.store.sync_active_session());

    let Some(Session::Paragraph(session)) = h.store.active_session() else {
        panic!("expected a paragraph session");
    };
    assert_eq!(session.draft.text, "The rain had not stopped.");
    assert!(!h.store.has_pending_changes());
}

#[tokio::test]
async fn test_navigation_failure_is_notified() {
    let h = Harness::new();
    with_three_versions(&h).await;
    let nav = h.store.version_navigator(&id("p1"));
    h.world.remote.fail_next(
        RemoteOp::UpdateBlock,
        RemoteError::Unavailable("offline".into()),
    );

    assert_eq!(nav.navigate_to_version(1).await, NavigateOutcome::Failed);
    assert!(!nav.is_navigating());
    assert_eq!(h.block("p1").unwrap().active_version, 3);
    assert_eq!(h.world.notifier.len(), 1);
}

#[tokio::test]
async fn test_load_versions_is_cached() {
    let h = Harness::new();
    with_three_versions(&h).await;
    let nav = h.store.version_navigator(&id("p1"));

    assert_eq!(nav.load_versions().await.unwrap(), vec![1, 2, 3]);
    assert_eq!(nav.load_versions().await.unwrap(), vec![1, 2, 3]);
    assert_eq!(h.world.remote.calls(RemoteOp::ListVersions), 1);
    assert_eq!(nav.known_versions(), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_growth_triggers_refetch() {
    let h = Harness::new();
    let nav = h.store.version_navigator(&id("p1"));
    nav.load_versions().await.unwrap();
    assert!(!nav.sync().await);

    with_three_versions(&h).await;

    assert!(nav.sync().await);
    assert_eq!(nav.known_versions(), Some(vec![1, 2, 3]));
    assert_eq!(h.world.remote.calls(RemoteOp::ListVersions), 2);
    assert!(!nav.sync().await);
}

#[tokio::test]
async fn test_growth_without_refetch_config() {
    let h = Harness::new();
    let nav = VersionNavigator::new(
        CHAPTER.into(),
        id("p1"),
        h.world.collaborators(h.confirm.clone()),
        VersionConfig {
            refetch_on_growth: false,
        },
    );
    nav.load_versions().await.unwrap();

    with_three_versions(&h).await;

    assert!(!nav.sync().await);
    assert_eq!(nav.known_versions(), Some(vec![1]));
    // A stale, incomplete list still allows stepping by one.
    assert_eq!(
        nav.targets(),
        VersionTargets {
            previous: Some(2),
            next: None
        }
    );
}

#[tokio::test]
async fn test_delete_last_version_is_rejected_locally() {
    let h = Harness::new();
    let nav = h.store.version_navigator(&id("p1"));

    assert!(!nav.can_delete());
    assert_eq!(
        nav.delete_version(1).await,
        DeleteVersionOutcome::Rejected(EditorError::LastVersion(id("p1")))
    );
    assert_eq!(h.world.remote.calls(RemoteOp::DeleteVersion), 0);
    assert!(h.confirm.seen().is_empty());
    assert!(h.world.notifier.is_empty());
}

#[tokio::test]
async fn test_delete_version_confirms_and_refetches() {
    let h = Harness::new();
    with_three_versions(&h).await;
    let nav = h.store.version_navigator(&id("p1"));
    nav.load_versions().await.unwrap();
    assert!(nav.can_delete());

    assert_eq!(nav.delete_version(2).await, DeleteVersionOutcome::Deleted);

    assert_eq!(
        h.confirm.seen(),
        vec![ConfirmRequest::DeleteVersion {
            block_id: id("p1"),
            version: 2
        }]
    );
    assert_eq!(nav.known_versions(), Some(vec![1, 3]));
    assert_eq!(h.world.remote.calls(RemoteOp::ListVersions), 2);

    let block = h.block("p1").unwrap();
    assert_eq!(block.version_count, 2);
    assert_eq!(block.active_version, 3);
    // The gap is skipped.
    assert_eq!(
        nav.targets(),
        VersionTargets {
            previous: Some(1),
            next: None
        }
    );
}

#[tokio::test]
async fn test_delete_version_declined() {
    let h = Harness::new();
    with_three_versions(&h).await;
    h.confirm.set_answer(false);
    let nav = h.store.version_navigator(&id("p1"));

    assert_eq!(nav.delete_version(2).await, DeleteVersionOutcome::Declined);
    assert_eq!(h.world.remote.calls(RemoteOp::DeleteVersion), 0);
}

#[tokio::test]
async fn test_delete_unknown_version_is_rejected() {
    let h = Harness::new();
    with_three_versions(&h).await;
    let nav = h.store.version_navigator(&id("p1"));
    nav.load_versions().await.unwrap();

    assert_eq!(
        nav.delete_version(7).await,
        DeleteVersionOutcome::Rejected(EditorError::VersionOutOfRange {
            block_id: id("p1"),
            version: 7,
            count: 3,
        })
    );
}

#[tokio::test]
async fn test_version_list_failure_is_notified() {
    let h = Harness::new();
    let nav = h.store.version_navigator(&id("p1"));
    h.world.remote.fail_next(
        RemoteOp::ListVersions,
        RemoteError::NotFound("block p1".into()),
    );

    assert!(nav.load_versions().await.is_err());
    assert!(!nav.is_loading());
    assert_eq!(nav.known_versions(), None);
    assert_eq!(h.world.notifier.len(), 1);
}

#[tokio::test]
async fn test_missing_block() {
    let h = Harness::new();
    let nav = h.store.version_navigator(&id("gone"));
    assert_eq!(nav.targets(), VersionTargets::default());
    assert_eq!(nav.navigate_to_version(2).await, NavigateOutcome::Missing);
    assert_eq!(nav.delete_version(2).await, DeleteVersionOutcome::Missing);
}

#[tokio::test]
async fn test_other_chapter_result_is_not_applied() {
    let h = Harness::new();
    with_three_versions(&h).await;

    // The navigator is on ch-1; the server has moved on to ch-2.
    let mut foreign = h.world.remote.chapter().unwrap();
    foreign.id = "ch-2".into();
    h.world.remote.set_chapter(foreign);
    let nav = h.store.version_navigator(&id("p1"));

    assert_eq!(nav.navigate_to_version(1).await, NavigateOutcome::Navigated);
    assert_eq!(h.block("p1").unwrap().active_version, 3);
    assert_eq!(
        h.world.remote.chapter().unwrap().block(&id("p1")).unwrap().active_version,
        1
    );
}

#[tokio::test]
async fn test_versions_seeded_from_fixture_counts() {
    let h = Harness::new();
    let mut chapter = h.world.cache.snapshot();
    chapter.blocks.push(Block::paragraph("p9", "late").with_versions(2, 2));
    h.world.publish(chapter);

    let nav = h.store.version_navigator(&id("p9"));
    assert_eq!(nav.load_versions().await.unwrap(), vec![1, 2]);
    assert_eq!(nav.navigate_previous().await, NavigateOutcome::Navigated);
    assert_eq!(h.block("p9").unwrap().active_version, 1);
}
