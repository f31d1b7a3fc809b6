//! Editing session lifecycle against the in-memory collaborators.
//!
//! Covers starting/cancelling sessions, the per-variant mutators, save and
//! delete, and reconciliation with the canonical chapter.

mod common;

use pretty_assertions::assert_eq;

use common::{CHAPTER, Harness, id};
use quire_session::{
    ConfirmRequest, DeleteOutcome, DialogueTurnField, DiscardContext, EditorConfig, EditorError,
    MetadataField, RemoteError, RemoteOp, SaveConfig, SaveOutcome, SceneBoundaryField, Session,
};
use quire_types::{Block, BlockContent, MetadataKind};

// ============================================================================
// Starting and cancelling
// ============================================================================

#[tokio::test]
async fn test_start_editing_builds_clean_session() {
    let h = Harness::new();

    assert!(h.store.start_editing(&id("p1")).await);
    let Some(Session::Paragraph(session)) = h.store.active_session() else {
        panic!("expected a paragraph session");
    };
    assert_eq!(session.draft.text, "The rain had not stopped.");
    assert_eq!(session.draft, session.baseline);
    assert!(!h.store.has_pending_changes());
    assert_eq!(h.notification_count(), 1);
}

#[tokio::test]
async fn test_start_editing_is_idempotent() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("Rain.");

    assert!(h.store.start_editing(&id("p1")).await);

    let Some(Session::Paragraph(session)) = h.store.active_session() else {
        panic!("expected a paragraph session");
    };
    assert_eq!(session.draft.text, "Rain.");
    assert!(h.confirm.seen().is_empty());
}

#[tokio::test]
async fn test_start_editing_unknown_block_is_ignored() {
    let h = Harness::new();
    assert!(!h.store.start_editing(&id("nope")).await);
    assert!(h.store.active_session().is_none());
    assert_eq!(h.notification_count(), 0);
}

#[tokio::test]
async fn test_start_editing_empty_id_keeps_current_session() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("Dirty.");
    let before = h.notification_count();

    assert!(!h.store.start_editing(&id("")).await);
    assert!(h.confirm.seen().is_empty());
    assert_eq!(h.store.active_block_id(), Some(id("p1")));
    assert_eq!(h.notification_count(), before);
}

#[tokio::test]
async fn test_switch_from_clean_session_needs_no_confirmation() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;

    assert!(h.store.start_editing(&id("d1")).await);
    assert_eq!(h.store.active_block_id(), Some(id("d1")));
    assert!(h.confirm.seen().is_empty());
}

#[tokio::test]
async fn test_declined_switch_keeps_dirty_session() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("Rain, still.");
    h.confirm.set_answer(false);

    assert!(!h.store.start_editing(&id("d1")).await);

    assert_eq!(h.store.active_block_id(), Some(id("p1")));
    assert!(h.store.has_pending_changes());
    assert_eq!(
        h.confirm.seen(),
        vec![ConfirmRequest::DiscardChanges(DiscardContext::Switch)]
    );
}

#[tokio::test]
async fn test_confirmed_switch_discards_draft() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("Rain, still.");

    assert!(h.store.start_editing(&id("s1")).await);
    assert_eq!(h.store.active_block_id(), Some(id("s1")));
    assert!(!h.store.has_pending_changes());

    // Coming back starts from the canonical text.
    h.store.start_editing(&id("p1")).await;
    let Some(Session::Paragraph(session)) = h.store.active_session() else {
        panic!("expected a paragraph session");
    };
    assert_eq!(session.draft.text, "The rain had not stopped.");
}

#[tokio::test]
async fn test_cancel_clean_session_without_confirmation() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;

    assert!(h.store.cancel_editing().await);
    assert!(h.store.active_session().is_none());
    assert!(h.confirm.seen().is_empty());
}

#[tokio::test]
async fn test_cancel_dirty_session_respects_decline() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("changed");
    h.confirm.set_answer(false);

    assert!(!h.store.cancel_editing().await);
    assert!(h.store.has_pending_changes());

    h.confirm.set_answer(true);
    assert!(h.store.cancel_editing().await);
    assert!(h.store.active_session().is_none());
    assert_eq!(
        h.confirm.seen(),
        vec![
            ConfirmRequest::DiscardChanges(DiscardContext::Cancel),
            ConfirmRequest::DiscardChanges(DiscardContext::Cancel),
        ]
    );
}

#[tokio::test]
async fn test_cancel_without_session() {
    let h = Harness::new();
    assert!(!h.store.cancel_editing().await);
}

#[tokio::test]
async fn test_update_chapter_id_clears_session() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("changed");

    assert!(!h.store.update_chapter_id(CHAPTER.into()));
    assert!(h.store.active_session().is_some());

    assert!(h.store.update_chapter_id("ch-2".into()));
    assert!(h.store.active_session().is_none());
    assert_eq!(h.store.chapter_id().as_str(), "ch-2");
}

// ============================================================================
// Mutators
// ============================================================================

#[tokio::test]
async fn test_mutators_ignore_other_variants() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    let before = h.notification_count();

    assert!(!h.store.update_scene_boundary_field(SceneBoundaryField::Label, "x"));
    assert!(!h.store.update_metadata_field(MetadataField::Title, "x"));
    assert!(!h.store.change_metadata_kind(MetadataKind::Metadata));
    assert!(h.store.add_dialogue_turn().is_none());
    assert!(!h.store.remove_dialogue_turn("a"));

    assert!(!h.store.has_pending_changes());
    assert_eq!(h.notification_count(), before);
}

#[tokio::test]
async fn test_mutators_without_session() {
    let h = Harness::new();
    assert!(!h.store.update_paragraph_draft("x"));
    assert!(!h.store.change_dialogue_turn("a", DialogueTurnField::Utterance, "x"));
}

#[tokio::test]
async fn test_each_mutation_notifies_once() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    let before = h.notification_count();

    h.store.update_paragraph_draft("one");
    h.store.update_paragraph_draft("two");
    assert_eq!(h.notification_count(), before + 2);

    // Same text again is not a transition.
    h.store.update_paragraph_draft("two");
    assert_eq!(h.notification_count(), before + 2);
}

#[tokio::test]
async fn test_remove_turn_leaves_rest_and_marks_dirty() {
    let h = Harness::new();
    h.store.start_editing(&id("d1")).await;

    assert!(h.store.remove_dialogue_turn("a"));

    let Some(Session::Dialogue(session)) = h.store.active_session() else {
        panic!("expected a dialogue session");
    };
    let ids: Vec<&str> = session.draft.turns.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
    assert!(h.store.has_pending_changes());
}

#[tokio::test]
async fn test_turn_edits_match_by_id() {
    let h = Harness::new();
    h.store.start_editing(&id("d1")).await;

    assert!(h.store.change_dialogue_turn("b", DialogueTurnField::Utterance, "Just me."));
    assert!(!h.store.change_dialogue_turn("zzz", DialogueTurnField::Utterance, "?"));

    let Some(Session::Dialogue(session)) = h.store.active_session() else {
        panic!("expected a dialogue session");
    };
    assert_eq!(session.draft.turns[0].utterance, "Who's there?");
    assert_eq!(session.draft.turns[1].utterance, "Just me.");
    assert_eq!(session.draft.turns[1].stage_direction, "whispering");
}

#[tokio::test]
async fn test_added_turn_is_editable_and_saved() {
    let h = Harness::new();
    h.store.start_editing(&id("d1")).await;

    let new_id = h.store.add_dialogue_turn().unwrap();
    h.store
        .change_dialogue_turn(&new_id, DialogueTurnField::SpeakerName, "Mara");
    h.store
        .change_dialogue_turn(&new_id, DialogueTurnField::Utterance, "Come in.");
    assert_eq!(h.store.save_active_block().await, SaveOutcome::Saved);

    let Some(BlockContent::Dialogue(dialogue)) = h.block("d1").map(|b| b.content) else {
        panic!("expected dialogue content");
    };
    assert_eq!(dialogue.turns.len(), 3);
    assert_eq!(dialogue.turns[2].id.as_deref(), Some(new_id.as_str()));
    assert_eq!(dialogue.turns[2].utterance.as_deref(), Some("Come in."));
    assert_eq!(dialogue.turns[2].stage_direction, None);
}

// ============================================================================
// Save
// ============================================================================

#[tokio::test]
async fn test_save_clean_session_skips_network() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;

    assert_eq!(h.store.save_active_block().await, SaveOutcome::Unchanged);
    assert!(h.store.active_session().is_none());
    assert_eq!(h.world.remote.calls(RemoteOp::UpdateBlock), 0);
}

#[tokio::test]
async fn test_save_without_session() {
    let h = Harness::new();
    assert_eq!(h.store.save_active_block().await, SaveOutcome::NoSession);
}

#[tokio::test]
async fn test_save_success_clears_session_and_updates_chapter() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("The rain stopped.");

    assert_eq!(h.store.save_active_block().await, SaveOutcome::Saved);

    assert!(h.store.active_session().is_none());
    assert!(!h.store.is_update_pending());
    let block = h.block("p1").unwrap();
    assert_eq!(block.content.preview(), "The rain stopped.");
    assert_eq!(block.version_count, 2);

    // Starting again is clean against the saved text.
    h.store.start_editing(&id("p1")).await;
    assert!(!h.store.has_pending_changes());
}

#[tokio::test]
async fn test_save_failure_keeps_draft_and_notifies() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("The rain stopped.");
    h.world.remote.fail_next(
        RemoteOp::UpdateBlock,
        RemoteError::Rejected {
            status: 500,
            message: "boom".into(),
        },
    );

    assert_eq!(h.store.save_active_block().await, SaveOutcome::Failed);

    assert!(!h.store.is_update_pending());
    assert!(h.store.has_pending_changes());
    let Some(Session::Paragraph(session)) = h.store.active_session() else {
        panic!("expected a paragraph session");
    };
    assert_eq!(session.draft.text, "The rain stopped.");
    assert_eq!(h.block("p1").unwrap().content.preview(), "The rain had not stopped.");
    assert!(matches!(
        h.world.notifier.errors().as_slice(),
        [EditorError::Remote(RemoteError::Rejected { status: 500, .. })]
    ));

    // A retry goes through.
    assert_eq!(h.store.save_active_block().await, SaveOutcome::Saved);
}

#[tokio::test]
async fn test_whitespace_scene_fields_save_as_null() {
    let h = Harness::new();
    h.store.start_editing(&id("s1")).await;
    h.store.update_scene_boundary_field(SceneBoundaryField::Label, "   ");
    h.store.update_scene_boundary_field(SceneBoundaryField::Mood, " tense ");

    assert_eq!(h.store.save_active_block().await, SaveOutcome::Saved);

    let Some(BlockContent::SceneBoundary(scene)) = h.block("s1").map(|b| b.content) else {
        panic!("expected scene boundary content");
    };
    assert_eq!(scene.label, None);
    assert_eq!(scene.summary, None);
    let details = scene.scene_details.unwrap();
    assert_eq!(details.location_name.as_deref(), Some("Harbor"));
    assert_eq!(details.mood.as_deref(), Some("tense"));
    assert_eq!(details.timestamp, None);
}

#[tokio::test]
async fn test_switching_metadata_kind_clears_other_groups() {
    let h = Harness::new();
    h.store.start_editing(&id("m1")).await;

    assert!(h.store.change_metadata_kind(MetadataKind::ChapterHeader));
    assert!(h.store.has_pending_changes());
    h.store.update_metadata_field(MetadataField::Title, "  The Harbor ");
    h.store.update_metadata_field(MetadataField::Subtitle, " ");

    assert_eq!(h.store.save_active_block().await, SaveOutcome::Saved);

    let Some(BlockContent::Metadata(meta)) = h.block("m1").map(|b| b.content) else {
        panic!("expected metadata content");
    };
    assert_eq!(meta.kind, MetadataKind::ChapterHeader);
    assert_eq!(meta.title.as_deref(), Some("The Harbor"));
    assert_eq!(meta.subtitle, None);
    assert_eq!(meta.pov_character, None);
    assert_eq!(meta.story_time, None);
    assert!(meta.theme_tags.is_empty());
    assert_eq!(meta.text, None);
}

#[tokio::test]
async fn test_theme_tags_normalized_on_save() {
    let h = Harness::new();
    h.store.start_editing(&id("m1")).await;

    // Same tags, different spacing: not a change.
    h.store
        .update_metadata_field(MetadataField::ThemeTags, "loss ,rain,");
    assert!(!h.store.has_pending_changes());

    h.store
        .update_metadata_field(MetadataField::ThemeTags, "loss, rain, loss, , tide");
    assert!(h.store.has_pending_changes());
    assert_eq!(h.store.save_active_block().await, SaveOutcome::Saved);

    let Some(BlockContent::Metadata(meta)) = h.block("m1").map(|b| b.content) else {
        panic!("expected metadata content");
    };
    assert_eq!(meta.theme_tags, vec!["loss", "rain", "tide"]);
    assert_eq!(meta.pov_character.as_deref(), Some("Mara"));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.confirm.set_answer(false);

    assert_eq!(
        h.store.confirm_delete_active_block().await,
        DeleteOutcome::Declined
    );
    assert_eq!(h.world.remote.calls(RemoteOp::DeleteBlock), 0);
    assert_eq!(h.confirm.seen(), vec![ConfirmRequest::DeleteBlock(id("p1"))]);
    assert!(h.store.active_session().is_some());
}

#[tokio::test]
async fn test_delete_success_removes_block_and_session() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;

    assert_eq!(
        h.store.confirm_delete_active_block().await,
        DeleteOutcome::Deleted
    );
    assert!(h.store.active_session().is_none());
    assert!(h.block("p1").is_none());
    assert!(!h.store.is_delete_pending());
}

#[tokio::test]
async fn test_delete_failure_keeps_session() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.world
        .remote
        .fail_next(RemoteOp::DeleteBlock, RemoteError::Unavailable("offline".into()));

    assert_eq!(
        h.store.confirm_delete_active_block().await,
        DeleteOutcome::Failed
    );
    assert_eq!(h.store.active_block_id(), Some(id("p1")));
    assert!(h.block("p1").is_some());
    assert_eq!(h.world.notifier.len(), 1);
}

// ============================================================================
// Sync with the canonical chapter
// ============================================================================

#[tokio::test]
async fn test_sync_updates_clean_draft() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;

    let mut chapter = h.world.cache.snapshot();
    chapter.blocks[0] = Block::paragraph("p1", "Someone else wrote this.");
    h.world.publish(chapter);

    assert!(h.store.sync_active_session());
    let Some(Session::Paragraph(session)) = h.store.active_session() else {
        panic!("expected a paragraph session");
    };
    assert_eq!(session.draft.text, "Someone else wrote this.");
    assert!(!h.store.has_pending_changes());
}

#[tokio::test]
async fn test_sync_never_overwrites_dirty_draft() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("My edit.");

    let mut chapter = h.world.cache.snapshot();
    chapter.blocks[0] = Block::paragraph("p1", "Someone else wrote this.");
    h.world.publish(chapter);

    assert!(h.store.sync_active_session());
    let Some(Session::Paragraph(session)) = h.store.active_session() else {
        panic!("expected a paragraph session");
    };
    assert_eq!(session.draft.text, "My edit.");
    assert_eq!(session.baseline.text, "Someone else wrote this.");
    assert!(h.store.has_pending_changes());
}

#[tokio::test]
async fn test_sync_closes_session_for_vanished_block() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    h.store.update_paragraph_draft("My edit.");

    let mut chapter = h.world.cache.snapshot();
    chapter.remove_block(&id("p1"));
    h.world.publish(chapter);

    assert!(h.store.sync_active_session());
    assert!(h.store.active_session().is_none());
}

#[tokio::test]
async fn test_sync_closes_session_on_variant_change() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;

    let mut chapter = h.world.cache.snapshot();
    chapter.blocks[0].content = BlockContent::SceneBoundary(Default::default());
    h.world.publish(chapter);

    assert!(h.store.sync_active_session());
    assert!(h.store.active_session().is_none());
}

#[tokio::test]
async fn test_sync_without_changes_is_quiet() {
    let h = Harness::new();
    h.store.start_editing(&id("p1")).await;
    let before = h.notification_count();

    assert!(!h.store.sync_active_session());
    assert_eq!(h.notification_count(), before);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_unsubscribed_listener_is_not_called() {
    let h = Harness::new();
    let extra = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = extra.clone();
    let listener = h.store.subscribe(move || {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });

    h.store.start_editing(&id("p1")).await;
    assert!(h.store.unsubscribe(listener));
    assert!(!h.store.unsubscribe(listener));
    h.store.update_paragraph_draft("x");

    assert_eq!(extra.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_config_controls_concurrent_save_policy() {
    let config = EditorConfig::from_ron("(save: (keep_session_on_concurrent_edit: false))").unwrap();
    assert_eq!(
        config.save,
        SaveConfig {
            keep_session_on_concurrent_edit: false
        }
    );
}
