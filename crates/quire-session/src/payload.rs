//! Turn a session's draft into the partial update sent on save.
//!
//! Nullability rules per variant:
//!
//! - paragraph: text verbatim.
//! - dialogue: full turn list; empty speaker id / stage direction → `null`.
//! - scene boundary: every field trimmed, `null` when empty.
//! - metadata: every field of every kind is set. Fields outside the session's
//!   kind are cleared (`null`, `""`, `[]`) so a kind switch leaves nothing
//!   stale server-side.
//!
//! Required fields (e.g. a chapter header title) are not validated here; the
//! draft is sent as it stands.

use quire_types::{
    BlockPatch, DialoguePatch, DialogueTurnPatch, MetadataKind, MetadataPatch, ParagraphPatch,
    SceneBoundaryPatch, SceneDetailsPatch,
};

use crate::draft::{normalize_theme_tags, MetadataDraft};
use crate::session::Session;

/// Trimmed value, or `None` when nothing but whitespace remains.
fn nullable(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Build the update request for the session's current draft.
pub fn build_patch(session: &Session) -> BlockPatch {
    match session {
        Session::Paragraph(s) => BlockPatch::Paragraph(ParagraphPatch {
            text: s.draft.text.clone(),
        }),
        Session::Dialogue(s) => BlockPatch::Dialogue(DialoguePatch {
            turns: s
                .draft
                .turns
                .iter()
                .map(|t| DialogueTurnPatch {
                    id: t.id.clone(),
                    speaker_name: t.speaker_name.clone(),
                    speaker_id: nullable(&t.speaker_id),
                    utterance: t.utterance.clone(),
                    stage_direction: nullable(&t.stage_direction),
                })
                .collect(),
        }),
        Session::SceneBoundary(s) => BlockPatch::SceneBoundary(SceneBoundaryPatch {
            label: nullable(&s.draft.label),
            summary: nullable(&s.draft.summary),
            scene_details: SceneDetailsPatch {
                location_name: nullable(&s.draft.location_name),
                timestamp: nullable(&s.draft.timestamp),
                mood: nullable(&s.draft.mood),
            },
        }),
        Session::Metadata(s) => BlockPatch::Metadata(metadata_patch(s.kind, &s.draft)),
    }
}

fn metadata_patch(kind: MetadataKind, draft: &MetadataDraft) -> MetadataPatch {
    let cleared = MetadataPatch {
        kind,
        text: String::new(),
        pov_character: None,
        story_time: None,
        theme_tags: Vec::new(),
        title: None,
        subtitle: None,
        epigraph: None,
        epigraph_attribution: None,
    };

    match kind {
        MetadataKind::Metadata => MetadataPatch {
            text: draft.text.clone(),
            ..cleared
        },
        MetadataKind::Context => MetadataPatch {
            pov_character: nullable(&draft.pov_character),
            story_time: nullable(&draft.story_time),
            theme_tags: normalize_theme_tags(&draft.theme_tags),
            ..cleared
        },
        MetadataKind::ChapterHeader => MetadataPatch {
            title: nullable(&draft.title),
            subtitle: nullable(&draft.subtitle),
            epigraph: nullable(&draft.epigraph),
            epigraph_attribution: nullable(&draft.epigraph_attribution),
            ..cleared
        },
    }
}
