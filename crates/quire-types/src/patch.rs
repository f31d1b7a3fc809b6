//! Partial-update requests sent to the block update endpoint.
//!
//! A `BlockPatch` is what an editing session turns into when it is saved, and
//! what version navigation sends to switch the active version. Serialization is
//! a contract with the server:
//!
//! - Absent values are serialized as `null`, never omitted. The server reads
//!   `null` as "clear this field"; an omitted key would leave stale data.
//! - Metadata patches always carry every field group, so a kind switch wipes
//!   the previous kind's fields.

use serde::Serialize;
use thiserror::Error;

use crate::block::{
    BlockContent, BlockType, DialogueContent, DialogueTurn, MetadataContent, MetadataKind,
    ParagraphContent, SceneBoundaryContent, SceneDetails,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphPatch {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueTurnPatch {
    pub id: String,
    pub speaker_name: String,
    pub speaker_id: Option<String>,
    pub utterance: String,
    pub stage_direction: Option<String>,
}

/// Full replacement of the turn list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialoguePatch {
    pub turns: Vec<DialogueTurnPatch>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDetailsPatch {
    pub location_name: Option<String>,
    pub timestamp: Option<String>,
    pub mood: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneBoundaryPatch {
    pub label: Option<String>,
    pub summary: Option<String>,
    pub scene_details: SceneDetailsPatch,
}

/// Every metadata field, for every kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub kind: MetadataKind,
    pub text: String,
    pub pov_character: Option<String>,
    pub story_time: Option<String>,
    pub theme_tags: Vec<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub epigraph: Option<String>,
    pub epigraph_attribution: Option<String>,
}

/// Select which persisted version is materialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveVersionPatch {
    pub active_version: u32,
}

/// A partial update for one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BlockPatch {
    Paragraph(ParagraphPatch),
    Dialogue(DialoguePatch),
    SceneBoundary(SceneBoundaryPatch),
    Metadata(MetadataPatch),
    ActiveVersion(ActiveVersionPatch),
}

/// Why a patch could not be applied to a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("patch for {patch} cannot be applied to a {block} block")]
    VariantMismatch { patch: BlockType, block: BlockType },

    #[error("version selection is not a content patch")]
    NotContent,
}

impl BlockPatch {
    /// Select `version` as the active version.
    pub fn active_version(version: u32) -> Self {
        BlockPatch::ActiveVersion(ActiveVersionPatch {
            active_version: version,
        })
    }

    /// Variant this patch targets, or `None` for version selection.
    pub fn block_type(&self) -> Option<BlockType> {
        match self {
            BlockPatch::Paragraph(_) => Some(BlockType::Paragraph),
            BlockPatch::Dialogue(_) => Some(BlockType::Dialogue),
            BlockPatch::SceneBoundary(_) => Some(BlockType::SceneBoundary),
            BlockPatch::Metadata(_) => Some(BlockType::Metadata),
            BlockPatch::ActiveVersion(_) => None,
        }
    }

    /// Materialize the content a server would store for this patch.
    ///
    /// Used by in-memory servers. `current` is only consulted for the
    /// variant check; patches are full replacements of the editable fields.
    pub fn to_content(&self, current: &BlockContent) -> Result<BlockContent, PatchError> {
        let target = self.block_type().ok_or(PatchError::NotContent)?;
        if target != current.block_type() {
            return Err(PatchError::VariantMismatch {
                patch: target,
                block: current.block_type(),
            });
        }

        Ok(match self {
            BlockPatch::Paragraph(p) => BlockContent::Paragraph(ParagraphContent {
                text: Some(p.text.clone()),
            }),
            BlockPatch::Dialogue(d) => BlockContent::Dialogue(DialogueContent {
                turns: d
                    .turns
                    .iter()
                    .map(|t| DialogueTurn {
                        id: Some(t.id.clone()),
                        speaker_name: Some(t.speaker_name.clone()),
                        speaker_id: t.speaker_id.clone(),
                        utterance: Some(t.utterance.clone()),
                        stage_direction: t.stage_direction.clone(),
                    })
                    .collect(),
            }),
            BlockPatch::SceneBoundary(s) => {
                let details = &s.scene_details;
                let any_detail = details.location_name.is_some()
                    || details.timestamp.is_some()
                    || details.mood.is_some();
                BlockContent::SceneBoundary(SceneBoundaryContent {
                    label: s.label.clone(),
                    summary: s.summary.clone(),
                    scene_details: any_detail.then(|| SceneDetails {
                        location_name: details.location_name.clone(),
                        timestamp: details.timestamp.clone(),
                        mood: details.mood.clone(),
                    }),
                })
            }
            BlockPatch::Metadata(m) => BlockContent::Metadata(MetadataContent {
                kind: m.kind,
                text: (!m.text.is_empty()).then(|| m.text.clone()),
                pov_character: m.pov_character.clone(),
                story_time: m.story_time.clone(),
                theme_tags: m.theme_tags.clone(),
                title: m.title.clone(),
                subtitle: m.subtitle.clone(),
                epigraph: m.epigraph.clone(),
                epigraph_attribution: m.epigraph_attribution.clone(),
            }),
            BlockPatch::ActiveVersion(_) => return Err(PatchError::NotContent),
        })
    }
}
