//! Canonical block model.
//!
//! A chapter is an ordered list of blocks. Every block is one of four
//! structurally different variants, carried as a tagged union so that every
//! consumer matches exhaustively instead of probing for field presence.
//!
//! ## Design: BlockContent + MetadataKind
//!
//! `BlockContent` covers what a block *is* (paragraph, dialogue, scene
//! boundary, metadata). Metadata blocks carry a second tag, `MetadataKind`,
//! which selects which of several field groups is live. The inactive groups
//! are still present on the wire; the server clears them when the kind changes.
//!
//! Wire form is JSON with camelCase keys and a `type` discriminator:
//!
//! ```text
//! { "id": "b1", "activeVersion": 2, "versionCount": 3,
//!   "type": "paragraph", "text": "It was raining." }
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, ChapterId};

/// Variant tag of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BlockType {
    Paragraph,
    Dialogue,
    SceneBoundary,
    Metadata,
}

impl BlockType {
    /// Parse from string (case-insensitive, snake_case).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Dialogue => "dialogue",
            BlockType::SceneBoundary => "scene_boundary",
            BlockType::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which field group of a metadata block is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MetadataKind {
    /// Free-form structural note.
    #[default]
    Metadata,
    /// Point-of-view, story time, and theme tags.
    Context,
    /// Chapter title block.
    ChapterHeader,
}

impl MetadataKind {
    /// Parse from string (case-insensitive, snake_case).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKind::Metadata => "metadata",
            MetadataKind::Context => "context",
            MetadataKind::ChapterHeader => "chapter_header",
        }
    }
}

/// One spoken turn inside a dialogue block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialogueTurn {
    /// Stable turn id. Older blocks may predate turn ids.
    pub id: Option<String>,
    pub speaker_name: Option<String>,
    /// Id of a known character, when the speaker is linked to one.
    pub speaker_id: Option<String>,
    pub utterance: Option<String>,
    pub stage_direction: Option<String>,
}

/// Where and when a scene takes place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneDetails {
    pub location_name: Option<String>,
    pub timestamp: Option<String>,
    pub mood: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphContent {
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialogueContent {
    pub turns: Vec<DialogueTurn>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneBoundaryContent {
    pub label: Option<String>,
    pub summary: Option<String>,
    pub scene_details: Option<SceneDetails>,
}

/// Metadata block fields. All groups are present; `kind` says which one is live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataContent {
    pub kind: MetadataKind,

    // kind = metadata
    pub text: Option<String>,

    // kind = context
    pub pov_character: Option<String>,
    pub story_time: Option<String>,
    pub theme_tags: Vec<String>,

    // kind = chapter_header
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub epigraph: Option<String>,
    pub epigraph_attribution: Option<String>,
}

/// Variant payload of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Paragraph(ParagraphContent),
    Dialogue(DialogueContent),
    SceneBoundary(SceneBoundaryContent),
    Metadata(MetadataContent),
}

impl BlockContent {
    /// The variant tag.
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Paragraph(_) => BlockType::Paragraph,
            BlockContent::Dialogue(_) => BlockType::Dialogue,
            BlockContent::SceneBoundary(_) => BlockType::SceneBoundary,
            BlockContent::Metadata(_) => BlockType::Metadata,
        }
    }

    /// One-line plain-text preview (for version lists and logs).
    pub fn preview(&self) -> String {
        let raw = match self {
            BlockContent::Paragraph(p) => p.text.clone().unwrap_or_default(),
            BlockContent::Dialogue(d) => d
                .turns
                .iter()
                .filter_map(|t| t.utterance.as_deref())
                .collect::<Vec<_>>()
                .join(" / "),
            BlockContent::SceneBoundary(s) => s.label.clone().unwrap_or_default(),
            BlockContent::Metadata(m) => match m.kind {
                MetadataKind::Metadata => m.text.clone().unwrap_or_default(),
                MetadataKind::Context => m.pov_character.clone().unwrap_or_default(),
                MetadataKind::ChapterHeader => m.title.clone().unwrap_or_default(),
            },
        };
        raw.lines().next().unwrap_or_default().to_string()
    }
}

/// A canonical, server-owned block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    /// Which persisted version is materialized into `content` (1-based).
    #[serde(default = "first_version")]
    pub active_version: u32,
    /// Number of persisted versions (at least 1).
    #[serde(default = "first_version")]
    pub version_count: u32,
    #[serde(flatten)]
    pub content: BlockContent,
}

fn first_version() -> u32 {
    1
}

impl Block {
    /// Create a single-version block.
    pub fn new(id: impl Into<BlockId>, content: BlockContent) -> Self {
        Self {
            id: id.into(),
            active_version: 1,
            version_count: 1,
            content,
        }
    }

    /// Convenience constructor for a paragraph block.
    pub fn paragraph(id: impl Into<BlockId>, text: impl Into<String>) -> Self {
        Self::new(
            id,
            BlockContent::Paragraph(ParagraphContent {
                text: Some(text.into()),
            }),
        )
    }

    /// The variant tag.
    pub fn block_type(&self) -> BlockType {
        self.content.block_type()
    }

    /// Builder-style version setter (mostly for fixtures).
    pub fn with_versions(mut self, active_version: u32, version_count: u32) -> Self {
        self.active_version = active_version;
        self.version_count = version_count;
        self
    }
}

/// A chapter: blocks in document order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Chapter {
    pub fn new(id: impl Into<ChapterId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    /// Builder-style block append.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Look up a block by id.
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    /// Mutable lookup by id.
    pub fn block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    /// Document position of a block.
    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    /// Remove a block, returning it if it existed.
    pub fn remove_block(&mut self, id: &BlockId) -> Option<Block> {
        let pos = self.position(id)?;
        Some(self.blocks.remove(pos))
    }
}
