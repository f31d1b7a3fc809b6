//! Shared data model for quire.
//!
//! This crate is the leaf of the workspace: chapters, blocks, the partial
//! update payloads sent when a block is saved, and version records. It has
//! **no internal quire dependencies** and no async code.
//!
//! # Key Types
//!
//! |------------------|-----------------------------------------------------|
//! | Type             | Purpose                                             |
//! |------------------|-----------------------------------------------------|
//! | [`Chapter`]      | Blocks in document order                            |
//! | [`Block`]        | Canonical block (id + versions + content)           |
//! | [`BlockContent`] | Variant payload (paragraph/dialogue/scene/metadata) |
//! | [`BlockPatch`]   | Partial update request                              |
//! | [`VersionList`]  | Persisted versions of one block                     |
//! |------------------|-----------------------------------------------------|

pub mod block;
pub mod ids;
pub mod patch;
pub mod version;

pub use block::{
    Block, BlockContent, BlockType, Chapter, DialogueContent, DialogueTurn, MetadataContent,
    MetadataKind, ParagraphContent, SceneBoundaryContent, SceneDetails,
};
pub use ids::{BlockId, ChapterId};
pub use patch::{
    ActiveVersionPatch, BlockPatch, DialoguePatch, DialogueTurnPatch, MetadataPatch,
    ParagraphPatch, PatchError, SceneBoundaryPatch, SceneDetailsPatch,
};
pub use version::{VersionInfo, VersionList};

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
