//! Editing sessions and how they are built from canonical blocks.
//!
//! A [`Session`] pairs a draft with the baseline it is diffed against, for
//! exactly one block. The variant is fixed when the session is built: each
//! typed builder takes its own variant's content, so a paragraph session can
//! only ever be built from paragraph content.
//!
//! # Refresh
//!
//! When the canonical block changes underneath an open session,
//! [`Session::refresh_from`] always moves the baseline forward but only
//! replaces the draft when the session is clean:
//!
//! ```text
//!            refresh_from(block)
//!   clean ──────────────────────▶ draft = baseline = block   (DraftReplaced)
//!   dirty ──────────────────────▶ baseline = block            (BaselineOnly)
//!   variant changed ────────────▶ error, caller ends session
//! ```

use thiserror::Error;

use quire_types::{
    Block, BlockContent, BlockId, BlockType, DialogueContent, MetadataContent, MetadataKind,
    ParagraphContent, SceneBoundaryContent,
};

use crate::draft::{DialogueDraft, MetadataDraft, ParagraphDraft, SceneBoundaryDraft};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParagraphSession {
    pub block_id: BlockId,
    pub draft: ParagraphDraft,
    pub baseline: ParagraphDraft,
}

impl ParagraphSession {
    pub fn build(block_id: BlockId, content: &ParagraphContent) -> Self {
        let draft = ParagraphDraft::from_content(content);
        Self {
            block_id,
            baseline: draft.clone(),
            draft,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogueSession {
    pub block_id: BlockId,
    pub draft: DialogueDraft,
    pub baseline: DialogueDraft,
}

impl DialogueSession {
    /// Turns are deep-copied; draft and baseline share the generated turn ids.
    pub fn build(block_id: BlockId, content: &DialogueContent) -> Self {
        let draft = DialogueDraft::from_content(content);
        Self {
            block_id,
            baseline: draft.clone(),
            draft,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneBoundarySession {
    pub block_id: BlockId,
    pub draft: SceneBoundaryDraft,
    pub baseline: SceneBoundaryDraft,
}

impl SceneBoundarySession {
    pub fn build(block_id: BlockId, content: &SceneBoundaryContent) -> Self {
        let draft = SceneBoundaryDraft::from_content(content);
        Self {
            block_id,
            baseline: draft.clone(),
            draft,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataSession {
    pub block_id: BlockId,
    pub draft: MetadataDraft,
    pub baseline: MetadataDraft,
    /// Kind selected in the draft.
    pub kind: MetadataKind,
    /// Kind of the canonical block.
    pub baseline_kind: MetadataKind,
}

impl MetadataSession {
    pub fn build(block_id: BlockId, content: &MetadataContent) -> Self {
        let draft = MetadataDraft::from_content(content);
        Self {
            block_id,
            baseline: draft.clone(),
            draft,
            kind: content.kind,
            baseline_kind: content.kind,
        }
    }
}

/// The single active editing context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Session {
    Paragraph(ParagraphSession),
    Dialogue(DialogueSession),
    SceneBoundary(SceneBoundarySession),
    Metadata(MetadataSession),
}

/// What a refresh did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    /// Session was clean: draft and baseline both follow the new block.
    DraftReplaced,
    /// Session was dirty: only the baseline moved; the draft is untouched.
    BaselineOnly,
}

/// The canonical block no longer matches the session's variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("block {block_id} changed from {expected} to {found}")]
pub struct VariantChanged {
    pub block_id: BlockId,
    pub expected: BlockType,
    pub found: BlockType,
}

impl Session {
    /// Build a session for the block's own variant.
    pub fn from_block(block: &Block) -> Self {
        let id = block.id.clone();
        match &block.content {
            BlockContent::Paragraph(c) => Session::Paragraph(ParagraphSession::build(id, c)),
            BlockContent::Dialogue(c) => Session::Dialogue(DialogueSession::build(id, c)),
            BlockContent::SceneBoundary(c) => {
                Session::SceneBoundary(SceneBoundarySession::build(id, c))
            }
            BlockContent::Metadata(c) => Session::Metadata(MetadataSession::build(id, c)),
        }
    }

    pub fn block_id(&self) -> &BlockId {
        match self {
            Session::Paragraph(s) => &s.block_id,
            Session::Dialogue(s) => &s.block_id,
            Session::SceneBoundary(s) => &s.block_id,
            Session::Metadata(s) => &s.block_id,
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Session::Paragraph(_) => BlockType::Paragraph,
            Session::Dialogue(_) => BlockType::Dialogue,
            Session::SceneBoundary(_) => BlockType::SceneBoundary,
            Session::Metadata(_) => BlockType::Metadata,
        }
    }

    /// Whether the draft differs from the baseline in any editable field.
    pub fn has_pending_changes(&self) -> bool {
        match self {
            Session::Paragraph(s) => s.draft.differs_from(&s.baseline),
            Session::Dialogue(s) => s.draft.differs_from(&s.baseline),
            Session::SceneBoundary(s) => s.draft.differs_from(&s.baseline),
            Session::Metadata(s) => s.kind != s.baseline_kind || s.draft.differs_from(&s.baseline),
        }
    }

    /// Reconcile against a fresh canonical snapshot of the same block.
    ///
    /// The baseline always follows `block`; the draft is only overwritten when
    /// there are no pending changes.
    pub fn refresh_from(&mut self, block: &Block) -> Result<Refresh, VariantChanged> {
        let dirty = self.has_pending_changes();
        let expected = self.block_type();
        let mismatch = || VariantChanged {
            block_id: block.id.clone(),
            expected,
            found: block.block_type(),
        };

        let refresh = if dirty {
            Refresh::BaselineOnly
        } else {
            Refresh::DraftReplaced
        };

        match (&mut *self, &block.content) {
            (Session::Paragraph(s), BlockContent::Paragraph(c)) => {
                s.baseline = ParagraphDraft::from_content(c);
                if !dirty {
                    s.draft = s.baseline.clone();
                }
            }
            (Session::Dialogue(s), BlockContent::Dialogue(c)) => {
                s.baseline = DialogueDraft::from_content_reusing(c, &s.draft);
                if !dirty {
                    s.draft = s.baseline.clone();
                }
            }
            (Session::SceneBoundary(s), BlockContent::SceneBoundary(c)) => {
                s.baseline = SceneBoundaryDraft::from_content(c);
                if !dirty {
                    s.draft = s.baseline.clone();
                }
            }
            (Session::Metadata(s), BlockContent::Metadata(c)) => {
                s.baseline = MetadataDraft::from_content(c);
                s.baseline_kind = c.kind;
                if !dirty {
                    s.draft = s.baseline.clone();
                    s.kind = c.kind;
                }
            }
            _ => return Err(mismatch()),
        }

        Ok(refresh)
    }

    /// Treat `saved`'s draft as the new baseline.
    ///
    /// Used when a save succeeded but the draft moved on while the request was
    /// in flight: what was sent is now canonical, the newer edits stay pending.
    /// A variant mismatch leaves the session unchanged.
    pub fn adopt_saved(&mut self, saved: &Session) {
        match (self, saved) {
            (Session::Paragraph(s), Session::Paragraph(saved)) => {
                s.baseline = saved.draft.clone();
            }
            (Session::Dialogue(s), Session::Dialogue(saved)) => {
                s.baseline = saved.draft.clone();
            }
            (Session::SceneBoundary(s), Session::SceneBoundary(saved)) => {
                s.baseline = saved.draft.clone();
            }
            (Session::Metadata(s), Session::Metadata(saved)) => {
                s.baseline = saved.draft.clone();
                s.baseline_kind = saved.kind;
            }
            _ => {}
        }
    }

    /// Whether the editable state (draft + selected kind) equals `other`'s.
    pub fn same_draft(&self, other: &Session) -> bool {
        match (self, other) {
            (Session::Paragraph(a), Session::Paragraph(b)) => a.draft == b.draft,
            (Session::Dialogue(a), Session::Dialogue(b)) => a.draft == b.draft,
            (Session::SceneBoundary(a), Session::SceneBoundary(b)) => a.draft == b.draft,
            (Session::Metadata(a), Session::Metadata(b)) => a.draft == b.draft && a.kind == b.kind,
            _ => false,
        }
    }
}
