//! Block editing session manager for quire.
//!
//! Exactly one block of a chapter is "in edit" at a time. The
//! [`EditingStore`] holds that block's draft next to the canonical baseline it
//! was derived from, gates destructive transitions behind a confirmation,
//! persists changes through a [`BlockRemote`], and keeps the session consistent
//! while the canonical chapter changes underneath it.
//!
//! Two sub-workflows live beside the session without being owned by it:
//! per-block AI suggestions (state held in the store, keyed by block id) and
//! version navigation ([`VersionNavigator`], one per block).
//!
//! # Crate Structure
//!
//! |---------------|--------------------------------------------------------|
//! | Module        | Purpose                                                |
//! |---------------|--------------------------------------------------------|
//! | [`draft`]     | Per-variant drafts, field enums, change predicates     |
//! | [`session`]   | `Session` built from a block, baseline refresh         |
//! | [`payload`]   | `Session` → `BlockPatch`                               |
//! | [`gate`]      | Confirmation requests and the discard gate             |
//! | [`suggestion`]| Per-block suggestion state machine                     |
//! | [`versions`]  | Version targets, navigation, deletion                  |
//! | [`store`]     | The editing session store                              |
//! | [`remote`]    | Collaborator traits                                    |
//! | [`memory`]    | In-memory collaborators                                |
//! | [`config`]    | RON configuration                                      |
//! |---------------|--------------------------------------------------------|
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use quire_session::{AlwaysConfirm, EditingStore, EditorConfig, MemoryWorld};
//! use quire_types::{Block, BlockId, Chapter};
//!
//! # async fn demo() {
//! let chapter = Chapter::new("ch-1", "Arrival").with_block(Block::paragraph("p1", "Rain."));
//! let world = MemoryWorld::new(chapter);
//! let store = EditingStore::new(
//!     "ch-1".into(),
//!     world.collaborators(Arc::new(AlwaysConfirm)),
//!     EditorConfig::default(),
//! );
//!
//! store.start_editing(&BlockId::new("p1")).await;
//! store.update_paragraph_draft("Rain, again.");
//! store.save_active_block().await;
//! # }
//! ```

pub mod config;
pub mod draft;
pub mod error;
pub mod gate;
pub mod memory;
pub mod payload;
pub mod remote;
pub mod session;
pub mod store;
pub mod suggestion;
pub mod versions;

pub use config::{ConfigError, EditorConfig, SaveConfig, SuggestionConfig, VersionConfig};
pub use draft::{
    DialogueDraft, DialogueTurnField, MetadataDraft, MetadataField, ParagraphDraft,
    SceneBoundaryDraft, SceneBoundaryField, TurnDraft, normalize_theme_tags,
};
pub use error::{ClipboardError, EditorError, RemoteError};
pub use gate::{
    AlwaysConfirm, ConfirmRequest, Confirmation, DiscardContext, DiscardGate, FnConfirmation,
    NeverConfirm,
};
pub use memory::{
    ChapterCache, MemoryClipboard, MemoryRemote, MemoryWorld, RecordingNotifier, RemoteOp,
};
pub use payload::build_patch;
#[cfg(feature = "system-clipboard")]
pub use remote::SystemClipboard;
pub use remote::{
    BlockRemote, ChapterSource, Clipboard, Collaborators, FailureNotifier, RenderedPrompt,
    Suggestion, SuggestionRemote, VersionRemote,
};
pub use session::{
    DialogueSession, MetadataSession, ParagraphSession, Refresh, SceneBoundarySession, Session,
    VariantChanged,
};
pub use store::{DeleteOutcome, EditingStore, ListenerId, SaveOutcome, SuggestionOutcome};
pub use suggestion::{CopyStatus, EMPTY_INSTRUCTIONS, SuggestionResult, SuggestionSnapshot};
pub use versions::{
    DeleteVersionOutcome, NavigateOutcome, VersionNavigator, VersionTargets, version_targets,
};
