//! Collaborator seams: everything the session manager consumes but does not own.
//!
//! ```text
//!   EditingStore / VersionNavigator
//!        │ resolve / replace       ┌────────────────┐
//!        ├────────────────────────▶│ ChapterSource  │ canonical chapter (sync)
//!        │ update / delete         ├────────────────┤
//!        ├────────────────────────▶│ BlockRemote    │ async, fallible
//!        │ suggest / fetch prompt  ├────────────────┤
//!        ├────────────────────────▶│ SuggestionRemote│
//!        │ list / delete versions  ├────────────────┤
//!        ├────────────────────────▶│ VersionRemote  │
//!        │ confirm                 ├────────────────┤
//!        ├────────────────────────▶│ Confirmation   │
//!        │ notify / copy           ├────────────────┤
//!        └────────────────────────▶│ FailureNotifier, Clipboard │
//!                                  └────────────────┘
//! ```
//!
//! Transport, serialization, and timeouts belong to the implementations.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quire_types::{Block, BlockId, BlockPatch, Chapter, ChapterId, VersionList};

use crate::error::{ClipboardError, EditorError, RemoteError};
use crate::gate::Confirmation;

/// Latest known canonical chapter state.
pub trait ChapterSource: Send + Sync {
    /// Look up a block in the latest known chapter.
    fn resolve(&self, block_id: &BlockId) -> Option<Block>;

    /// Accept the chapter returned by a successful remote mutation.
    fn replace(&self, chapter: Chapter);
}

/// Block mutation endpoints.
#[async_trait]
pub trait BlockRemote: Send + Sync {
    /// Apply a partial update; returns the latest chapter.
    async fn update_block(&self, block_id: &BlockId, patch: &BlockPatch)
        -> Result<Chapter, RemoteError>;

    /// Delete a block; returns the latest chapter.
    async fn delete_block(&self, block_id: &BlockId) -> Result<Chapter, RemoteError>;
}

/// A generated paragraph suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
}

/// The prompt the server would send for a suggestion request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPrompt {
    pub prompt: String,
}

/// AI suggestion endpoints.
#[async_trait]
pub trait SuggestionRemote: Send + Sync {
    async fn request_suggestion(
        &self,
        block_id: &BlockId,
        instructions: &str,
    ) -> Result<Suggestion, RemoteError>;

    async fn fetch_prompt(
        &self,
        block_id: &BlockId,
        instructions: &str,
    ) -> Result<RenderedPrompt, RemoteError>;
}

/// Version history endpoints.
#[async_trait]
pub trait VersionRemote: Send + Sync {
    async fn list_versions(
        &self,
        chapter_id: &ChapterId,
        block_id: &BlockId,
    ) -> Result<VersionList, RemoteError>;

    /// Delete one version; returns the latest chapter.
    async fn delete_version(
        &self,
        chapter_id: &ChapterId,
        block_id: &BlockId,
        version: u32,
    ) -> Result<Chapter, RemoteError>;
}

/// Fire-and-forget failure reporting (toasts, status line, ...).
pub trait FailureNotifier: Send + Sync {
    fn notify(&self, error: &EditorError);
}

/// System clipboard access.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard backed by the desktop clipboard via `arboard`.
///
/// A fresh handle is opened per write; some platforms drop clipboard ownership
/// when the handle is dropped, which is fine for copy-then-paste flows.
#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard;

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

/// Every collaborator the store and version navigator need.
#[derive(Clone)]
pub struct Collaborators {
    pub chapter: Arc<dyn ChapterSource>,
    pub blocks: Arc<dyn BlockRemote>,
    pub suggestions: Arc<dyn SuggestionRemote>,
    pub versions: Arc<dyn VersionRemote>,
    pub confirm: Arc<dyn Confirmation>,
    pub notifier: Arc<dyn FailureNotifier>,
    pub clipboard: Arc<dyn Clipboard>,
}

impl Collaborators {
    /// Hand a failure to the notifier. Validation errors stay inline and are
    /// never reported.
    pub fn report(&self, error: &EditorError) {
        if error.is_validation() {
            tracing::debug!(%error, "validation error kept inline");
            return;
        }
        self.notifier.notify(error);
    }
}
