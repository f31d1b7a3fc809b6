//! In-memory collaborators.
//!
//! Used by the `quire` binary and the tests. All data is ephemeral.
//!
//! [`MemoryRemote`] behaves like a small chapter server: content patches create
//! a new version, version selection materializes a stored one, and every call
//! can be made to fail or to block until released.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Semaphore;

use quire_types::{
    Block, BlockContent, BlockId, BlockPatch, Chapter, ChapterId, VersionInfo, VersionList,
    now_millis,
};

use crate::error::{ClipboardError, EditorError, RemoteError};
use crate::gate::Confirmation;
use crate::remote::{
    BlockRemote, ChapterSource, Clipboard, Collaborators, FailureNotifier, RenderedPrompt,
    Suggestion, SuggestionRemote, VersionRemote,
};

/// The latest known chapter, replaced wholesale after each mutation.
#[derive(Debug)]
pub struct ChapterCache {
    chapter: RwLock<Chapter>,
}

impl ChapterCache {
    pub fn new(chapter: Chapter) -> Self {
        Self {
            chapter: RwLock::new(chapter),
        }
    }

    pub fn snapshot(&self) -> Chapter {
        self.chapter.read().clone()
    }

    /// Overwrite the cached chapter (a refetch, or another client's edit).
    pub fn set(&self, chapter: Chapter) {
        *self.chapter.write() = chapter;
    }
}

impl ChapterSource for ChapterCache {
    fn resolve(&self, block_id: &BlockId) -> Option<Block> {
        self.chapter.read().block(block_id).cloned()
    }

    fn replace(&self, chapter: Chapter) {
        tracing::trace!(chapter = %chapter.id, blocks = chapter.blocks.len(), "chapter replaced");
        self.set(chapter);
    }
}

/// Remote operations, for failure injection, holds, and call counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    UpdateBlock,
    DeleteBlock,
    RequestSuggestion,
    FetchPrompt,
    ListVersions,
    DeleteVersion,
}

#[derive(Debug, Clone)]
struct StoredVersion {
    version: u32,
    content: BlockContent,
    created_at: u64,
}

#[derive(Debug, Default)]
struct ServerState {
    chapter: Option<Chapter>,
    history: HashMap<BlockId, Vec<StoredVersion>>,
    failures: HashMap<RemoteOp, VecDeque<RemoteError>>,
    calls: HashMap<RemoteOp, usize>,
    suggestion_text: Option<String>,
}

impl ServerState {
    /// Seed version history for blocks that have none yet.
    fn seed_history(&mut self) {
        let Some(chapter) = &self.chapter else {
            return;
        };
        let created_at = now_millis();
        for block in &chapter.blocks {
            self.history.entry(block.id.clone()).or_insert_with(|| {
                (1..=block.version_count.max(1))
                    .map(|version| StoredVersion {
                        version,
                        content: block.content.clone(),
                        created_at,
                    })
                    .collect()
            });
        }
    }

    fn chapter_mut(&mut self, chapter_id: Option<&ChapterId>) -> Result<&mut Chapter, RemoteError> {
        match self.chapter.as_mut() {
            Some(chapter) if chapter_id.is_none_or(|id| &chapter.id == id) => Ok(chapter),
            _ => Err(RemoteError::NotFound(match chapter_id {
                Some(id) => format!("chapter {id}"),
                None => "chapter".to_string(),
            })),
        }
    }
}

fn block_not_found(block_id: &BlockId) -> RemoteError {
    RemoteError::NotFound(format!("block {block_id}"))
}

/// A chapter server held in memory.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<ServerState>,
    holds: Mutex<HashMap<RemoteOp, Arc<Semaphore>>>,
}

impl MemoryRemote {
    pub fn new(chapter: Chapter) -> Self {
        let remote = Self::default();
        remote.set_chapter(chapter);
        remote
    }

    /// The server's current chapter.
    pub fn chapter(&self) -> Option<Chapter> {
        self.state.lock().chapter.clone()
    }

    /// Replace the server's chapter, keeping history for blocks that survive.
    pub fn set_chapter(&self, chapter: Chapter) {
        let mut state = self.state.lock();
        state
            .history
            .retain(|id, _| chapter.block(id).is_some());
        state.chapter = Some(chapter);
        state.seed_history();
    }

    /// Make the next call of `op` fail with `error`. Failures queue up.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// How many times `op` was called.
    pub fn calls(&self, op: RemoteOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Block every later call of `op` until a permit is added to the
    /// returned semaphore. Each permit releases one call.
    pub fn hold(&self, op: RemoteOp) -> Arc<Semaphore> {
        self.holds
            .lock()
            .entry(op)
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    /// Stop holding `op`. Calls already waiting stay blocked until released.
    pub fn release(&self, op: RemoteOp) {
        self.holds.lock().remove(&op);
    }

    /// Fixed suggestion text, instead of echoing the instructions.
    pub fn set_suggestion_text(&self, text: Option<String>) {
        self.state.lock().suggestion_text = text;
    }

    async fn enter(&self, op: RemoteOp) -> Result<(), RemoteError> {
        *self.state.lock().calls.entry(op).or_default() += 1;

        let hold = self.holds.lock().get(&op).cloned();
        if let Some(semaphore) = hold {
            if let Ok(permit) = semaphore.acquire().await {
                permit.forget();
            }
        }

        match self
            .state
            .lock()
            .failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlockRemote for MemoryRemote {
    async fn update_block(
        &self,
        block_id: &BlockId,
        patch: &BlockPatch,
    ) -> Result<Chapter, RemoteError> {
        self.enter(RemoteOp::UpdateBlock).await?;

        let mut state = self.state.lock();
        let ServerState {
            chapter, history, ..
        } = &mut *state;
        let chapter = chapter
            .as_mut()
            .ok_or_else(|| RemoteError::NotFound("chapter".into()))?;
        let block = chapter
            .block_mut(block_id)
            .ok_or_else(|| block_not_found(block_id))?;
        let versions = history.entry(block_id.clone()).or_default();

        match patch {
            BlockPatch::ActiveVersion(selection) => {
                let stored = versions
                    .iter()
                    .find(|v| v.version == selection.active_version)
                    .ok_or_else(|| {
                        RemoteError::NotFound(format!(
                            "block {block_id} version {}",
                            selection.active_version
                        ))
                    })?;
                block.content = stored.content.clone();
                block.active_version = selection.active_version;
            }
            content_patch => {
                let content =
                    content_patch
                        .to_content(&block.content)
                        .map_err(|e| RemoteError::Rejected {
                            status: 422,
                            message: e.to_string(),
                        })?;
                let version = versions.iter().map(|v| v.version).max().unwrap_or(0) + 1;
                versions.push(StoredVersion {
                    version,
                    content: content.clone(),
                    created_at: now_millis(),
                });
                block.content = content;
                block.active_version = version;
                block.version_count = versions.len() as u32;
            }
        }
        Ok(chapter.clone())
    }

    async fn delete_block(&self, block_id: &BlockId) -> Result<Chapter, RemoteError> {
        self.enter(RemoteOp::DeleteBlock).await?;

        let mut state = self.state.lock();
        let chapter = state.chapter_mut(None)?;
        chapter
            .remove_block(block_id)
            .ok_or_else(|| block_not_found(block_id))?;
        let chapter = chapter.clone();
        state.history.remove(block_id);
        Ok(chapter)
    }
}

#[async_trait]
impl SuggestionRemote for MemoryRemote {
    async fn request_suggestion(
        &self,
        block_id: &BlockId,
        instructions: &str,
    ) -> Result<Suggestion, RemoteError> {
        self.enter(RemoteOp::RequestSuggestion).await?;

        let state = self.state.lock();
        if state
            .chapter
            .as_ref()
            .and_then(|c| c.block(block_id))
            .is_none()
        {
            return Err(block_not_found(block_id));
        }
        let text = state
            .suggestion_text
            .clone()
            .unwrap_or_else(|| format!("Suggested: {instructions}"));
        Ok(Suggestion { text })
    }

    async fn fetch_prompt(
        &self,
        block_id: &BlockId,
        instructions: &str,
    ) -> Result<RenderedPrompt, RemoteError> {
        self.enter(RemoteOp::FetchPrompt).await?;
        Ok(RenderedPrompt {
            prompt: format!("Rewrite block {block_id}: {instructions}"),
        })
    }
}

#[async_trait]
impl VersionRemote for MemoryRemote {
    async fn list_versions(
        &self,
        chapter_id: &ChapterId,
        block_id: &BlockId,
    ) -> Result<VersionList, RemoteError> {
        self.enter(RemoteOp::ListVersions).await?;

        let mut state = self.state.lock();
        state.chapter_mut(Some(chapter_id))?;
        let versions = state
            .history
            .get(block_id)
            .ok_or_else(|| block_not_found(block_id))?;
        Ok(VersionList {
            versions: versions
                .iter()
                .map(|v| VersionInfo {
                    version: v.version,
                    created_at: Some(v.created_at),
                    preview: Some(v.content.preview()),
                })
                .collect(),
        })
    }

    async fn delete_version(
        &self,
        chapter_id: &ChapterId,
        block_id: &BlockId,
        version: u32,
    ) -> Result<Chapter, RemoteError> {
        self.enter(RemoteOp::DeleteVersion).await?;

        let mut state = self.state.lock();
        let ServerState {
            chapter, history, ..
        } = &mut *state;
        let chapter = match chapter.as_mut() {
            Some(chapter) if &chapter.id == chapter_id => chapter,
            _ => return Err(RemoteError::NotFound(format!("chapter {chapter_id}"))),
        };
        let block = chapter
            .block_mut(block_id)
            .ok_or_else(|| block_not_found(block_id))?;
        let versions = history
            .get_mut(block_id)
            .ok_or_else(|| block_not_found(block_id))?;

        if versions.len() <= 1 {
            return Err(RemoteError::Rejected {
                status: 409,
                message: "cannot delete the only version".into(),
            });
        }
        let index = versions
            .iter()
            .position(|v| v.version == version)
            .ok_or_else(|| {
                RemoteError::NotFound(format!("block {block_id} version {version}"))
            })?;
        versions.remove(index);

        if block.active_version == version {
            // Fall back to the newest remaining version.
            if let Some(newest) = versions.iter().max_by_key(|v| v.version) {
                block.active_version = newest.version;
                block.content = newest.content.clone();
            }
        }
        block.version_count = versions.len() as u32;
        Ok(chapter.clone())
    }
}

/// Clipboard that keeps what was written.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    writes: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last text written.
    pub fn contents(&self) -> Option<String> {
        self.writes.lock().last().cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClipboardError::Unavailable("clipboard locked".into()));
        }
        self.writes.lock().push(text.to_string());
        Ok(())
    }
}

/// Notifier that records every reported failure.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<EditorError>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<EditorError> {
        self.errors.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl FailureNotifier for RecordingNotifier {
    fn notify(&self, error: &EditorError) {
        tracing::debug!(%error, "failure recorded");
        self.errors.lock().push(error.clone());
    }
}

/// A full set of in-memory collaborators sharing one chapter.
#[derive(Clone)]
pub struct MemoryWorld {
    pub cache: Arc<ChapterCache>,
    pub remote: Arc<MemoryRemote>,
    pub clipboard: Arc<MemoryClipboard>,
    pub notifier: Arc<RecordingNotifier>,
}

impl MemoryWorld {
    pub fn new(chapter: Chapter) -> Self {
        Self {
            cache: Arc::new(ChapterCache::new(chapter.clone())),
            remote: Arc::new(MemoryRemote::new(chapter)),
            clipboard: Arc::new(MemoryClipboard::new()),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    /// Simulate another client changing the chapter: server and cache both
    /// move to `chapter`.
    pub fn publish(&self, chapter: Chapter) {
        self.remote.set_chapter(chapter.clone());
        self.cache.set(chapter);
    }

    pub fn collaborators(&self, confirm: Arc<dyn Confirmation>) -> Collaborators {
        Collaborators {
            chapter: self.cache.clone(),
            blocks: self.remote.clone(),
            suggestions: self.remote.clone(),
            versions: self.remote.clone(),
            confirm,
            notifier: self.notifier.clone(),
            clipboard: self.clipboard.clone(),
        }
    }
}
