//! The editing session store.
//!
//! [`EditingStore`] owns the single active [`Session`], the save/delete pending
//! flags, and every block's [`SuggestionSnapshot`]. All mutation goes through
//! its methods; each logical state transition ends with one payload-less
//! change notification to subscribers, who re-read whatever they display.
//!
//! # Concurrency
//!
//! The store is shared by reference (`Arc<EditingStore>`) and every method
//! takes `&self`. State lives behind a `parking_lot::Mutex` that is never held
//! across an `.await`; suspension happens only at remote calls and
//! confirmations. Anything that completes after the world moved on is matched
//! against the identity it started with (block id + variant + session epoch,
//! or a suggestion ticket) and dropped silently on mismatch.
//!
//! ```text
//!   start_editing ──▶ [confirm switch if dirty] ──▶ session(epoch n)
//!        │ mutators (sync, variant-checked)
//!        ▼
//!   save_active_block ── is_update_pending ──▶ update_block ──▶ clear | keep draft
//!   confirm_delete_active_block ── is_delete_pending ──▶ delete_block ──▶ clear
//!   sync_active_session ──▶ baseline follows chapter, draft only when clean
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use quire_types::{BlockId, BlockType, Chapter, ChapterId, MetadataKind};

use crate::config::EditorConfig;
use crate::draft::{
    DialogueTurnField, MetadataField, ParagraphDraft, SceneBoundaryField, TurnDraft,
};
use crate::error::EditorError;
use crate::gate::{ConfirmRequest, DiscardContext, DiscardGate};
use crate::payload::build_patch;
use crate::remote::Collaborators;
use crate::session::{ParagraphSession, Session};
use crate::suggestion::{Dismissal, RequestBlocked, SuggestionSnapshot, Suggestions};
use crate::versions::VersionNavigator;

/// Handle returned by [`EditingStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Result of [`EditingStore::save_active_block`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The update was accepted by the server.
    Saved,
    /// Nothing to save; the session was closed without a network call.
    Unchanged,
    /// A save or delete is already in flight.
    Busy,
    NoSession,
    /// The server call failed; the session and draft are untouched.
    Failed,
}

/// Result of [`EditingStore::confirm_delete_active_block`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    Busy,
    NoSession,
    Failed,
}

/// Result of [`EditingStore::submit_suggestion`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// A result is stored and ready to apply.
    Ready,
    /// Instructions were empty; an inline error is set, no call was made.
    Invalid,
    /// A request for this block is already in flight.
    Busy,
    /// The block is not the active paragraph session.
    NoSession,
    /// Suggestions are turned off in the configuration.
    Disabled,
    /// The snapshot was closed or reset while the request was in flight.
    Superseded,
    Failed,
}

/// Identity of a session at the moment an async operation started.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SessionKey {
    block_id: BlockId,
    block_type: BlockType,
    epoch: u64,
}

#[derive(Debug)]
struct ActiveSession {
    session: Session,
    epoch: u64,
}

impl ActiveSession {
    fn key(&self) -> SessionKey {
        SessionKey {
            block_id: self.session.block_id().clone(),
            block_type: self.session.block_type(),
            epoch: self.epoch,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    chapter_id: ChapterId,
    active: Option<ActiveSession>,
    next_epoch: u64,
    is_update_pending: bool,
    is_delete_pending: bool,
    suggestions: Suggestions,
}

impl StoreState {
    fn matches(&self, key: &SessionKey) -> bool {
        self.active.as_ref().is_some_and(|a| &a.key() == key)
    }

    fn is_busy(&self) -> bool {
        self.is_update_pending || self.is_delete_pending
    }

    fn begin_session(&mut self, session: Session) -> u64 {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        self.active = Some(ActiveSession { session, epoch });
        epoch
    }
}

/// The active session if it is the paragraph session for `block_id`.
fn paragraph_mut<'a>(
    active: &'a mut Option<ActiveSession>,
    block_id: &BlockId,
) -> Option<&'a mut ParagraphSession> {
    match active.as_mut().map(|a| &mut a.session) {
        Some(Session::Paragraph(p)) if &p.block_id == block_id => Some(p),
        _ => None,
    }
}

/// Owns the active editing session for one chapter.
pub struct EditingStore {
    state: Mutex<StoreState>,
    /// Serializes start/cancel behind any confirmation still being answered.
    transition: tokio::sync::Mutex<()>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    deps: Collaborators,
    gate: DiscardGate,
    config: EditorConfig,
}

impl EditingStore {
    pub fn new(chapter_id: ChapterId, deps: Collaborators, config: EditorConfig) -> Self {
        let gate = DiscardGate::new(deps.confirm.clone());
        Self {
            state: Mutex::new(StoreState {
                chapter_id,
                active: None,
                next_epoch: 0,
                is_update_pending: false,
                is_delete_pending: false,
                suggestions: Suggestions::new(),
            }),
            transition: tokio::sync::Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            deps,
            gate,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // =========================================================================
    // Change notification
    // =========================================================================

    /// Register a listener, called after every state transition.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Call listeners outside of any lock so they can read the store.
    fn emit(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub fn chapter_id(&self) -> ChapterId {
        self.state.lock().chapter_id.clone()
    }

    /// A copy of the active session.
    pub fn active_session(&self) -> Option<Session> {
        self.state.lock().active.as_ref().map(|a| a.session.clone())
    }

    pub fn active_block_id(&self) -> Option<BlockId> {
        self.state
            .lock()
            .active
            .as_ref()
            .map(|a| a.session.block_id().clone())
    }

    pub fn has_pending_changes(&self) -> bool {
        self.state
            .lock()
            .active
            .as_ref()
            .is_some_and(|a| a.session.has_pending_changes())
    }

    pub fn is_update_pending(&self) -> bool {
        self.state.lock().is_update_pending
    }

    pub fn is_delete_pending(&self) -> bool {
        self.state.lock().is_delete_pending
    }

    /// Suggestion state for a block (empty if never touched).
    pub fn suggestion(&self, block_id: &BlockId) -> SuggestionSnapshot {
        self.state.lock().suggestions.get(block_id)
    }

    /// A version navigator for one block of this store's chapter.
    pub fn version_navigator(&self, block_id: &BlockId) -> VersionNavigator {
        VersionNavigator::new(
            self.chapter_id(),
            block_id.clone(),
            self.deps.clone(),
            self.config.versions.clone(),
        )
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Begin editing `block_id`.
    ///
    /// Returns whether `block_id` is the active session afterwards. Unknown
    /// blocks are ignored. Switching away from a dirty session asks for
    /// confirmation first; a decline leaves the current session as it was.
    #[tracing::instrument(skip_all, fields(block = block_id.short()))]
    pub async fn start_editing(&self, block_id: &BlockId) -> bool {
        if block_id.is_empty() {
            debug!("empty block id, not editing");
            return false;
        }
        let _transition = self.transition.lock().await;

        let Some(block) = self.deps.chapter.resolve(block_id) else {
            debug!("block not found, not editing");
            return false;
        };

        let needs_confirm = {
            let state = self.state.lock();
            match &state.active {
                Some(active) if active.session.block_id() == block_id => {
                    debug!("already editing this block");
                    return true;
                }
                Some(active) => active.session.has_pending_changes(),
                None => false,
            }
        };

        let block = if needs_confirm {
            if !self.gate.allows(DiscardContext::Switch).await {
                debug!("switch declined, keeping current session");
                return false;
            }
            // The chapter may have moved on while the user was deciding.
            match self.deps.chapter.resolve(block_id) {
                Some(block) => block,
                None => {
                    debug!("block vanished during confirmation");
                    return false;
                }
            }
        } else {
            block
        };

        let epoch = self.state.lock().begin_session(Session::from_block(&block));
        info!(epoch, kind = %block.block_type(), "editing session started");
        self.emit();
        true
    }

    /// Leave the active session, confirming first if it has pending changes.
    ///
    /// Returns whether the session was closed.
    #[tracing::instrument(skip_all)]
    pub async fn cancel_editing(&self) -> bool {
        let _transition = self.transition.lock().await;

        let (key, dirty) = {
            let state = self.state.lock();
            let Some(active) = &state.active else {
                return false;
            };
            (active.key(), active.session.has_pending_changes())
        };

        if dirty && !self.gate.allows(DiscardContext::Cancel).await {
            debug!("cancel declined");
            return false;
        }

        let cleared = {
            let mut state = self.state.lock();
            if state.matches(&key) {
                state.active = None;
                true
            } else {
                false
            }
        };
        if cleared {
            debug!(block = key.block_id.short(), "editing session cancelled");
            self.emit();
        }
        cleared
    }

    /// Move to another chapter. Any active session is dropped.
    pub fn update_chapter_id(&self, chapter_id: ChapterId) -> bool {
        let changed = {
            let mut state = self.state.lock();
            if state.chapter_id == chapter_id {
                false
            } else {
                state.chapter_id = chapter_id.clone();
                state.active = None;
                true
            }
        };
        if changed {
            info!(chapter = chapter_id.short(), "chapter changed, session cleared");
            self.emit();
        }
        changed
    }

    /// Reconcile the active session with the latest canonical chapter.
    ///
    /// The baseline always follows; the draft is only replaced when it has no
    /// pending changes. A vanished block, or one whose variant changed, ends
    /// the session. Returns whether anything changed.
    pub fn sync_active_session(&self) -> bool {
        let Some(key) = self.state.lock().active.as_ref().map(ActiveSession::key) else {
            return false;
        };
        let resolved = self.deps.chapter.resolve(&key.block_id);

        let changed = {
            let mut state = self.state.lock();
            if !state.matches(&key) {
                return false;
            }
            match resolved {
                None => {
                    info!(block = key.block_id.short(), "active block vanished, closing session");
                    state.active = None;
                    true
                }
                Some(block) => {
                    let Some(active) = state.active.as_mut() else {
                        return false;
                    };
                    let before = active.session.clone();
                    match active.session.refresh_from(&block) {
                        Ok(refresh) => {
                            debug!(block = key.block_id.short(), ?refresh, "session synced");
                            active.session != before
                        }
                        Err(e) => {
                            info!("{e}, closing session");
                            state.active = None;
                            true
                        }
                    }
                }
            }
        };
        if changed {
            self.emit();
        }
        changed
    }

    // =========================================================================
    // Draft mutators
    // =========================================================================

    /// Run `f` against the active session if it has the expected variant.
    fn edit<F>(&self, expected: BlockType, f: F) -> bool
    where
        F: FnOnce(&mut Session, &mut Suggestions) -> bool,
    {
        let changed = {
            let mut state = self.state.lock();
            let StoreState {
                active,
                suggestions,
                ..
            } = &mut *state;
            let Some(active) = active.as_mut() else {
                return false;
            };
            if active.session.block_type() != expected {
                debug!(
                    expected = %expected,
                    actual = %active.session.block_type(),
                    "ignoring edit for another variant"
                );
                return false;
            }
            f(&mut active.session, suggestions)
        };
        if changed {
            self.emit();
        }
        changed
    }

    /// Replace the paragraph text. Mirrors into the suggestion prompt when the
    /// prompt was seeded from the draft.
    pub fn update_paragraph_draft(&self, text: &str) -> bool {
        self.edit(BlockType::Paragraph, |session, suggestions| {
            let Session::Paragraph(p) = session else {
                return false;
            };
            if p.draft.text == text {
                return false;
            }
            p.draft = ParagraphDraft {
                text: text.to_string(),
            };
            if let Some(snapshot) = suggestions.existing_mut(&p.block_id) {
                snapshot.mirror_draft(text);
            }
            true
        })
    }

    /// Set one field of the turn with id `turn_id`.
    pub fn change_dialogue_turn(&self, turn_id: &str, field: DialogueTurnField, value: &str) -> bool {
        self.edit(BlockType::Dialogue, |session, _| {
            let Session::Dialogue(d) = session else {
                return false;
            };
            if !d.draft.contains(turn_id) {
                debug!(turn = turn_id, "no such turn");
                return false;
            }
            d.draft.turns = d
                .draft
                .turns
                .iter()
                .map(|t| {
                    if t.id == turn_id {
                        t.with_field(field, value)
                    } else {
                        t.clone()
                    }
                })
                .collect();
            true
        })
    }

    /// Append an empty turn. Returns its id.
    pub fn add_dialogue_turn(&self) -> Option<String> {
        let mut added = None;
        self.edit(BlockType::Dialogue, |session, _| {
            let Session::Dialogue(d) = session else {
                return false;
            };
            let turn = TurnDraft::blank();
            added = Some(turn.id.clone());
            d.draft.turns = d
                .draft
                .turns
                .iter()
                .cloned()
                .chain(std::iter::once(turn))
                .collect();
            true
        });
        added
    }

    /// Remove the turn with id `turn_id`.
    pub fn remove_dialogue_turn(&self, turn_id: &str) -> bool {
        self.edit(BlockType::Dialogue, |session, _| {
            let Session::Dialogue(d) = session else {
                return false;
            };
            if !d.draft.contains(turn_id) {
                return false;
            }
            d.draft.turns = d
                .draft
                .turns
                .iter()
                .filter(|t| t.id != turn_id)
                .cloned()
                .collect();
            true
        })
    }

    pub fn update_scene_boundary_field(&self, field: SceneBoundaryField, value: &str) -> bool {
        self.edit(BlockType::SceneBoundary, |session, _| {
            let Session::SceneBoundary(s) = session else {
                return false;
            };
            s.draft = s.draft.with_field(field, value);
            true
        })
    }

    pub fn update_metadata_field(&self, field: MetadataField, value: &str) -> bool {
        self.edit(BlockType::Metadata, |session, _| {
            let Session::Metadata(m) = session else {
                return false;
            };
            m.draft = m.draft.with_field(field, value);
            true
        })
    }

    /// Select which metadata field group is saved.
    pub fn change_metadata_kind(&self, kind: MetadataKind) -> bool {
        self.edit(BlockType::Metadata, |session, _| {
            let Session::Metadata(m) = session else {
                return false;
            };
            if m.kind == kind {
                return false;
            }
            m.kind = kind;
            true
        })
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Hand a chapter returned by a mutation to the chapter source, unless the
    /// store has moved to another chapter since the call started.
    fn accept_chapter(&self, chapter: Chapter) {
        let current = self.chapter_id();
        if chapter.id != current {
            debug!(returned = %chapter.id, current = %current, "dropping chapter for another chapter id");
            return;
        }
        self.deps.chapter.replace(chapter);
    }

    /// Persist the active draft.
    ///
    /// A failed save keeps the session and its draft exactly as they were.
    #[tracing::instrument(skip_all)]
    pub async fn save_active_block(&self) -> SaveOutcome {
        let plan = {
            let mut state = self.state.lock();
            if state.is_busy() {
                debug!("save ignored, mutation in flight");
                return SaveOutcome::Busy;
            }
            let Some(active) = &state.active else {
                return SaveOutcome::NoSession;
            };
            if active.session.has_pending_changes() {
                let submitted = active.session.clone();
                let key = active.key();
                state.is_update_pending = true;
                Some((key, build_patch(&submitted), submitted))
            } else {
                state.active = None;
                None
            }
        };

        let Some((key, patch, submitted)) = plan else {
            debug!("no pending changes, session closed");
            self.emit();
            return SaveOutcome::Unchanged;
        };
        self.emit();

        match self.deps.blocks.update_block(&key.block_id, &patch).await {
            Ok(chapter) => {
                self.accept_chapter(chapter);
                {
                    let mut state = self.state.lock();
                    state.is_update_pending = false;
                    let keep_edits = self.config.save.keep_session_on_concurrent_edit;
                    let close = match state.active.as_mut() {
                        Some(active) if active.key() == key => {
                            if active.session.same_draft(&submitted) || !keep_edits {
                                true
                            } else {
                                debug!("draft changed during save, keeping newer edits");
                                active.session.adopt_saved(&submitted);
                                false
                            }
                        }
                        _ => {
                            debug!("session changed during save");
                            false
                        }
                    };
                    if close {
                        state.active = None;
                    }
                }
                info!(block = key.block_id.short(), "block saved");
                self.emit();
                SaveOutcome::Saved
            }
            Err(e) => {
                self.state.lock().is_update_pending = false;
                warn!(block = key.block_id.short(), error = %e, "save failed, draft kept");
                self.deps.report(&EditorError::from(e));
                self.emit();
                SaveOutcome::Failed
            }
        }
    }

    /// Delete the block being edited, after explicit confirmation.
    #[tracing::instrument(skip_all)]
    pub async fn confirm_delete_active_block(&self) -> DeleteOutcome {
        let key = {
            let state = self.state.lock();
            if state.is_busy() {
                return DeleteOutcome::Busy;
            }
            let Some(active) = &state.active else {
                return DeleteOutcome::NoSession;
            };
            active.key()
        };

        let request = ConfirmRequest::DeleteBlock(key.block_id.clone());
        if !self.deps.confirm.confirm(&request).await {
            debug!(block = key.block_id.short(), "delete declined");
            return DeleteOutcome::Declined;
        }

        {
            let mut state = self.state.lock();
            if state.is_busy() {
                return DeleteOutcome::Busy;
            }
            if !state.matches(&key) {
                debug!("session changed during delete confirmation");
                return DeleteOutcome::NoSession;
            }
            state.is_delete_pending = true;
        }
        self.emit();

        match self.deps.blocks.delete_block(&key.block_id).await {
            Ok(chapter) => {
                self.accept_chapter(chapter);
                {
                    let mut state = self.state.lock();
                    state.is_delete_pending = false;
                    if state.matches(&key) {
                        state.active = None;
                    }
                    state.suggestions.close(&key.block_id);
                }
                info!(block = key.block_id.short(), "block deleted");
                self.emit();
                DeleteOutcome::Deleted
            }
            Err(e) => {
                self.state.lock().is_delete_pending = false;
                warn!(block = key.block_id.short(), error = %e, "delete failed");
                self.deps.report(&EditorError::from(e));
                self.emit();
                DeleteOutcome::Failed
            }
        }
    }

    // =========================================================================
    // Suggestions
    // =========================================================================

    /// Open the suggestion prompt for the active paragraph session.
    pub fn open_suggestion_prompt(&self, block_id: &BlockId) -> bool {
        if !self.config.suggestions.enabled {
            return false;
        }
        let mirror = self.config.suggestions.mirror_empty_draft;
        let opened = {
            let mut state = self.state.lock();
            let StoreState {
                active,
                suggestions,
                ..
            } = &mut *state;
            match paragraph_mut(active, block_id) {
                Some(p) => {
                    suggestions.entry(block_id).open(&p.draft.text, mirror);
                    true
                }
                None => false,
            }
        };
        if opened {
            debug!(block = %block_id, "suggestion prompt opened");
            self.emit();
        }
        opened
    }

    /// Instructions typed into an opened prompt. Returns whether anything
    /// changed; blocks whose prompt was never opened are ignored.
    pub fn update_suggestion_instructions(&self, block_id: &BlockId, text: &str) -> bool {
        if !self.config.suggestions.enabled {
            return false;
        }
        let changed = self
            .state
            .lock()
            .suggestions
            .existing_mut(block_id)
            .is_some_and(|snapshot| snapshot.set_instructions(text));
        if changed {
            self.emit();
        }
        changed
    }

    /// Reset a block's suggestion state to empty.
    pub fn close_suggestion(&self, block_id: &BlockId) -> bool {
        let closed = self.state.lock().suggestions.close(block_id);
        if closed {
            self.emit();
        }
        closed
    }

    /// Request a suggestion for the active paragraph.
    #[tracing::instrument(skip_all, fields(block = block_id.short()))]
    pub async fn submit_suggestion(&self, block_id: &BlockId) -> SuggestionOutcome {
        if !self.config.suggestions.enabled {
            return SuggestionOutcome::Disabled;
        }

        let begun = {
            let mut state = self.state.lock();
            let StoreState {
                active,
                suggestions,
                ..
            } = &mut *state;
            let Some(p) = paragraph_mut(active, block_id) else {
                return SuggestionOutcome::NoSession;
            };
            let draft_text = p.draft.text.clone();
            let ticket = suggestions.next_ticket();
            suggestions
                .entry(block_id)
                .begin_request(&draft_text, ticket)
                .map(|instructions| (ticket, instructions))
        };

        let (ticket, instructions) = match begun {
            Ok(started) => started,
            Err(RequestBlocked::AlreadyPending) => return SuggestionOutcome::Busy,
            Err(RequestBlocked::EmptyInstructions) => {
                self.emit();
                return SuggestionOutcome::Invalid;
            }
        };
        self.emit();

        let result = self
            .deps
            .suggestions
            .request_suggestion(block_id, &instructions)
            .await;

        let (accepted, failure) = {
            let mut state = self.state.lock();
            let Some(snapshot) = state.suggestions.existing_mut(block_id) else {
                debug!("suggestion closed while request was in flight");
                return SuggestionOutcome::Superseded;
            };
            match result {
                Ok(suggestion) => (snapshot.finish_request(ticket, Ok(suggestion.text)), None),
                Err(e) => {
                    let err = EditorError::from(e);
                    (snapshot.finish_request(ticket, Err(err.to_string())), Some(err))
                }
            }
        };

        if !accepted {
            debug!("dropping superseded suggestion response");
            return SuggestionOutcome::Superseded;
        }
        match failure {
            Some(err) => {
                warn!(error = %err, "suggestion request failed");
                self.deps.report(&err);
                self.emit();
                SuggestionOutcome::Failed
            }
            None => {
                self.emit();
                SuggestionOutcome::Ready
            }
        }
    }

    /// Write the stored suggestion into the draft.
    pub fn apply_suggestion(&self, block_id: &BlockId) -> bool {
        let applied = {
            let mut state = self.state.lock();
            let StoreState {
                active,
                suggestions,
                ..
            } = &mut *state;
            let Some(p) = paragraph_mut(active, block_id) else {
                return false;
            };
            let Some(snapshot) = suggestions.existing_mut(block_id) else {
                return false;
            };
            match snapshot.apply() {
                Some(text) => {
                    p.draft = ParagraphDraft { text };
                    true
                }
                None => false,
            }
        };
        if applied {
            self.emit();
        }
        applied
    }

    /// Clear the stored suggestion. An applied suggestion is undone.
    pub fn dismiss_suggestion(&self, block_id: &BlockId) -> bool {
        let dismissed = {
            let mut state = self.state.lock();
            let StoreState {
                active,
                suggestions,
                ..
            } = &mut *state;
            let Some(snapshot) = suggestions.existing_mut(block_id) else {
                return false;
            };
            match snapshot.dismiss() {
                Dismissal::NothingToDismiss => false,
                Dismissal::Hidden => true,
                Dismissal::Restore(text) => {
                    match paragraph_mut(active, block_id) {
                        Some(p) => p.draft = ParagraphDraft { text },
                        None => debug!(block = %block_id, "session gone, nothing to restore"),
                    }
                    true
                }
            }
        };
        if dismissed {
            self.emit();
        }
        dismissed
    }

    /// Fetch the rendered prompt and put it on the clipboard.
    ///
    /// Failures are recorded in the snapshot and reported to the notifier;
    /// the return value only says whether the copy happened.
    #[tracing::instrument(skip_all, fields(block = block_id.short()))]
    pub async fn copy_suggestion_prompt(&self, block_id: &BlockId) -> bool {
        if !self.config.suggestions.enabled {
            return false;
        }

        let (ticket, instructions) = {
            let mut state = self.state.lock();
            let StoreState {
                active,
                suggestions,
                ..
            } = &mut *state;
            let draft_text = paragraph_mut(active, block_id)
                .map(|p| p.draft.text.clone())
                .unwrap_or_default();
            let ticket = suggestions.next_ticket();
            let snapshot = suggestions.entry(block_id);
            if !snapshot.begin_copy(ticket) {
                return false;
            }
            (ticket, snapshot.effective_instructions(&draft_text))
        };
        self.emit();

        let outcome = async {
            let rendered = self
                .deps
                .suggestions
                .fetch_prompt(block_id, &instructions)
                .await?;
            self.deps.clipboard.write_text(&rendered.prompt)?;
            Ok::<(), EditorError>(())
        }
        .await;

        let accepted = {
            let mut state = self.state.lock();
            match state.suggestions.existing_mut(block_id) {
                Some(snapshot) => {
                    snapshot.finish_copy(ticket, outcome.clone().map_err(|e| e.to_string()))
                }
                None => false,
            }
        };
        if !accepted {
            debug!("dropping superseded copy result");
            return false;
        }
        if let Err(e) = &outcome {
            warn!(error = %e, "copying prompt failed");
            self.deps.report(e);
        }
        self.emit();
        outcome.is_ok()
    }

    /// Return a `Copied` status to `Idle`.
    pub fn reset_copy_status(&self, block_id: &BlockId) -> bool {
        let reset = self
            .state
            .lock()
            .suggestions
            .existing_mut(block_id)
            .is_some_and(|s| s.reset_copy_status());
        if reset {
            self.emit();
        }
        reset
    }
}
