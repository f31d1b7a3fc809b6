//! Per-block AI suggestion state.
//!
//! Each block gets its own [`SuggestionSnapshot`], keyed by block id and held
//! in [`Suggestions`]. Snapshots are independent of editing sessions: leaving a
//! block and coming back finds the prompt, result, or error where it was.
//!
//! # State Machine
//!
//! ```text
//!            open()                 begin_request()
//!  closed ───────────▶ prompt open ─────────────────▶ requesting
//!     ▲                    ▲   │ empty instructions        │
//!     │ close()            │   └──▶ inline error           │ finish_request()
//!     │                    │ error (prompt stays open) ◀───┤
//!     │                    │                               ▼
//!     │                    │                         result ready
//!     │                    │                 apply() │          │ dismiss()
//!     │                    │                         ▼          ▼
//!     └────────────────────┴──────────────── applied ──▶ dismissed (undo)
//! ```
//!
//! The functions here are pure state transitions; the store performs the
//! remote calls and owns the session whose draft text is read and written.
//! Every request carries a ticket. A completion whose ticket no longer matches
//! the snapshot (it was closed or reset meanwhile) is dropped.

use std::collections::HashMap;

use quire_types::BlockId;

use crate::error::EditorError;

/// Inline message shown when a suggestion is requested without instructions.
pub const EMPTY_INSTRUCTIONS: &str = "Describe what the suggestion should do.";

/// Copy-prompt progress, independent of the request/result states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CopyStatus {
    #[default]
    Idle,
    Pending,
    Copied,
}

/// A suggestion returned by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionResult {
    /// Instructions the suggestion was generated from.
    pub instructions: String,
    pub text: String,
    /// Whether the text has been written into the draft.
    pub is_applied: bool,
    /// Draft text right before this suggestion was requested. Dismissing an
    /// applied result restores it.
    pub draft_before: String,
}

/// Why a request was not started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBlocked {
    AlreadyPending,
    EmptyInstructions,
}

/// Outcome of dismissing a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dismissal {
    /// There was no result to dismiss.
    NothingToDismiss,
    /// The result was never applied; the draft stays as it is.
    Hidden,
    /// The result had been applied; the draft should go back to this text.
    Restore(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuggestionSnapshot {
    pub prompt_open: bool,
    pub instructions: String,
    /// Draft edits are mirrored into `instructions` while this is set.
    pub uses_draft_as_prompt: bool,
    /// Draft text captured for the request in flight.
    pub pending_draft: Option<String>,
    pub result: Option<SuggestionResult>,
    pub error: Option<String>,
    pub copy_status: CopyStatus,
    pub is_request_pending: bool,
    pub is_copy_pending: bool,
    request_ticket: Option<u64>,
    copy_ticket: Option<u64>,
}

impl SuggestionSnapshot {
    /// Nothing the user typed or received survives in this snapshot.
    fn has_residual_text(&self) -> bool {
        !self.instructions.trim().is_empty() || self.result.is_some()
    }

    /// Open the prompt panel against the current draft text.
    pub(crate) fn open(&mut self, draft_text: &str, mirror_empty_draft: bool) {
        if !self.has_residual_text() && !self.is_request_pending && !self.is_copy_pending {
            *self = Self::default();
        }
        self.prompt_open = true;
        self.error = None;
        if mirror_empty_draft && draft_text.is_empty() {
            self.instructions = draft_text.to_string();
            self.uses_draft_as_prompt = true;
        } else {
            self.uses_draft_as_prompt = false;
        }
    }

    /// Instructions typed directly into the prompt. Ends draft mirroring.
    ///
    /// Returns whether the snapshot changed.
    pub(crate) fn set_instructions(&mut self, text: &str) -> bool {
        let changed =
            self.instructions != text || self.uses_draft_as_prompt || self.error.is_some();
        self.instructions = text.to_string();
        self.uses_draft_as_prompt = false;
        self.error = None;
        changed
    }

    /// Follow a draft edit. Returns whether the snapshot changed.
    pub(crate) fn mirror_draft(&mut self, draft_text: &str) -> bool {
        if !self.uses_draft_as_prompt || self.instructions == draft_text {
            return false;
        }
        self.instructions = draft_text.to_string();
        true
    }

    /// Instructions a request would be sent with right now.
    pub fn effective_instructions(&self, draft_text: &str) -> String {
        if self.uses_draft_as_prompt {
            draft_text.to_string()
        } else {
            self.instructions.clone()
        }
    }

    /// Validate and mark a request in flight. Returns the instructions to send.
    pub(crate) fn begin_request(
        &mut self,
        draft_text: &str,
        ticket: u64,
    ) -> Result<String, RequestBlocked> {
        if self.is_request_pending {
            return Err(RequestBlocked::AlreadyPending);
        }
        let instructions = self.effective_instructions(draft_text);
        if instructions.trim().is_empty() {
            let error = EditorError::Validation(EMPTY_INSTRUCTIONS.to_string());
            self.error = Some(error.to_string());
            return Err(RequestBlocked::EmptyInstructions);
        }
        self.instructions = instructions.clone();
        self.pending_draft = Some(draft_text.to_string());
        self.error = None;
        self.is_request_pending = true;
        self.request_ticket = Some(ticket);
        Ok(instructions)
    }

    /// Record a request's outcome. Returns `false` for a superseded ticket.
    pub(crate) fn finish_request(&mut self, ticket: u64, outcome: Result<String, String>) -> bool {
        if self.request_ticket != Some(ticket) {
            return false;
        }
        self.request_ticket = None;
        self.is_request_pending = false;
        let draft_before = self.pending_draft.take();
        match outcome {
            Ok(text) => {
                self.result = Some(SuggestionResult {
                    instructions: self.instructions.clone(),
                    text,
                    is_applied: false,
                    draft_before: draft_before.unwrap_or_default(),
                });
                self.prompt_open = false;
                self.uses_draft_as_prompt = false;
                self.error = None;
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
        true
    }

    /// Mark the result applied. Returns the text to write into the draft, or
    /// `None` when there is no result or it is already applied.
    pub(crate) fn apply(&mut self) -> Option<String> {
        let result = self.result.as_mut()?;
        if result.is_applied {
            return None;
        }
        result.is_applied = true;
        Some(result.text.clone())
    }

    /// Clear the result, undoing an applied one.
    ///
    /// Only the removed result's own pre-request text is restored; a request
    /// still in flight keeps its capture.
    pub(crate) fn dismiss(&mut self) -> Dismissal {
        match self.result.take() {
            None => Dismissal::NothingToDismiss,
            Some(result) if result.is_applied => Dismissal::Restore(result.draft_before),
            Some(_) => Dismissal::Hidden,
        }
    }

    /// Start a copy-prompt operation. Returns `false` if one is running.
    pub(crate) fn begin_copy(&mut self, ticket: u64) -> bool {
        if self.is_copy_pending {
            return false;
        }
        self.is_copy_pending = true;
        self.copy_status = CopyStatus::Pending;
        self.copy_ticket = Some(ticket);
        true
    }

    /// Record a copy outcome. Returns `false` for a superseded ticket.
    pub(crate) fn finish_copy(&mut self, ticket: u64, outcome: Result<(), String>) -> bool {
        if self.copy_ticket != Some(ticket) {
            return false;
        }
        self.copy_ticket = None;
        self.is_copy_pending = false;
        match outcome {
            Ok(()) => self.copy_status = CopyStatus::Copied,
            Err(message) => {
                self.copy_status = CopyStatus::Idle;
                self.error = Some(message);
            }
        }
        true
    }

    /// `Copied` back to `Idle` (after the UI has shown the confirmation).
    pub(crate) fn reset_copy_status(&mut self) -> bool {
        if self.copy_status != CopyStatus::Copied {
            return false;
        }
        self.copy_status = CopyStatus::Idle;
        true
    }
}

/// Suggestion snapshots keyed by block id.
#[derive(Debug, Default)]
pub struct Suggestions {
    snapshots: HashMap<BlockId, SuggestionSnapshot>,
    next_ticket: u64,
}

impl Suggestions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for `block_id`, or an empty one if none exists yet.
    pub fn get(&self, block_id: &BlockId) -> SuggestionSnapshot {
        self.snapshots.get(block_id).cloned().unwrap_or_default()
    }

    /// Existing snapshot, without creating one.
    pub fn existing_mut(&mut self, block_id: &BlockId) -> Option<&mut SuggestionSnapshot> {
        self.snapshots.get_mut(block_id)
    }

    /// Snapshot for `block_id`, created empty on first access.
    pub fn entry(&mut self, block_id: &BlockId) -> &mut SuggestionSnapshot {
        self.snapshots.entry(block_id.clone()).or_default()
    }

    /// Reset to empty. In-flight completions for the old state are dropped.
    pub fn close(&mut self, block_id: &BlockId) -> bool {
        self.snapshots.remove(block_id).is_some()
    }

    /// A ticket no earlier request has used.
    pub fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
