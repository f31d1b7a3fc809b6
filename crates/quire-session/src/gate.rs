//! Confirmation requests and the discard-confirmation gate.
//!
//! The store never assumes a particular confirmation UI. It hands a
//! [`ConfirmRequest`] to an injected [`Confirmation`] and awaits the decision;
//! whether the answer comes from a modal dialog, a CLI flag, or a test closure
//! is the collaborator's business.

use std::sync::Arc;

use async_trait::async_trait;

use quire_types::BlockId;

/// Why unsaved changes are about to be thrown away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscardContext {
    /// The user cancelled the active session.
    Cancel,
    /// The user started editing a different block.
    Switch,
}

impl DiscardContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardContext::Cancel => "cancel",
            DiscardContext::Switch => "switch",
        }
    }
}

impl std::fmt::Display for DiscardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the user must approve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmRequest {
    DiscardChanges(DiscardContext),
    DeleteBlock(BlockId),
    DeleteVersion { block_id: BlockId, version: u32 },
}

/// Confirmation collaborator. Answers may arrive asynchronously.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, request: &ConfirmRequest) -> bool;
}

/// Adapts a synchronous closure into a [`Confirmation`].
pub struct FnConfirmation<F>(pub F);

#[async_trait]
impl<F> Confirmation for FnConfirmation<F>
where
    F: Fn(&ConfirmRequest) -> bool + Send + Sync,
{
    async fn confirm(&self, request: &ConfirmRequest) -> bool {
        (self.0)(request)
    }
}

/// Approves everything.
pub struct AlwaysConfirm;

#[async_trait]
impl Confirmation for AlwaysConfirm {
    async fn confirm(&self, _request: &ConfirmRequest) -> bool {
        true
    }
}

/// Declines everything.
pub struct NeverConfirm;

#[async_trait]
impl Confirmation for NeverConfirm {
    async fn confirm(&self, _request: &ConfirmRequest) -> bool {
        false
    }
}

/// Decides whether a transition that would drop pending changes may proceed.
///
/// Stateless; holds only the collaborator.
#[derive(Clone)]
pub struct DiscardGate {
    confirm: Arc<dyn Confirmation>,
}

impl DiscardGate {
    pub fn new(confirm: Arc<dyn Confirmation>) -> Self {
        Self { confirm }
    }

    /// Await the user's decision for `context`.
    pub async fn allows(&self, context: DiscardContext) -> bool {
        let allowed = self
            .confirm
            .confirm(&ConfirmRequest::DiscardChanges(context))
            .await;
        tracing::debug!(%context, allowed, "discard confirmation");
        allowed
    }
}
