//! Editing scripts: a JSON array of steps replayed against the store.
//!
//! ```json
//! [
//!   { "op": "start", "block": "p1" },
//!   { "op": "text", "text": "The rain stopped." },
//!   { "op": "save" }
//! ]
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use quire_session::{
    DialogueTurnField, EditingStore, MemoryWorld, MetadataField, RemoteError, RemoteOp,
    SceneBoundaryField,
};
use quire_types::{BlockId, MetadataKind};

/// Turn id placeholder for the most recently added turn.
pub const NEW_TURN: &str = "@new";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Start { block: String },
    Cancel,
    Text { text: String },
    AddTurn,
    Turn {
        turn: String,
        field: DialogueTurnField,
        value: String,
    },
    RemoveTurn { turn: String },
    Scene {
        field: SceneBoundaryField,
        value: String,
    },
    Metadata { field: MetadataField, value: String },
    Kind { kind: MetadataKind },
    Save,
    Delete,
    Sync,
    /// Open the prompt, optionally type instructions, and submit.
    Suggest {
        block: String,
        #[serde(default)]
        instructions: Option<String>,
    },
    Apply { block: String },
    Dismiss { block: String },
    CopyPrompt { block: String },
    Version { block: String, version: u32 },
    PreviousVersion { block: String },
    NextVersion { block: String },
    DeleteVersion { block: String, version: u32 },
}

pub fn parse(text: &str) -> Result<Vec<ScriptStep>> {
    serde_json::from_str(text).context("invalid script")
}

/// Replays steps against one store.
pub struct Runner {
    store: Arc<EditingStore>,
    world: MemoryWorld,
    fail_saves: bool,
    last_turn: Option<String>,
}

impl Runner {
    pub fn new(store: Arc<EditingStore>, world: MemoryWorld, fail_saves: bool) -> Self {
        Self {
            store,
            world,
            fail_saves,
            last_turn: None,
        }
    }

    fn turn_id(&self, turn: &str) -> String {
        match (turn, &self.last_turn) {
            (NEW_TURN, Some(id)) => id.clone(),
            _ => turn.to_string(),
        }
    }

    pub async fn run(&mut self, steps: &[ScriptStep]) {
        for (index, step) in steps.iter().enumerate() {
            let applied = self.step(step).await;
            info!(step = index, ?step, %applied, "step");
        }
    }

    /// Run one step. Returns a short description of what happened.
    pub async fn step(&mut self, step: &ScriptStep) -> String {
        let store = &self.store;
        match step {
            ScriptStep::Start { block } => {
                store.start_editing(&BlockId::new(block)).await.to_string()
            }
            ScriptStep::Cancel => store.cancel_editing().await.to_string(),
            ScriptStep::Text { text } => store.update_paragraph_draft(text).to_string(),
            ScriptStep::AddTurn => {
                self.last_turn = store.add_dialogue_turn();
                format!("{:?}", self.last_turn)
            }
            ScriptStep::Turn { turn, field, value } => store
                .change_dialogue_turn(&self.turn_id(turn), *field, value)
                .to_string(),
            ScriptStep::RemoveTurn { turn } => {
                store.remove_dialogue_turn(&self.turn_id(turn)).to_string()
            }
            ScriptStep::Scene { field, value } => {
                store.update_scene_boundary_field(*field, value).to_string()
            }
            ScriptStep::Metadata { field, value } => {
                store.update_metadata_field(*field, value).to_string()
            }
            ScriptStep::Kind { kind } => store.change_metadata_kind(*kind).to_string(),
            ScriptStep::Save => {
                if self.fail_saves {
                    self.world.remote.fail_next(
                        RemoteOp::UpdateBlock,
                        RemoteError::Unavailable("saves disabled by --fail-saves".into()),
                    );
                }
                format!("{:?}", store.save_active_block().await)
            }
            ScriptStep::Delete => format!("{:?}", store.confirm_delete_active_block().await),
            ScriptStep::Sync => store.sync_active_session().to_string(),
            ScriptStep::Suggest {
                block,
                instructions,
            } => {
                let block = BlockId::new(block);
                if !store.open_suggestion_prompt(&block) {
                    warn!(%block, "suggestion prompt did not open");
                }
                if let Some(instructions) = instructions {
                    store.update_suggestion_instructions(&block, instructions);
                }
                format!("{:?}", store.submit_suggestion(&block).await)
            }
            ScriptStep::Apply { block } => {
                store.apply_suggestion(&BlockId::new(block)).to_string()
            }
            ScriptStep::Dismiss { block } => {
                store.dismiss_suggestion(&BlockId::new(block)).to_string()
            }
            ScriptStep::CopyPrompt { block } => {
                let copied = store.copy_suggestion_prompt(&BlockId::new(block)).await;
                if let Some(text) = self.world.clipboard.contents() {
                    info!(clipboard = %text, "prompt copied");
                }
                copied.to_string()
            }
            ScriptStep::Version { block, version } => {
                let nav = store.version_navigator(&BlockId::new(block));
                let outcome = nav.navigate_to_version(*version).await;
                store.sync_active_session();
                format!("{outcome:?}")
            }
            ScriptStep::PreviousVersion { block } => {
                let nav = store.version_navigator(&BlockId::new(block));
                let outcome = nav.navigate_previous().await;
                store.sync_active_session();
                format!("{outcome:?}")
            }
            ScriptStep::NextVersion { block } => {
                let nav = store.version_navigator(&BlockId::new(block));
                let outcome = nav.navigate_next().await;
                store.sync_active_session();
                format!("{outcome:?}")
            }
            ScriptStep::DeleteVersion { block, version } => {
                let nav = store.version_navigator(&BlockId::new(block));
                if let Err(e) = nav.load_versions().await {
                    warn!(error = %e, "could not list versions");
                }
                let outcome = nav.delete_version(*version).await;
                store.sync_active_session();
                format!("{outcome:?}")
            }
        }
    }
}
