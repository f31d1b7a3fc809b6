//! Shared fixtures for the store integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use quire_session::{ConfirmRequest, Confirmation, EditingStore, EditorConfig, MemoryWorld};
use quire_types::{
    Block, BlockContent, BlockId, Chapter, DialogueContent, DialogueTurn, MetadataContent,
    MetadataKind, SceneBoundaryContent, SceneDetails,
};

pub const CHAPTER: &str = "ch-1";

pub fn id(s: &str) -> BlockId {
    BlockId::new(s)
}

fn turn(id: &str, speaker: &str, utterance: &str, direction: Option<&str>) -> DialogueTurn {
    DialogueTurn {
        id: Some(id.into()),
        speaker_name: Some(speaker.into()),
        speaker_id: None,
        utterance: Some(utterance.into()),
        stage_direction: direction.map(Into::into),
    }
}

/// One block of every variant, plus an empty paragraph.
pub fn chapter() -> Chapter {
    Chapter::new(CHAPTER, "Arrival")
        .with_block(Block::paragraph("p1", "The rain had not stopped."))
        .with_block(Block::paragraph("p2", ""))
        .with_block(Block::new(
            "d1",
            BlockContent::Dialogue(DialogueContent {
                turns: vec![
                    turn("a", "Mara", "Who's there?", None),
                    turn("b", "Ilse", "Only me.", Some("whispering")),
                ],
            }),
        ))
        .with_block(Block::new(
            "s1",
            BlockContent::SceneBoundary(SceneBoundaryContent {
                label: Some("Dawn".into()),
                summary: None,
                scene_details: Some(SceneDetails {
                    location_name: Some("Harbor".into()),
                    ..Default::default()
                }),
            }),
        ))
        .with_block(Block::new(
            "m1",
            BlockContent::Metadata(MetadataContent {
                kind: MetadataKind::Context,
                pov_character: Some("Mara".into()),
                theme_tags: vec!["loss".into(), "rain".into()],
                ..Default::default()
            }),
        ))
        .with_block(Block::new(
            "h1",
            BlockContent::Metadata(MetadataContent {
                kind: MetadataKind::ChapterHeader,
                title: Some("Arrival".into()),
                ..Default::default()
            }),
        ))
}

/// Confirmation that records requests and answers with a switchable value.
#[derive(Default)]
pub struct ScriptedConfirm {
    answer: AtomicBool,
    seen: Mutex<Vec<ConfirmRequest>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer: AtomicBool::new(answer),
            ..Default::default()
        })
    }

    pub fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }

    pub fn seen(&self) -> Vec<ConfirmRequest> {
        self.seen.lock().clone()
    }

    /// Make every later answer wait for a permit on the returned semaphore.
    pub fn hold(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(semaphore.clone());
        semaphore
    }
}

#[async_trait]
impl Confirmation for ScriptedConfirm {
    async fn confirm(&self, request: &ConfirmRequest) -> bool {
        self.seen.lock().push(request.clone());
        let gate = self.gate.lock().clone();
        if let Some(semaphore) = gate {
            if let Ok(permit) = semaphore.acquire().await {
                permit.forget();
            }
        }
        self.answer.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub world: MemoryWorld,
    pub confirm: Arc<ScriptedConfirm>,
    pub store: Arc<EditingStore>,
    pub notifications: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        let world = MemoryWorld::new(chapter());
        let confirm = ScriptedConfirm::answering(true);
        let store = Arc::new(EditingStore::new(
            CHAPTER.into(),
            world.collaborators(confirm.clone()),
            config,
        ));
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        Self {
            world,
            confirm,
            store,
            notifications,
        }
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    /// The cached canonical block.
    pub fn block(&self, block_id: &str) -> Option<Block> {
        self.world.cache.snapshot().block(&id(block_id)).cloned()
    }

    /// Let spawned tasks run up to their next suspension point.
    pub async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}
