//! Version navigation for one block.
//!
//! A block carries `active_version` and `version_count`. The full list of
//! version numbers is fetched lazily and cached; numbers can have gaps once
//! versions are deleted, so previous/next are taken from the list when it is
//! complete and fall back to `active ± 1` otherwise.
//!
//! Navigation is a partial update that only sets the active version. Deletion
//! goes through confirmation and never removes the last remaining version.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use quire_types::{BlockId, BlockPatch, Chapter, ChapterId};

use crate::config::VersionConfig;
use crate::error::EditorError;
use crate::gate::ConfirmRequest;
use crate::remote::Collaborators;

/// Where previous/next would go from the active version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VersionTargets {
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

/// Compute previous/next targets.
///
/// `known` is the fetched version list, sorted or not. When it is missing or
/// shorter than `count` it is not trusted and the neighbours are guessed as
/// `active ± 1`, clamped to `1..=count`.
pub fn version_targets(active: u32, count: u32, known: Option<&[u32]>) -> VersionTargets {
    let fallback_previous = (active > 1).then(|| active - 1);
    let fallback_next = (active < count).then(|| active + 1);

    let Some(known) = known.filter(|k| !k.is_empty()) else {
        return VersionTargets {
            previous: fallback_previous,
            next: fallback_next,
        };
    };
    if known.len() < count as usize {
        // Versions exist that the list has not seen yet.
        return VersionTargets {
            previous: fallback_previous,
            next: fallback_next,
        };
    }

    VersionTargets {
        previous: known.iter().copied().filter(|v| *v < active).max(),
        next: known.iter().copied().filter(|v| *v > active).min(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigateOutcome {
    Navigated,
    /// Target was 0 or already active; no call was made.
    Unchanged,
    /// Another navigation or deletion is in flight.
    Busy,
    /// The block is not in the current chapter.
    Missing,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteVersionOutcome {
    Deleted,
    /// Rejected locally before any call; carries the inline error.
    Rejected(EditorError),
    Declined,
    Busy,
    Missing,
    Failed,
}

#[derive(Debug, Default)]
struct NavState {
    known: Option<Vec<u32>>,
    observed_count: Option<u32>,
    generation: u64,
    is_loading: bool,
    is_navigating: bool,
    is_deleting: bool,
}

/// Version controls for one block of one chapter.
pub struct VersionNavigator {
    chapter_id: ChapterId,
    block_id: BlockId,
    deps: Collaborators,
    config: VersionConfig,
    state: Mutex<NavState>,
}

impl VersionNavigator {
    pub fn new(
        chapter_id: ChapterId,
        block_id: BlockId,
        deps: Collaborators,
        config: VersionConfig,
    ) -> Self {
        Self {
            chapter_id,
            block_id,
            deps,
            config,
            state: Mutex::new(NavState::default()),
        }
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    pub fn known_versions(&self) -> Option<Vec<u32>> {
        self.state.lock().known.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn is_navigating(&self) -> bool {
        self.state.lock().is_navigating
    }

    pub fn is_deleting(&self) -> bool {
        self.state.lock().is_deleting
    }

    /// `(active_version, version_count)` from the canonical block.
    fn current(&self) -> Option<(u32, u32)> {
        self.deps
            .chapter
            .resolve(&self.block_id)
            .map(|b| (b.active_version, b.version_count))
    }

    /// Record the block's current version count.
    ///
    /// Returns true when the cached list was dropped because the count grew.
    pub fn observe(&self, version_count: u32) -> bool {
        let mut state = self.state.lock();
        let grew = state.observed_count.is_some_and(|seen| version_count > seen);
        state.observed_count = Some(version_count);
        if grew && self.config.refetch_on_growth && state.known.is_some() {
            debug!(block = %self.block_id, version_count, "version count grew, dropping cached list");
            state.known = None;
            state.generation += 1;
            return true;
        }
        false
    }

    /// Re-read the canonical block and refetch the list if its count grew.
    ///
    /// Returns whether a refetch happened.
    pub async fn sync(&self) -> bool {
        let Some((_, count)) = self.current() else {
            return false;
        };
        if !self.observe(count) {
            return false;
        }
        if let Err(e) = self.fetch().await {
            debug!(error = %e, "refetch after growth failed");
        }
        true
    }

    /// The version list, fetched on first use.
    pub async fn load_versions(&self) -> Result<Vec<u32>, EditorError> {
        if let Some(known) = self.state.lock().known.clone() {
            return Ok(known);
        }
        self.fetch().await
    }

    /// Drop the cached list and fetch it again.
    pub async fn refresh_versions(&self) -> Result<Vec<u32>, EditorError> {
        {
            let mut state = self.state.lock();
            state.known = None;
            state.generation += 1;
        }
        self.fetch().await
    }

    async fn fetch(&self) -> Result<Vec<u32>, EditorError> {
        let generation = {
            let mut state = self.state.lock();
            state.is_loading = true;
            state.generation
        };

        let result = self
            .deps
            .versions
            .list_versions(&self.chapter_id, &self.block_id)
            .await;
        let count = self.current().map(|(_, count)| count);

        let numbers = {
            let mut state = self.state.lock();
            state.is_loading = false;
            match result {
                Ok(list) => {
                    let numbers = list.numbers();
                    if state.generation == generation {
                        state.known = Some(numbers.clone());
                        // Growth is measured from the count the list was fetched at.
                        if count.is_some() {
                            state.observed_count = count;
                        }
                    } else {
                        debug!(block = %self.block_id, "discarding stale version list");
                    }
                    Ok(numbers)
                }
                Err(e) => Err(EditorError::from(e)),
            }
        };
        if let Err(e) = &numbers {
            warn!(block = %self.block_id, error = %e, "listing versions failed");
            self.deps.report(e);
        }
        numbers
    }

    /// Previous/next from the canonical block and the cached list.
    pub fn targets(&self) -> VersionTargets {
        let Some((active, count)) = self.current() else {
            return VersionTargets::default();
        };
        let state = self.state.lock();
        version_targets(active, count, state.known.as_deref())
    }

    /// Whether a delete control should be offered.
    pub fn can_delete(&self) -> bool {
        let deleting = self.state.lock().is_deleting;
        !deleting && self.current().is_some_and(|(_, count)| count > 1)
    }

    /// Accept a returned chapter unless it belongs to another chapter.
    fn accept_chapter(&self, chapter: Chapter) {
        if chapter.id != self.chapter_id {
            debug!(returned = %chapter.id, "dropping chapter for another chapter id");
            return;
        }
        self.deps.chapter.replace(chapter);
        if let Some((_, count)) = self.current() {
            self.observe(count);
        }
    }

    /// Make `version` the active version.
    #[tracing::instrument(skip_all, fields(block = self.block_id.short(), version = version))]
    pub async fn navigate_to_version(&self, version: u32) -> NavigateOutcome {
        if version == 0 {
            return NavigateOutcome::Unchanged;
        }
        let Some((active, _)) = self.current() else {
            return NavigateOutcome::Missing;
        };
        if version == active {
            return NavigateOutcome::Unchanged;
        }

        {
            let mut state = self.state.lock();
            if state.is_navigating || state.is_deleting {
                return NavigateOutcome::Busy;
            }
            state.is_navigating = true;
        }

        let result = self
            .deps
            .blocks
            .update_block(&self.block_id, &BlockPatch::active_version(version))
            .await;
        self.state.lock().is_navigating = false;

        match result {
            Ok(chapter) => {
                self.accept_chapter(chapter);
                info!(from = active, "active version changed");
                NavigateOutcome::Navigated
            }
            Err(e) => {
                let err = EditorError::from(e);
                warn!(error = %err, "version navigation failed");
                self.deps.report(&err);
                NavigateOutcome::Failed
            }
        }
    }

    pub async fn navigate_previous(&self) -> NavigateOutcome {
        match self.targets().previous {
            Some(version) => self.navigate_to_version(version).await,
            None => NavigateOutcome::Unchanged,
        }
    }

    pub async fn navigate_next(&self) -> NavigateOutcome {
        match self.targets().next {
            Some(version) => self.navigate_to_version(version).await,
            None => NavigateOutcome::Unchanged,
        }
    }

    /// Delete one version after confirmation, then refetch the list.
    ///
    /// The last remaining version is refused locally, without a server call
    /// and without reaching the notifier.
    #[tracing::instrument(skip_all, fields(block = self.block_id.short(), version = version))]
    pub async fn delete_version(&self, version: u32) -> DeleteVersionOutcome {
        let Some((_, count)) = self.current() else {
            return DeleteVersionOutcome::Missing;
        };
        if count <= 1 {
            debug!("refusing to delete the only version");
            return DeleteVersionOutcome::Rejected(EditorError::LastVersion(self.block_id.clone()));
        }

        let out_of_range = {
            let state = self.state.lock();
            if state.is_navigating || state.is_deleting {
                return DeleteVersionOutcome::Busy;
            }
            version == 0
                || state
                    .known
                    .as_ref()
                    .is_some_and(|known| !known.contains(&version))
        };
        if out_of_range {
            return DeleteVersionOutcome::Rejected(EditorError::VersionOutOfRange {
                block_id: self.block_id.clone(),
                version,
                count,
            });
        }

        let request = ConfirmRequest::DeleteVersion {
            block_id: self.block_id.clone(),
            version,
        };
        if !self.deps.confirm.confirm(&request).await {
            debug!("version delete declined");
            return DeleteVersionOutcome::Declined;
        }

        {
            let mut state = self.state.lock();
            if state.is_navigating || state.is_deleting {
                return DeleteVersionOutcome::Busy;
            }
            state.is_deleting = true;
        }

        let result = self
            .deps
            .versions
            .delete_version(&self.chapter_id, &self.block_id, version)
            .await;
        self.state.lock().is_deleting = false;

        match result {
            Ok(chapter) => {
                self.accept_chapter(chapter);
                info!("version deleted");
                if let Err(e) = self.refresh_versions().await {
                    debug!(error = %e, "version list refresh after delete failed");
                }
                DeleteVersionOutcome::Deleted
            }
            Err(e) => {
                let err = EditorError::from(e);
                warn!(error = %err, "version delete failed");
                self.deps.report(&err);
                DeleteVersionOutcome::Failed
            }
        }
    }
}
