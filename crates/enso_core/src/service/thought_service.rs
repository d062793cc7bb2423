//! Thought service: capture, triage, linking and sync orchestration.
//!
//! # Responsibility
//! - Run every user-facing operation against the local cache first, queue
//!   the change in the pending log, then push to the repository on a
//!   best-effort basis.
//! - Keep the UI indicator in step with local mutations and sync results.
//!
//! # Invariants
//! - A repository failure never rolls back the local effect of a
//!   mutation (delete is the exception: the cached record is restored);
//!   the change stays queued and the indicator flags a conflict.
//! - User-supplied tags are validated against the reserved metadata
//!   prefix at this boundary; internal re-encoding of metadata is not.
//!
//! # See also
//! - crate::sync::engine
//! - crate::model::workspace

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::store::KeyValueStore;
use crate::cache::thought_cache::{CacheError, PendingChangeKind, ThoughtCache};
use crate::model::thought::{
    apply_thought_update, matches_query, normalize_thought, Thought, ThoughtDraft, ThoughtId,
    ThoughtPatch, ValidationError,
};
use crate::model::workspace::{
    collection_counts, encode_metadata, ensure_user_tags, CollectionId, EnergyLevel, Momentum,
    WorkspaceEntry, WorkspaceMetadata, WorkspaceStatus,
};
use crate::repo::thought_repo::{RepoResult, ThoughtRepository};
use crate::runtime::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
use crate::sync::engine::{SyncEngine, SyncError, SyncReport};
use crate::sync::status::{MutationSource, SyncIndicator, SyncStatusTracker};
use crate::sync::transport::SyncTransport;

/// Longest content-derived title; longer first lines fall back to the
/// default title.
const MAX_DERIVED_TITLE_CHARS: usize = 72;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound(ThoughtId),
    Cache(CacheError),
    Sync(SyncError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "thought {id} not found"),
            Self::Cache(err) => write!(f, "cache failed: {err}"),
            Self::Sync(err) => write!(f, "sync failed: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Cache(err) => Some(err),
            Self::Sync(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

/// Raw capture-box input.
#[derive(Debug, Clone, Default)]
pub struct CaptureInput {
    pub content: String,
    /// Explicit title; when absent one is derived from the first content
    /// line.
    pub title: Option<String>,
    pub tags: Vec<String>,
    /// The capture was made in focus mode.
    pub focus: bool,
    /// The capture belongs to project work.
    pub project: bool,
}

/// Facade the host drives; owns the repository, cache and indicator.
pub struct ThoughtService<R: ThoughtRepository, S: KeyValueStore> {
    repo: R,
    cache: ThoughtCache<S>,
    tracker: SyncStatusTracker,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<R: ThoughtRepository, S: KeyValueStore> ThoughtService<R, S> {
    pub fn new(repo: R, cache: ThoughtCache<S>) -> Self {
        Self::with_runtime(
            repo,
            cache,
            Arc::new(SystemClock),
            Arc::new(UuidIdGenerator),
        )
    }

    pub fn with_runtime(
        repo: R,
        cache: ThoughtCache<S>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            repo,
            cache,
            tracker: SyncStatusTracker::new(),
            clock,
            ids,
        }
    }

    pub fn cache(&self) -> &ThoughtCache<S> {
        &self.cache
    }

    /// Returns the device client id, minting one on first use.
    pub fn client_id(&mut self) -> ServiceResult<String> {
        Ok(self.cache.client_id(self.ids.as_ref())?)
    }

    /// Captures a new thought from raw input.
    ///
    /// The record lands in the cache and the pending log before the
    /// repository is attempted; a repository failure leaves the capture
    /// local and flags the indicator.
    pub fn capture(&mut self, input: CaptureInput) -> ServiceResult<WorkspaceEntry> {
        let user_tags = ensure_user_tags(&input.tags)?;
        let metadata = capture_metadata(input.focus, input.project, &user_tags);

        let title = match input.title {
            Some(title) => Some(title),
            None => derive_title(&input.content),
        };

        let mut tags = user_tags;
        tags.extend(encode_metadata(&metadata));
        let draft = ThoughtDraft {
            title,
            content: input.content,
            tags,
            ..ThoughtDraft::default()
        };
        let local = normalize_thought(draft, self.clock.as_ref(), self.ids.as_ref())?;

        self.cache.upsert_thought(&local)?;
        self.cache.append_pending(PendingChangeKind::Upsert, &local)?;
        self.tracker
            .mark_mutation(MutationSource::Capture, Instant::now());

        let cached = match self.repo.create(ThoughtDraft::from(local.clone())) {
            Ok(remote) => {
                self.cache.upsert_thought(&remote)?;
                remote
            }
            Err(err) => {
                warn!(
                    "event=capture status=local_only id={id} error={err}",
                    id = local.id
                );
                self.tracker.mark_failure();
                local
            }
        };

        Ok(WorkspaceEntry::from_thought(&cached))
    }

    /// Applies a patch to one thought; `patch.tags` are user tags and
    /// must not collide with the reserved prefix.
    pub fn edit(&mut self, id: &str, patch: ThoughtPatch) -> ServiceResult<WorkspaceEntry> {
        let user_tags = match &patch.tags {
            Some(tags) => Some(ensure_user_tags(tags)?),
            None => None,
        };

        let existing = self.require_cached(id)?;
        let entry = WorkspaceEntry::from_thought(&existing);

        let tags = user_tags.map(|mut tags| {
            tags.extend(encode_metadata(&entry.metadata));
            tags
        });
        let carrier_patch = ThoughtPatch { tags, ..patch };

        let local = self.stage_local(&existing, &carrier_patch)?;
        let remote = self.repo.update(&local.id, carrier_patch);
        self.finish_remote("edit", local, remote)
    }

    /// Replaces the workspace metadata of one thought, keeping its user
    /// tags.
    pub fn set_metadata(
        &mut self,
        id: &str,
        metadata: WorkspaceMetadata,
    ) -> ServiceResult<WorkspaceEntry> {
        let existing = self.require_cached(id)?;
        let entry = WorkspaceEntry::from_thought(&existing);

        let mut tags = entry.thought.tags.clone();
        tags.extend(encode_metadata(&metadata));
        let patch = ThoughtPatch {
            tags: Some(tags),
            ..ThoughtPatch::default()
        };

        let local = self.stage_local(&existing, &patch)?;
        let remote = self.repo.update(&local.id, patch);
        self.finish_remote("set_metadata", local, remote)
    }

    /// Links `source` to `target`. Linking a thought to itself fails;
    /// re-linking an existing pair changes nothing.
    pub fn link(&mut self, source: &str, target: &str) -> ServiceResult<WorkspaceEntry> {
        if source == target {
            return Err(ValidationError::SelfLink(source.to_string()).into());
        }
        let existing = self.require_cached(source)?;
        self.require_cached(target)?;

        if existing.links.iter().any(|link| link == target) {
            return Ok(WorkspaceEntry::from_thought(&existing));
        }

        let mut links = existing.links.clone();
        links.push(target.to_string());
        let patch = ThoughtPatch {
            links: Some(links),
            ..ThoughtPatch::default()
        };

        let local = self.stage_local(&existing, &patch)?;
        let remote = self.repo.link(source, target);
        self.finish_remote("link", local, remote)
    }

    /// Removes the `source -> target` link; a pair that was never linked
    /// is a no-op.
    pub fn unlink(&mut self, source: &str, target: &str) -> ServiceResult<WorkspaceEntry> {
        let existing = self.require_cached(source)?;

        if !existing.links.iter().any(|link| link == target) {
            return Ok(WorkspaceEntry::from_thought(&existing));
        }

        let links = existing
            .links
            .iter()
            .filter(|link| link.as_str() != target)
            .cloned()
            .collect();
        let patch = ThoughtPatch {
            links: Some(links),
            ..ThoughtPatch::default()
        };

        let local = self.stage_local(&existing, &patch)?;
        let remote = self.repo.unlink(source, target);
        self.finish_remote("unlink", local, remote)
    }

    /// Deletes one thought. If the repository rejects the delete, the
    /// cached record is restored and the deletion stays queued.
    pub fn remove(&mut self, id: &str) -> ServiceResult<()> {
        let Some(snapshot) = self.cache.remove_thought(id)? else {
            return Ok(());
        };
        self.cache
            .append_pending(PendingChangeKind::Delete, &snapshot)?;
        self.tracker
            .mark_mutation(MutationSource::Edit, Instant::now());

        if let Err(err) = self.repo.remove(id) {
            warn!("event=remove status=restored id={id} error={err}");
            self.cache.upsert_thought(&snapshot)?;
            self.tracker.mark_failure();
        }
        Ok(())
    }

    /// Runs one sync exchange, settling or flagging the indicator.
    pub fn sync<T: SyncTransport>(
        &mut self,
        engine: &mut SyncEngine<T>,
    ) -> ServiceResult<SyncReport> {
        match engine.sync_once(&mut self.cache) {
            Ok(report) => {
                self.tracker.mark_synced();
                Ok(report)
            }
            Err(err) => {
                self.tracker.mark_failure();
                Err(ServiceError::Sync(err))
            }
        }
    }

    /// Acknowledges a conflict and immediately retries the exchange.
    pub fn resolve<T: SyncTransport>(
        &mut self,
        engine: &mut SyncEngine<T>,
        now: Instant,
    ) -> ServiceResult<SyncReport> {
        self.tracker.resolve(now);
        self.sync(engine)
    }

    /// All cached entries, newest first.
    pub fn entries(&self) -> ServiceResult<Vec<WorkspaceEntry>> {
        let mut thoughts = self.cache.read_thoughts()?;
        thoughts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(thoughts
            .iter()
            .map(WorkspaceEntry::from_thought)
            .collect())
    }

    /// Case-insensitive cache search over titles, content and user tags.
    pub fn search_cached(&self, query: &str) -> ServiceResult<Vec<WorkspaceEntry>> {
        let entries = self.entries()?;
        Ok(entries
            .into_iter()
            .filter(|entry| matches_query(&entry.thought, query))
            .collect())
    }

    /// Entry counts per collection, in display order.
    pub fn counts(&self) -> ServiceResult<Vec<(CollectionId, usize)>> {
        Ok(collection_counts(&self.entries()?))
    }

    pub fn indicator(&self) -> SyncIndicator {
        self.tracker.indicator()
    }

    /// Advances the indicator state machine.
    pub fn tick(&mut self, now: Instant) -> SyncIndicator {
        self.tracker.tick(now)
    }

    fn require_cached(&self, id: &str) -> ServiceResult<Thought> {
        let thoughts = self.cache.read_thoughts()?;
        thoughts
            .into_iter()
            .find(|thought| thought.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Stages a patch locally: cache write, pending-log entry, indicator.
    fn stage_local(&mut self, existing: &Thought, patch: &ThoughtPatch) -> ServiceResult<Thought> {
        let local = apply_thought_update(existing, patch, self.clock.as_ref())?;
        self.cache.upsert_thought(&local)?;
        self.cache.append_pending(PendingChangeKind::Upsert, &local)?;
        self.tracker
            .mark_mutation(MutationSource::Edit, Instant::now());
        Ok(local)
    }

    /// Folds the repository's answer back into the cache; a failure keeps
    /// the staged local copy and flags the indicator.
    fn finish_remote(
        &mut self,
        event: &'static str,
        local: Thought,
        remote: RepoResult<Thought>,
    ) -> ServiceResult<WorkspaceEntry> {
        let cached = match remote {
            Ok(remote) => {
                self.cache.upsert_thought(&remote)?;
                remote
            }
            Err(err) => {
                warn!(
                    "event={event} status=local_only id={id} error={err}",
                    id = local.id
                );
                self.tracker.mark_failure();
                local
            }
        };
        Ok(WorkspaceEntry::from_thought(&cached))
    }
}

/// Derives a title from the first content line; lines longer than
/// [`MAX_DERIVED_TITLE_CHARS`] defer to the default title.
fn derive_title(content: &str) -> Option<String> {
    let first_line = content.lines().next().unwrap_or("").trim();
    if first_line.is_empty() || first_line.chars().count() > MAX_DERIVED_TITLE_CHARS {
        return None;
    }
    Some(first_line.to_string())
}

fn capture_metadata(focus: bool, project: bool, user_tags: &[String]) -> WorkspaceMetadata {
    let status = if focus {
        WorkspaceStatus::Now
    } else {
        WorkspaceStatus::Inbox
    };
    let collection = if project {
        CollectionId::Projects
    } else if focus {
        CollectionId::DailyReview
    } else {
        CollectionId::Inbox
    };
    let energy = if user_tags.iter().any(|tag| tag == "focus") {
        EnergyLevel::High
    } else {
        EnergyLevel::Medium
    };
    let momentum = if status == WorkspaceStatus::Now {
        Momentum::Flow
    } else {
        Momentum::Steady
    };

    WorkspaceMetadata {
        collection,
        status,
        energy,
        momentum,
    }
}

#[cfg(test)]
mod tests {
    use super::derive_title;

    #[test]
    fn title_comes_from_first_line_when_short_enough() {
        assert_eq!(
            derive_title("Ship the draft\nmore detail"),
            Some("Ship the draft".to_string())
        );
        assert_eq!(derive_title("\nstarts on second line"), None);
        assert_eq!(derive_title(&"x".repeat(73)), None);
    }
}
