//! Repository seam and in-memory implementation.
//!
//! # Responsibility
//! - Define the CRUD-and-links contract every thought backend satisfies.
//! - Provide the reference in-memory implementation used by tests and
//!   offline sessions.
//!
//! # Invariants
//! - `list` orders by `updated_at` descending; equal stamps keep
//!   insertion order.
//! - `link`/`unlink` that change nothing return the record untouched,
//!   without bumping `updated_at`.
//! - `remove` strips the removed id from every other record's links and
//!   bumps those records' stamps.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::model::thought::{
    apply_thought_update, matches_query, normalize_thought, Thought, ThoughtDraft, ThoughtId,
    ThoughtPatch, ValidationError,
};
use crate::runtime::{Clock, IdGenerator, SystemClock, UuidIdGenerator};

pub type RepoResult<T> = Result<T, RepositoryError>;

#[derive(Debug)]
pub enum RepositoryError {
    Validation(ValidationError),
    NotFound(ThoughtId),
    Http { status: u16, body: String },
    Transport(String),
    InvalidData(String),
}

impl Display for RepositoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "thought {id} not found"),
            Self::Http { status, body } => write!(f, "http status {status}: {body}"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::InvalidData(message) => write!(f, "invalid repository data: {message}"),
        }
    }
}

impl Error for RepositoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepositoryError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

/// Storage backend for thoughts.
///
/// Implementations validate through the same model helpers, so a caller
/// sees identical semantics against memory or HTTP.
pub trait ThoughtRepository {
    fn create(&mut self, draft: ThoughtDraft) -> RepoResult<Thought>;
    fn update(&mut self, id: &str, patch: ThoughtPatch) -> RepoResult<Thought>;
    fn get(&self, id: &str) -> RepoResult<Option<Thought>>;
    fn list(&self) -> RepoResult<Vec<Thought>>;
    fn search(&self, query: &str) -> RepoResult<Vec<Thought>>;
    fn link(&mut self, source: &str, target: &str) -> RepoResult<Thought>;
    fn unlink(&mut self, source: &str, target: &str) -> RepoResult<Thought>;
    fn remove(&mut self, id: &str) -> RepoResult<()>;
}

/// Vec-backed repository; insertion order is the tie-breaker for sorts.
pub struct InMemoryThoughtRepository {
    thoughts: Vec<Thought>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryThoughtRepository {
    pub fn new() -> Self {
        Self::with_runtime(Arc::new(SystemClock), Arc::new(UuidIdGenerator))
    }

    pub fn with_runtime(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            thoughts: Vec::new(),
            clock,
            ids,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.thoughts.iter().position(|thought| thought.id == id)
    }

    fn require_position(&self, id: &str) -> RepoResult<usize> {
        self.position(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    fn sorted_desc(&self, mut thoughts: Vec<Thought>) -> Vec<Thought> {
        thoughts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        thoughts
    }
}

impl Default for InMemoryThoughtRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ThoughtRepository for InMemoryThoughtRepository {
    fn create(&mut self, draft: ThoughtDraft) -> RepoResult<Thought> {
        let thought = normalize_thought(draft, self.clock.as_ref(), self.ids.as_ref())?;
        match self.position(&thought.id) {
            Some(position) => self.thoughts[position] = thought.clone(),
            None => self.thoughts.push(thought.clone()),
        }
        Ok(thought)
    }

    fn update(&mut self, id: &str, patch: ThoughtPatch) -> RepoResult<Thought> {
        let position = self.require_position(id)?;
        let updated = apply_thought_update(&self.thoughts[position], &patch, self.clock.as_ref())?;
        self.thoughts[position] = updated.clone();
        Ok(updated)
    }

    fn get(&self, id: &str) -> RepoResult<Option<Thought>> {
        Ok(self.position(id).map(|position| self.thoughts[position].clone()))
    }

    fn list(&self) -> RepoResult<Vec<Thought>> {
        Ok(self.sorted_desc(self.thoughts.clone()))
    }

    fn search(&self, query: &str) -> RepoResult<Vec<Thought>> {
        if query.trim().is_empty() {
            return self.list();
        }
        let matches = self
            .thoughts
            .iter()
            .filter(|thought| matches_query(thought, query))
            .cloned()
            .collect();
        Ok(self.sorted_desc(matches))
    }

    fn link(&mut self, source: &str, target: &str) -> RepoResult<Thought> {
        if source == target {
            return Err(ValidationError::SelfLink(source.to_string()).into());
        }
        let source_position = self.require_position(source)?;
        self.require_position(target)?;

        let existing = &self.thoughts[source_position];
        if existing.links.iter().any(|link| link == target) {
            return Ok(existing.clone());
        }

        let mut links = existing.links.clone();
        links.push(target.to_string());
        let patch = ThoughtPatch {
            links: Some(links),
            ..ThoughtPatch::default()
        };
        let updated = apply_thought_update(existing, &patch, self.clock.as_ref())?;
        self.thoughts[source_position] = updated.clone();
        Ok(updated)
    }

    fn unlink(&mut self, source: &str, target: &str) -> RepoResult<Thought> {
        let source_position = self.require_position(source)?;

        let existing = &self.thoughts[source_position];
        if !existing.links.iter().any(|link| link == target) {
            return Ok(existing.clone());
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
        let updated = apply_thought_update(existing, &patch, self.clock.as_ref())?;
        self.thoughts[source_position] = updated.clone();
        Ok(updated)
    }

    fn remove(&mut self, id: &str) -> RepoResult<()> {
        let Some(position) = self.position(id) else {
            return Ok(());
        };
        self.thoughts.remove(position);

        for index in 0..self.thoughts.len() {
            if !self.thoughts[index].links.iter().any(|link| link == id) {
                continue;
            }
            let links = self.thoughts[index]
                .links
                .iter()
                .filter(|link| link.as_str() != id)
                .cloned()
                .collect();
            let patch = ThoughtPatch {
                links: Some(links),
                ..ThoughtPatch::default()
            };
            let updated =
                apply_thought_update(&self.thoughts[index], &patch, self.clock.as_ref())?;
            self.thoughts[index] = updated;
        }
        Ok(())
    }
}
