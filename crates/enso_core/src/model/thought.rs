//! Thought domain model and validation.
//!
//! # Responsibility
//! - Define the canonical thought record shared by cache, repository and
//!   sync wire codecs.
//! - Normalize drafts and patches into validated records.
//!
//! # Invariants
//! - `updated_at >= created_at` for every validated thought.
//! - Repeated updates to one thought produce strictly increasing
//!   `updated_at` stamps, even under clock skew.
//! - Tags are lowercase, non-empty, at most [`MAX_TAG_CHARS`] characters,
//!   deduplicated preserving first-seen order.
//! - `links` never contains the thought's own id.
//!
//! # See also
//! - crate::model::workspace

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::runtime::{Clock, IdGenerator};

/// Stable identifier for a thought. Opaque to every layer.
pub type ThoughtId = String;

/// Maximum length of a single tag, in characters.
pub const MAX_TAG_CHARS: usize = 32;

/// Title applied when a draft does not provide one.
pub const DEFAULT_TITLE: &str = "Untitled Thought";

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Field-level validation failure raised by normalize/update operations.
///
/// Every variant names the offending field; invalid input is rejected,
/// never truncated or coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyId,
    EmptyTitle,
    EmptyContent,
    EmptyTag,
    OversizedTag(String),
    ReservedTag(String),
    EmptyLink,
    SelfLink(ThoughtId),
    InvalidTimestamp { field: &'static str, value: String },
    CreatedAfterUpdated,
    EmptyPatch,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "id must not be empty"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::EmptyContent => write!(f, "content must not be empty"),
            Self::EmptyTag => write!(f, "tags must not be empty"),
            Self::OversizedTag(tag) => {
                write!(f, "tag `{tag}` exceeds {MAX_TAG_CHARS} characters")
            }
            Self::ReservedTag(tag) => {
                write!(f, "tag `{tag}` collides with the reserved metadata prefix")
            }
            Self::EmptyLink => write!(f, "links must not be empty"),
            Self::SelfLink(id) => write!(f, "thought {id} cannot link to itself"),
            Self::InvalidTimestamp { field, value } => {
                write!(f, "invalid {field} timestamp: `{value}`")
            }
            Self::CreatedAfterUpdated => {
                write!(f, "updated_at must not be earlier than created_at")
            }
            Self::EmptyPatch => write!(f, "update requires at least one field"),
        }
    }
}

impl Error for ValidationError {}

/// Canonical thought record.
///
/// This is the shape persisted in the cache and exchanged over the wire;
/// workspace metadata travels embedded in `tags` (see
/// `crate::model::workspace`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    /// Opaque stable id, generated at creation when absent.
    pub id: ThoughtId,
    pub title: String,
    /// Body text, stored verbatim; must be non-empty after trimming.
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of related thoughts. Never contains `id` itself.
    #[serde(default)]
    pub links: Vec<ThoughtId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thought {
    /// Re-normalizes a record that arrived from storage or the wire.
    ///
    /// Idempotent on already-valid data; fixes tag casing and trims
    /// identifiers, rejecting anything that breaks a hard invariant.
    pub fn normalized(&self) -> ValidationResult<Thought> {
        let id = normalize_id(&self.id)?;
        let title = normalize_title(&self.title)?;
        ensure_content(&self.content)?;
        let tags = normalize_tags(&self.tags)?;
        let links = normalize_links(&self.links, &id)?;
        if self.updated_at < self.created_at {
            return Err(ValidationError::CreatedAfterUpdated);
        }
        Ok(Thought {
            id,
            title,
            content: self.content.clone(),
            tags,
            links,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Unvalidated input for creating a thought.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThoughtDraft {
    pub id: Option<ThoughtId>,
    pub title: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub links: Vec<ThoughtId>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Thought> for ThoughtDraft {
    fn from(thought: Thought) -> Self {
        Self {
            id: Some(thought.id),
            title: Some(thought.title),
            content: thought.content,
            tags: thought.tags,
            links: thought.links,
            created_at: Some(thought.created_at),
            updated_at: Some(thought.updated_at),
        }
    }
}

/// Partial update; unset fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThoughtPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub links: Option<Vec<ThoughtId>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ThoughtPatch {
    /// Returns whether the patch touches no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.links.is_none()
            && self.updated_at.is_none()
    }
}

/// Validates a draft into a canonical thought.
///
/// Assigns a generated id when absent, applies [`DEFAULT_TITLE`] when the
/// title is absent (a provided blank title is rejected), defaults
/// `created_at` to the clock's now and `updated_at` to `created_at`.
pub fn normalize_thought(
    draft: ThoughtDraft,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
) -> ValidationResult<Thought> {
    let id = match draft.id.as_deref() {
        Some(value) => normalize_id(value)?,
        None => ids.thought_id(),
    };
    let title = match draft.title.as_deref() {
        Some(value) => normalize_title(value)?,
        None => DEFAULT_TITLE.to_string(),
    };
    ensure_content(&draft.content)?;
    let tags = normalize_tags(&draft.tags)?;
    let links = normalize_links(&draft.links, &id)?;

    let created_at = draft.created_at.unwrap_or_else(|| clock.now_utc());
    let updated_at = draft.updated_at.unwrap_or(created_at);
    if updated_at < created_at {
        return Err(ValidationError::CreatedAfterUpdated);
    }

    Ok(Thought {
        id,
        title,
        content: draft.content,
        tags,
        links,
        created_at,
        updated_at,
    })
}

/// Merges a patch into a thought, bumping `updated_at` strictly.
///
/// The next stamp is `max(now, patch.updated_at, thought.updated_at + 1ms)`,
/// so the result is strictly newer than the input even when the wall clock
/// stalls or runs backwards.
pub fn apply_thought_update(
    thought: &Thought,
    patch: &ThoughtPatch,
    clock: &dyn Clock,
) -> ValidationResult<Thought> {
    if patch.is_empty() {
        return Err(ValidationError::EmptyPatch);
    }

    let title = match patch.title.as_deref() {
        Some(value) => normalize_title(value)?,
        None => thought.title.clone(),
    };
    let content = match &patch.content {
        Some(value) => {
            ensure_content(value)?;
            value.clone()
        }
        None => thought.content.clone(),
    };
    let tags = match &patch.tags {
        Some(values) => normalize_tags(values)?,
        None => thought.tags.clone(),
    };
    let links = match &patch.links {
        Some(values) => normalize_links(values, &thought.id)?,
        None => thought.links.clone(),
    };

    let mut updated_at = clock
        .now_utc()
        .max(thought.updated_at + Duration::milliseconds(1));
    if let Some(proposed) = patch.updated_at {
        updated_at = updated_at.max(proposed);
    }

    Ok(Thought {
        id: thought.id.clone(),
        title,
        content,
        tags,
        links,
        created_at: thought.created_at,
        updated_at,
    })
}

/// Case-insensitive substring match against title, content or any tag.
///
/// A blank query matches every thought.
pub fn matches_query(thought: &Thought, query: &str) -> bool {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return true;
    }

    thought.title.to_lowercase().contains(&normalized)
        || thought.content.to_lowercase().contains(&normalized)
        || thought.tags.iter().any(|tag| tag.contains(&normalized))
}

/// Parses a persisted or wire timestamp string into UTC.
///
/// Accepts RFC 3339, a space in place of the `T` separator, and a missing
/// zone designator (treated as UTC). Anything else fails with the field
/// name so callers can report where the bad value came from.
pub fn parse_timestamp(field: &'static str, value: &str) -> ValidationResult<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidTimestamp {
            field,
            value: value.to_string(),
        });
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let spaced = trimmed.replacen(' ', "T", 1);
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&spaced) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(&spaced, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(parsed.and_utc());
    }

    Err(ValidationError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

/// Renders a timestamp the way cache payloads and the wire expect it:
/// RFC 3339, millisecond precision, `Z` suffix.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Trims and lowercases one tag, rejecting blank or oversized values.
pub fn normalize_tag(tag: &str) -> ValidationResult<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTag);
    }
    let lowered = trimmed.to_lowercase();
    if lowered.chars().count() > MAX_TAG_CHARS {
        return Err(ValidationError::OversizedTag(lowered));
    }
    Ok(lowered)
}

/// Normalizes a tag list, deduplicating while preserving first-seen order.
pub fn normalize_tags(tags: &[String]) -> ValidationResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = normalize_tag(tag)?;
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    Ok(normalized)
}

fn normalize_links(links: &[ThoughtId], own_id: &str) -> ValidationResult<Vec<ThoughtId>> {
    let mut normalized: Vec<ThoughtId> = Vec::new();
    for link in links {
        let trimmed = link.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyLink);
        }
        if trimmed == own_id {
            return Err(ValidationError::SelfLink(own_id.to_string()));
        }
        if !normalized.iter().any(|existing| existing == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    Ok(normalized)
}

fn normalize_id(id: &str) -> ValidationResult<ThoughtId> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    Ok(trimmed.to_string())
}

fn normalize_title(title: &str) -> ValidationResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn ensure_content(content: &str) -> ValidationResult<()> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}
