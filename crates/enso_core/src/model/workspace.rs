//! Workspace metadata embedded in thought tags.
//!
//! # Responsibility
//! - Give the flat tag list a structured in-memory view: collection,
//!   status, energy and momentum live as typed fields on
//!   [`WorkspaceEntry`], not as strings callers must parse.
//! - Encode/decode that metadata to reserved `__enso:` tags so cache and
//!   wire payloads stay compatible with plain tag lists.
//!
//! # Invariants
//! - [`decode_tags`] is total: malformed reserved tags are dropped, never
//!   surfaced as user tags and never an error.
//! - When one facet appears twice, the last occurrence wins.
//! - User-supplied tags never start with the reserved prefix; the
//!   boundary check is [`ensure_user_tags`].
//!
//! # See also
//! - crate::model::thought

use serde::{Deserialize, Serialize};

use crate::model::thought::{normalize_tags, Thought, ValidationError, ValidationResult};

/// Prefix marking a tag as workspace metadata rather than user input.
pub const META_TAG_PREFIX: &str = "__enso:";

/// Fixed triage collections every workspace exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionId {
    Inbox,
    DailyReview,
    Projects,
    Archive,
}

impl CollectionId {
    /// Declared display order, used for counts and navigation.
    pub const ALL: [CollectionId; 4] = [
        CollectionId::Inbox,
        CollectionId::DailyReview,
        CollectionId::Projects,
        CollectionId::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::DailyReview => "daily-review",
            Self::Projects => "projects",
            Self::Archive => "archive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "inbox" => Some(Self::Inbox),
            "daily-review" => Some(Self::DailyReview),
            "projects" => Some(Self::Projects),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::DailyReview => "Daily Review",
            Self::Projects => "Projects",
            Self::Archive => "Archive",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::Inbox => "Fresh captures waiting for triage",
            Self::DailyReview => "Focus blocks for today's loop",
            Self::Projects => "In-flight initiatives and research",
            Self::Archive => "Completed loops and references",
        }
    }
}

/// Triage state of a thought inside its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceStatus {
    Now,
    Inbox,
    Snoozed,
    Archive,
}

impl WorkspaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Inbox => "inbox",
            Self::Snoozed => "snoozed",
            Self::Archive => "archive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "now" => Some(Self::Now),
            "inbox" => Some(Self::Inbox),
            "snoozed" => Some(Self::Snoozed),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }
}

/// Effort the thought is expected to demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    High,
    Medium,
    Low,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// How actively the thought is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Flow,
    Steady,
    Parked,
}

impl Momentum {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Steady => "steady",
            Self::Parked => "parked",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "flow" => Some(Self::Flow),
            "steady" => Some(Self::Steady),
            "parked" => Some(Self::Parked),
            _ => None,
        }
    }
}

/// Structured workspace facets of a single thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub collection: CollectionId,
    pub status: WorkspaceStatus,
    pub energy: EnergyLevel,
    pub momentum: Momentum,
}

impl Default for WorkspaceMetadata {
    fn default() -> Self {
        Self {
            collection: CollectionId::Inbox,
            status: WorkspaceStatus::Inbox,
            energy: EnergyLevel::Medium,
            momentum: Momentum::Steady,
        }
    }
}

/// Outcome of splitting a raw tag list into user tags and metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTags {
    pub user_tags: Vec<String>,
    pub metadata: WorkspaceMetadata,
}

/// Renders metadata as reserved tags, one per facet, in a fixed order.
pub fn encode_metadata(metadata: &WorkspaceMetadata) -> Vec<String> {
    vec![
        format!("{META_TAG_PREFIX}collection:{}", metadata.collection.as_str()),
        format!("{META_TAG_PREFIX}status:{}", metadata.status.as_str()),
        format!("{META_TAG_PREFIX}energy:{}", metadata.energy.as_str()),
        format!("{META_TAG_PREFIX}momentum:{}", metadata.momentum.as_str()),
    ]
}

/// Splits a raw tag list into user tags and decoded metadata.
///
/// Unknown facets and unparseable values are dropped. Records written
/// before the status facet existed carry only a collection tag; for those,
/// an archive collection implies an archive status.
pub fn decode_tags(tags: &[String]) -> DecodedTags {
    let mut user_tags: Vec<String> = Vec::new();
    let mut metadata = WorkspaceMetadata::default();
    let mut status_seen = false;

    for tag in tags {
        let Some(rest) = tag.strip_prefix(META_TAG_PREFIX) else {
            if !user_tags.iter().any(|existing| existing == tag) {
                user_tags.push(tag.clone());
            }
            continue;
        };
        let Some((facet, value)) = rest.split_once(':') else {
            continue;
        };
        match facet {
            "collection" => {
                if let Some(collection) = CollectionId::parse(value) {
                    metadata.collection = collection;
                }
            }
            "status" => {
                if let Some(status) = WorkspaceStatus::parse(value) {
                    metadata.status = status;
                    status_seen = true;
                }
            }
            "energy" => {
                if let Some(energy) = EnergyLevel::parse(value) {
                    metadata.energy = energy;
                }
            }
            "momentum" => {
                if let Some(momentum) = Momentum::parse(value) {
                    metadata.momentum = momentum;
                }
            }
            _ => {}
        }
    }

    if !status_seen && metadata.collection == CollectionId::Archive {
        metadata.status = WorkspaceStatus::Archive;
    }

    DecodedTags {
        user_tags,
        metadata,
    }
}

/// Normalizes tags coming from user input, rejecting reserved collisions.
///
/// Every surface that accepts free-form tags goes through here; internal
/// code paths that re-attach encoded metadata do not.
pub fn ensure_user_tags(tags: &[String]) -> ValidationResult<Vec<String>> {
    let normalized = normalize_tags(tags)?;
    for tag in &normalized {
        if tag.starts_with(META_TAG_PREFIX) {
            return Err(ValidationError::ReservedTag(tag.clone()));
        }
    }
    Ok(normalized)
}

/// A thought paired with its decoded workspace metadata.
///
/// `thought.tags` holds user tags only; [`WorkspaceEntry::to_thought`]
/// re-embeds the metadata for storage and wire use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEntry {
    pub thought: Thought,
    pub metadata: WorkspaceMetadata,
}

impl WorkspaceEntry {
    pub fn from_thought(thought: &Thought) -> Self {
        let decoded = decode_tags(&thought.tags);
        let mut stripped = thought.clone();
        stripped.tags = decoded.user_tags;
        Self {
            thought: stripped,
            metadata: decoded.metadata,
        }
    }

    /// Rebuilds the carrier record with metadata tags appended.
    ///
    /// Infallible: user tags were validated on the way in and encoded
    /// facet tags are well-formed by construction.
    pub fn to_thought(&self) -> Thought {
        let mut carrier = self.thought.clone();
        carrier.tags.extend(encode_metadata(&self.metadata));
        carrier
    }
}

/// Entry counts per collection, in declared collection order.
pub fn collection_counts(entries: &[WorkspaceEntry]) -> Vec<(CollectionId, usize)> {
    CollectionId::ALL
        .iter()
        .map(|collection| {
            let count = entries
                .iter()
                .filter(|entry| entry.metadata.collection == *collection)
                .count();
            (*collection, count)
        })
        .collect()
}
