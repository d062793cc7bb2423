//! Sync exchange payloads.
//!
//! # Responsibility
//! - Define the request/response bodies of the sync endpoint and the
//!   conversions between pending-change entries, wire payloads and
//!   validated incoming changes.
//!
//! # Invariants
//! - Timestamps travel as RFC 3339 strings with millisecond precision.
//! - A payload carrying `deleted_at` is a tombstone; its `updated_at` is
//!   the deletion stamp used for conflict decisions.

use serde::{Deserialize, Serialize};

use crate::cache::thought_cache::{PendingChange, PendingChangeKind};
use crate::model::thought::{
    format_timestamp, parse_timestamp, Thought, ThoughtId, ValidationError,
};

/// Body POSTed to the sync endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequestBody {
    pub client_id: String,
    /// Cursor from the previous exchange; absent forces a full resync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    pub changes: Vec<SyncThoughtPayload>,
}

/// Body returned by the sync endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponseBody {
    /// Cursor to persist for the next exchange.
    pub cursor: String,
    #[serde(default)]
    pub changes: Vec<SyncThoughtPayload>,
    /// Set when the server truncated the change list; the caller decides
    /// whether to exchange again.
    #[serde(default)]
    pub has_more: bool,
}

/// One thought on the wire, shared by both directions of the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncThoughtPayload {
    pub id: ThoughtId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<ThoughtId>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl SyncThoughtPayload {
    /// Encodes one pending-change entry for upload.
    pub fn from_pending(change: &PendingChange) -> Self {
        let thought = &change.thought;
        let updated_at = format_timestamp(&thought.updated_at);
        let deleted_at = match change.kind {
            PendingChangeKind::Delete => Some(updated_at.clone()),
            PendingChangeKind::Upsert => None,
        };
        Self {
            id: thought.id.clone(),
            title: thought.title.clone(),
            content: thought.content.clone(),
            tags: thought.tags.clone(),
            links: thought.links.clone(),
            created_at: format_timestamp(&thought.created_at),
            updated_at,
            deleted_at,
        }
    }

    /// Validates a downloaded payload into an applicable change.
    pub fn into_incoming(self) -> Result<IncomingChange, ValidationError> {
        if self.deleted_at.is_some() {
            let stamp = parse_timestamp("updated_at", &self.updated_at)?;
            return Ok(IncomingChange::Tombstone { id: self.id, stamp });
        }

        let created_at = parse_timestamp("created_at", &self.created_at)?;
        let updated_at = parse_timestamp("updated_at", &self.updated_at)?;
        let thought = Thought {
            id: self.id,
            title: self.title,
            content: self.content,
            tags: self.tags,
            links: self.links,
            created_at,
            updated_at,
        };
        Ok(IncomingChange::Upsert(thought.normalized()?))
    }
}

/// A server change after validation, ready to merge into the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingChange {
    Upsert(Thought),
    Tombstone {
        id: ThoughtId,
        stamp: chrono::DateTime<chrono::Utc>,
    },
}
