//! Sync engine.
//!
//! # Responsibility
//! - Run one exchange: upload the full pending log with the saved
//!   cursor, merge the server's changes into the cache, then persist the
//!   new cursor and clear the log.
//!
//! # Invariants
//! - Merge is last-writer-wins per record: an incoming record replaces
//!   the local one iff its `updated_at` is greater or equal; ties go to
//!   the server.
//! - On any failure the cache, cursor and pending log are left exactly
//!   as they were, so the next run retries the same changes.
//! - Every incoming payload is validated before anything is applied; one
//!   bad payload rejects the whole batch.
//!
//! # See also
//! - crate::cache::thought_cache

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

use super::protocol::{IncomingChange, SyncRequestBody, SyncThoughtPayload};
use super::transport::{SyncTransport, TransportError};
use crate::cache::store::KeyValueStore;
use crate::cache::thought_cache::{CacheError, ThoughtCache};
use crate::model::thought::{Thought, ValidationError};

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    Transport(TransportError),
    Cache(CacheError),
    InvalidChange(ValidationError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "sync transport failed: {err}"),
            Self::Cache(err) => write!(f, "sync cache access failed: {err}"),
            Self::InvalidChange(err) => write!(f, "server change failed validation: {err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Cache(err) => Some(err),
            Self::InvalidChange(err) => Some(err),
        }
    }
}

impl From<CacheError> for SyncError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

/// Engine-side view of the last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
    Conflict,
}

/// Outcome of one successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub cursor: String,
    pub upserted: usize,
    pub removed: usize,
    /// The server truncated its change list; another exchange would
    /// fetch the rest. Never acted on automatically.
    pub has_more: bool,
}

pub struct SyncEngine<T: SyncTransport> {
    transport: T,
    client_id: String,
    state: SyncState,
}

impl<T: SyncTransport> SyncEngine<T> {
    pub fn new(transport: T, client_id: &str) -> Self {
        Self {
            transport,
            client_id: client_id.to_string(),
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Runs one exchange against `cache`.
    ///
    /// Failures leave every cache key untouched; the pending log is only
    /// cleared after the merged thoughts and new cursor are written.
    pub fn sync_once<S: KeyValueStore>(
        &mut self,
        cache: &mut ThoughtCache<S>,
    ) -> SyncResult<SyncReport> {
        self.state = SyncState::Syncing;
        info!(
            "event=sync_run status=start client_id={client_id}",
            client_id = self.client_id
        );

        match self.run_exchange(cache) {
            Ok(report) => {
                self.state = SyncState::Idle;
                info!(
                    "event=sync_run status=ok upserted={upserted} removed={removed} has_more={has_more}",
                    upserted = report.upserted,
                    removed = report.removed,
                    has_more = report.has_more
                );
                Ok(report)
            }
            Err(err) => {
                self.state = SyncState::Conflict;
                warn!("event=sync_run status=error error={err}");
                Err(err)
            }
        }
    }

    fn run_exchange<S: KeyValueStore>(
        &self,
        cache: &mut ThoughtCache<S>,
    ) -> SyncResult<SyncReport> {
        let pending = cache.read_pending()?;
        let since = cache.read_cursor()?;
        let request = SyncRequestBody {
            client_id: self.client_id.clone(),
            since,
            changes: pending.iter().map(SyncThoughtPayload::from_pending).collect(),
        };

        let response = self
            .transport
            .exchange(&request)
            .map_err(SyncError::Transport)?;

        let mut incoming = Vec::with_capacity(response.changes.len());
        for payload in response.changes {
            incoming.push(payload.into_incoming().map_err(SyncError::InvalidChange)?);
        }

        let mut thoughts = cache.read_thoughts()?;
        let mut upserted = 0usize;
        let mut removed = 0usize;
        for change in incoming {
            match change {
                IncomingChange::Upsert(thought) => {
                    if merge_upsert(&mut thoughts, thought) {
                        upserted += 1;
                    }
                }
                IncomingChange::Tombstone { id, stamp } => {
                    if apply_tombstone(&mut thoughts, &id, stamp) {
                        removed += 1;
                    }
                }
            }
        }

        cache.write_thoughts(&thoughts)?;
        cache.write_cursor(Some(&response.cursor))?;
        cache.clear_pending()?;

        Ok(SyncReport {
            cursor: response.cursor,
            upserted,
            removed,
            has_more: response.has_more,
        })
    }
}

fn merge_upsert(thoughts: &mut Vec<Thought>, incoming: Thought) -> bool {
    match thoughts.iter_mut().find(|local| local.id == incoming.id) {
        Some(local) => {
            if incoming.updated_at >= local.updated_at {
                *local = incoming;
                true
            } else {
                false
            }
        }
        None => {
            thoughts.push(incoming);
            true
        }
    }
}

fn apply_tombstone(thoughts: &mut Vec<Thought>, id: &str, stamp: DateTime<Utc>) -> bool {
    let mut dropped = false;
    if let Some(position) = thoughts.iter().position(|local| local.id == id) {
        if thoughts[position].updated_at > stamp {
            return false;
        }
        thoughts.remove(position);
        dropped = true;
    }
    for thought in thoughts.iter_mut() {
        thought.links.retain(|link| link != id);
    }
    dropped
}
