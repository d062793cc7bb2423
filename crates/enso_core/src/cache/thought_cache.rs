//! Thought cache over a [`KeyValueStore`].
//!
//! # Responsibility
//! - Persist the local thought list, the sync cursor, the pending-change
//!   log and the device client id under versioned keys.
//!
//! # Invariants
//! - Reads never fail on corrupt payloads: a value that does not parse is
//!   treated as absent and overwritten by the next write; a single bad
//!   entry inside a list is skipped, the rest survive.
//! - Every cache mutation that must reach the server is recorded in the
//!   pending log until a sync run clears it.
//!
//! # See also
//! - crate::sync::engine

use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

use super::store::{KeyValueStore, StoreError};
use crate::model::thought::Thought;
use crate::runtime::IdGenerator;

/// Key holding the serialized thought list.
pub const THOUGHTS_KEY: &str = "enso.cache.thoughts.v1";

/// Key holding the opaque sync cursor.
pub const CURSOR_KEY: &str = "enso.cache.cursor.v1";

/// Key holding the pending-change log.
pub const PENDING_KEY: &str = "enso.cache.pending.v1";

/// Key holding the device client id, stored as a raw string.
pub const CLIENT_ID_KEY: &str = "enso.sync.client_id";

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Store(StoreError),
    Encode(serde_json::Error),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "cache store error: {err}"),
            Self::Encode(err) => write!(f, "cache encode error: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err)
    }
}

/// Kind of local mutation awaiting upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingChangeKind {
    Upsert,
    Delete,
}

/// One entry of the pending-change log.
///
/// Deletes carry the full record as it looked when removed, so retries
/// and server-side reconciliation have the final stamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub kind: PendingChangeKind,
    pub thought: Thought,
}

/// Cache facade over a [`KeyValueStore`].
pub struct ThoughtCache<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ThoughtCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Reads the cached thought list, skipping entries that fail to parse.
    pub fn read_thoughts(&self) -> CacheResult<Vec<Thought>> {
        let Some(raw) = self.store.read(THOUGHTS_KEY)? else {
            return Ok(Vec::new());
        };
        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("event=cache_read key={THOUGHTS_KEY} status=reset error={err}");
                return Ok(Vec::new());
            }
        };

        let mut thoughts = Vec::with_capacity(entries.len());
        for entry in entries {
            let parsed = serde_json::from_value::<Thought>(entry)
                .map_err(|err| err.to_string())
                .and_then(|thought| thought.normalized().map_err(|err| err.to_string()));
            match parsed {
                Ok(thought) => thoughts.push(thought),
                Err(err) => {
                    warn!("event=cache_read key={THOUGHTS_KEY} status=skip_entry error={err}")
                }
            }
        }
        Ok(thoughts)
    }

    pub fn write_thoughts(&mut self, thoughts: &[Thought]) -> CacheResult<()> {
        let raw = serde_json::to_string(thoughts)?;
        self.store.write(THOUGHTS_KEY, &raw)?;
        Ok(())
    }

    /// Inserts or replaces one thought; new records go to the front.
    pub fn upsert_thought(&mut self, thought: &Thought) -> CacheResult<()> {
        let mut thoughts = self.read_thoughts()?;
        match thoughts.iter_mut().find(|existing| existing.id == thought.id) {
            Some(existing) => *existing = thought.clone(),
            None => thoughts.insert(0, thought.clone()),
        }
        self.write_thoughts(&thoughts)
    }

    /// Removes one thought, returning the snapshot that was cached.
    ///
    /// References to the removed id are stripped from remaining `links`
    /// without touching their stamps.
    pub fn remove_thought(&mut self, id: &str) -> CacheResult<Option<Thought>> {
        let mut thoughts = self.read_thoughts()?;
        let position = thoughts.iter().position(|thought| thought.id == id);
        let Some(position) = position else {
            return Ok(None);
        };

        let snapshot = thoughts.remove(position);
        for thought in &mut thoughts {
            thought.links.retain(|link| link != id);
        }
        self.write_thoughts(&thoughts)?;
        Ok(Some(snapshot))
    }

    /// Reads the sync cursor; a malformed value reads as absent.
    pub fn read_cursor(&self) -> CacheResult<Option<String>> {
        let Some(raw) = self.store.read(CURSOR_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<String>(&raw) {
            Ok(cursor) => Ok(Some(cursor)),
            Err(err) => {
                warn!("event=cache_read key={CURSOR_KEY} status=reset error={err}");
                Ok(None)
            }
        }
    }

    /// Stores the cursor; `None` clears it, forcing the next sync to be
    /// a full resync.
    pub fn write_cursor(&mut self, cursor: Option<&str>) -> CacheResult<()> {
        match cursor {
            Some(cursor) => {
                let raw = serde_json::to_string(cursor)?;
                self.store.write(CURSOR_KEY, &raw)?;
            }
            None => self.store.delete(CURSOR_KEY)?,
        }
        Ok(())
    }

    /// Reads the pending-change log, skipping entries that fail to parse.
    pub fn read_pending(&self) -> CacheResult<Vec<PendingChange>> {
        let Some(raw) = self.store.read(PENDING_KEY)? else {
            return Ok(Vec::new());
        };
        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("event=cache_read key={PENDING_KEY} status=reset error={err}");
                return Ok(Vec::new());
            }
        };

        let mut pending = Vec::with_capacity(entries.len());
        for entry in entries {
            let parsed = serde_json::from_value::<PendingChange>(entry)
                .map_err(|err| err.to_string())
                .and_then(|change| {
                    change
                        .thought
                        .normalized()
                        .map(|thought| PendingChange {
                            kind: change.kind,
                            thought,
                        })
                        .map_err(|err| err.to_string())
                });
            match parsed {
                Ok(change) => pending.push(change),
                Err(err) => {
                    warn!("event=cache_read key={PENDING_KEY} status=skip_entry error={err}")
                }
            }
        }
        Ok(pending)
    }

    /// Appends one change to the pending log, returning the full log.
    pub fn append_pending(
        &mut self,
        kind: PendingChangeKind,
        thought: &Thought,
    ) -> CacheResult<Vec<PendingChange>> {
        let mut pending = self.read_pending()?;
        pending.push(PendingChange {
            kind,
            thought: thought.clone(),
        });
        self.overwrite_pending(&pending)?;
        Ok(pending)
    }

    pub fn overwrite_pending(&mut self, pending: &[PendingChange]) -> CacheResult<()> {
        let raw = serde_json::to_string(pending)?;
        self.store.write(PENDING_KEY, &raw)?;
        Ok(())
    }

    /// Drops the whole pending log after a successful sync run.
    pub fn clear_pending(&mut self) -> CacheResult<()> {
        self.store.delete(PENDING_KEY)?;
        Ok(())
    }

    /// Returns the stored client id, minting and persisting one when
    /// absent.
    pub fn client_id(&mut self, ids: &dyn IdGenerator) -> CacheResult<String> {
        if let Some(raw) = self.store.read(CLIENT_ID_KEY)? {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
        let minted = ids.client_id();
        self.store.write(CLIENT_ID_KEY, &minted)?;
        Ok(minted)
    }
}
