//! Local-first cache.

pub mod sqlite_store;
pub mod store;
pub mod thought_cache;

pub use sqlite_store::SqliteKeyValueStore;
pub use store::{KeyValueStore, MemoryKeyValueStore, StoreError, StoreResult};
pub use thought_cache::{
    CacheError, CacheResult, PendingChange, PendingChangeKind, ThoughtCache,
};
