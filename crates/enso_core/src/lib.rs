//! Core domain logic for Enso, a local-first thought workspace.
//! This crate is the single source of truth for business invariants.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod runtime;
pub mod sched;
pub mod service;
pub mod sync;

pub use cache::{
    KeyValueStore, MemoryKeyValueStore, PendingChange, PendingChangeKind, SqliteKeyValueStore,
    ThoughtCache,
};
pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::thought::{
    Thought, ThoughtDraft, ThoughtId, ThoughtPatch, ValidationError, ValidationResult,
};
pub use model::workspace::{
    CollectionId, EnergyLevel, Momentum, WorkspaceEntry, WorkspaceMetadata, WorkspaceStatus,
};
pub use repo::{HttpThoughtRepository, InMemoryThoughtRepository, RepositoryError, ThoughtRepository};
pub use sched::{CancellationToken, Debouncer, SingleFlight};
pub use service::{CaptureInput, ServiceError, ThoughtService};
pub use sync::{
    HttpSyncTransport, SyncEngine, SyncError, SyncIndicator, SyncReport, SyncStatusTracker,
    SyncTransport,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
