//! Sync protocol, transport and engine.

pub mod engine;
pub mod protocol;
pub mod status;
pub mod transport;

pub use engine::{SyncEngine, SyncError, SyncReport, SyncResult, SyncState};
pub use protocol::{IncomingChange, SyncRequestBody, SyncResponseBody, SyncThoughtPayload};
pub use status::{
    MutationSource, SyncIndicator, SyncStatusTracker, CAPTURE_SETTLE, EDIT_SETTLE, RESOLVE_SETTLE,
};
pub use transport::{HttpSyncTransport, SyncTransport, TransportError, TransportResult};
