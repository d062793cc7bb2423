//! Injectable runtime collaborators.
//!
//! # Responsibility
//! - Abstract the ambient environment (wall clock, id generation) behind
//!   traits so every layer can run against deterministic test doubles.
//!
//! # Invariants
//! - Generated thought ids start with [`THOUGHT_ID_PREFIX`], client ids
//!   with [`CLIENT_ID_PREFIX`].
//! - Id generators never return the same value twice.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Prefix of every generated thought id.
pub const THOUGHT_ID_PREFIX: &str = "th_";

/// Prefix of every generated sync client id.
pub const CLIENT_ID_PREFIX: &str = "enso-";

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Source of fresh identifiers.
pub trait IdGenerator: Send + Sync {
    /// Mints an id for a new thought.
    fn thought_id(&self) -> String;

    /// Mints an id identifying this device to the sync endpoint.
    fn client_id(&self) -> String;
}

/// Wall-clock [`Clock`] used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// UUID-backed [`IdGenerator`] used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn thought_id(&self) -> String {
        format!("{THOUGHT_ID_PREFIX}{}", Uuid::new_v4().simple())
    }

    fn client_id(&self) -> String {
        let raw = Uuid::new_v4().simple().to_string();
        format!("{CLIENT_ID_PREFIX}{}", &raw[..8])
    }
}
