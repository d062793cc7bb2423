//! Domain model types.

pub mod thought;
pub mod workspace;

pub use thought::{
    apply_thought_update, format_timestamp, matches_query, normalize_thought, parse_timestamp,
    Thought, ThoughtDraft, ThoughtId, ThoughtPatch, ValidationError, ValidationResult,
    DEFAULT_TITLE, MAX_TAG_CHARS,
};
pub use workspace::{
    collection_counts, decode_tags, encode_metadata, ensure_user_tags, CollectionId, DecodedTags,
    EnergyLevel, Momentum, WorkspaceEntry, WorkspaceMetadata, WorkspaceStatus, META_TAG_PREFIX,
};
