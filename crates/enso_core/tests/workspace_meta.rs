//! Behavioral tests for the workspace metadata codec.

use chrono::{TimeZone, Utc};

use enso_core::model::thought::Thought;
use enso_core::model::workspace::{
    collection_counts, decode_tags, ensure_user_tags, CollectionId, EnergyLevel, Momentum,
    WorkspaceEntry, WorkspaceMetadata, WorkspaceStatus,
};

fn carrier(tags: &[&str]) -> Thought {
    Thought {
        id: "th_carrier".to_string(),
        title: "Carrier".to_string(),
        content: "body".to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        links: Vec::new(),
        created_at: Utc.with_ymd_and_hms(2025, 9, 27, 7, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 9, 27, 7, 0, 0).unwrap(),
    }
}

#[test]
fn reserved_collection_tag_decodes_next_to_user_tags() {
    let decoded = decode_tags(&[
        "__enso:collection:projects".to_string(),
        "focus".to_string(),
    ]);

    assert_eq!(decoded.metadata.collection, CollectionId::Projects);
    assert_eq!(decoded.user_tags, vec!["focus".to_string()]);
    assert_eq!(decoded.metadata.status, WorkspaceStatus::Inbox);
    assert_eq!(decoded.metadata.energy, EnergyLevel::Medium);
    assert_eq!(decoded.metadata.momentum, Momentum::Steady);
}

#[test]
fn entry_strips_reserved_tags_and_rebuilds_them_in_order() {
    let thought = carrier(&[
        "reading",
        "__enso:collection:daily-review",
        "__enso:status:now",
        "__enso:energy:high",
        "__enso:momentum:flow",
    ]);

    let entry = WorkspaceEntry::from_thought(&thought);
    assert_eq!(entry.thought.tags, vec!["reading".to_string()]);
    assert_eq!(entry.metadata.collection, CollectionId::DailyReview);
    assert_eq!(entry.metadata.status, WorkspaceStatus::Now);

    let rebuilt = entry.to_thought();
    assert_eq!(
        rebuilt.tags,
        vec![
            "reading".to_string(),
            "__enso:collection:daily-review".to_string(),
            "__enso:status:now".to_string(),
            "__enso:energy:high".to_string(),
            "__enso:momentum:flow".to_string(),
        ]
    );

    let round_tripped = WorkspaceEntry::from_thought(&rebuilt);
    assert_eq!(round_tripped, entry);
}

#[test]
fn malformed_reserved_tags_never_surface_as_user_tags() {
    let thought = carrier(&["__enso:collection:attic", "__enso:nonsense", "keep"]);

    let entry = WorkspaceEntry::from_thought(&thought);
    assert_eq!(entry.thought.tags, vec!["keep".to_string()]);
    assert_eq!(entry.metadata, WorkspaceMetadata::default());
}

#[test]
fn user_tag_collision_with_reserved_prefix_is_rejected() {
    let err = ensure_user_tags(&[
        "focus".to_string(),
        "__enso:collection:projects".to_string(),
    ])
    .expect_err("reserved prefix must be rejected at the user boundary");

    assert!(err
        .to_string()
        .contains("collides with the reserved metadata prefix"));
}

#[test]
fn counts_cover_every_collection_in_display_order() {
    let entries: Vec<WorkspaceEntry> = [
        CollectionId::Inbox,
        CollectionId::Inbox,
        CollectionId::Projects,
    ]
    .iter()
    .map(|collection| {
        let mut entry = WorkspaceEntry::from_thought(&carrier(&[]));
        entry.metadata.collection = *collection;
        entry
    })
    .collect();

    let counts = collection_counts(&entries);
    assert_eq!(
        counts,
        vec![
            (CollectionId::Inbox, 2),
            (CollectionId::DailyReview, 0),
            (CollectionId::Projects, 1),
            (CollectionId::Archive, 0),
        ]
    );
}

#[test]
fn collection_labels_and_hints_are_stable() {
    assert_eq!(CollectionId::DailyReview.label(), "Daily Review");
    assert_eq!(CollectionId::DailyReview.as_str(), "daily-review");
    assert_eq!(
        CollectionId::parse("daily-review"),
        Some(CollectionId::DailyReview)
    );
    for collection in CollectionId::ALL {
        assert!(!collection.hint().is_empty());
    }
}
