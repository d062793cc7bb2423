//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `enso_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use enso_core::{
    CaptureInput, InMemoryThoughtRepository, MemoryKeyValueStore, ThoughtCache, ThoughtService,
};

fn main() {
    println!("enso_core ping={}", enso_core::ping());
    println!("enso_core version={}", enso_core::core_version());

    let cache = ThoughtCache::new(MemoryKeyValueStore::new());
    let mut service = ThoughtService::new(InMemoryThoughtRepository::new(), cache);
    match service.capture(CaptureInput {
        content: "Smoke capture from the CLI probe".to_string(),
        ..CaptureInput::default()
    }) {
        Ok(entry) => println!(
            "capture title={title} collection={collection}",
            title = entry.thought.title,
            collection = entry.metadata.collection.as_str()
        ),
        Err(err) => eprintln!("capture failed: {err}"),
    }
}
