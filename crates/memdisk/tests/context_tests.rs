//! Integration tests for context assembly
//!
//! Ordering, reuse of routed content, bypassed routing, inline disks and the
//! per-chunk budget.

use serde_json::json;
use std::collections::BTreeMap;

use memdisk::context::{ChunkPayload, ContextAssembler, InlineDisk};
use memdisk::disk::DiskOrigin;
use memdisk::routing::RoutingResult;
use memdisk::testing::DiskFixture;

#[tokio::test]
async fn test_inline_only_query() {
    let fixture = DiskFixture::new().unwrap();
    let assembler = ContextAssembler::new(fixture.store(), 12_000);

    let context = assembler
        .assemble(
            RoutingResult::no_disks(),
            "hi",
            None,
            &[InlineDisk::new("scratch", json!("hello"))],
        )
        .await;

    assert_eq!(context.chunks.len(), 1);
    assert_eq!(context.chunks[0].source, "scratch");
    assert_eq!(context.chunks[0].origin, DiskOrigin::Inline);
    assert_eq!(context.chunks[0].payload, ChunkPayload::Full(json!("hello")));
    assert_eq!(context.routing.inline_disk_names(), ["scratch"]);
}

#[tokio::test]
async fn test_routed_content_is_reused_without_reloading() {
    let fixture = DiskFixture::new().unwrap();
    let assembler = ContextAssembler::new(fixture.store(), 12_000);

    // Nothing on disk: content must come from the routing result
    let mut loaded = BTreeMap::new();
    loaded.insert("a.dsk".to_string(), json!({"persona": "A"}));
    loaded.insert("b.dsk".to_string(), json!({"persona": "B"}));
    let routing = RoutingResult::selected(vec!["b.dsk".into(), "a.dsk".into()], "both", loaded);

    let context = assembler.assemble(routing, "q", None, &[]).await;

    let sources: Vec<&str> = context.chunks.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, ["b.dsk", "a.dsk"]);
    assert_eq!(context.chunks[0].payload, ChunkPayload::Full(json!({"persona": "B"})));
}

#[tokio::test]
async fn test_bypassed_routing_loads_from_store() {
    let fixture = DiskFixture::new().unwrap();
    fixture.add("a.dsk", &json!({"persona": "A"})).await.unwrap();
    fixture
        .add_encrypted("s.dsk", &json!({"persona": "S"}), "k")
        .await
        .unwrap();
    let assembler = ContextAssembler::new(fixture.store(), 12_000);

    let routing = RoutingResult::bypass(vec!["a.dsk".into(), "missing.dsk".into()]);
    let context = assembler.assemble(routing, "q", None, &[]).await;
    assert_eq!(context.chunks.len(), 1);
    assert_eq!(context.chunks[0].source, "a.dsk");
    assert_eq!(context.chunks[0].origin, DiskOrigin::Persisted);
    assert_eq!(context.routing.relevant_disk_names(), ["a.dsk"]);
    assert_eq!(
        context.routing.loaded_disk("a.dsk"),
        Some(&json!({"persona": "A"}))
    );

    let routing = RoutingResult::bypass(vec!["s.dsk".into()]);
    let context = assembler.assemble(routing, "q", Some("k"), &[]).await;
    assert_eq!(context.chunks[0].payload, ChunkPayload::Full(json!({"persona": "S"})));
}

#[tokio::test]
async fn test_persisted_chunks_precede_inline_chunks() {
    let fixture = DiskFixture::new().unwrap();
    fixture.add("a.dsk", &json!("persisted")).await.unwrap();
    let assembler = ContextAssembler::new(fixture.store(), 12_000);

    let context = assembler
        .assemble(
            RoutingResult::bypass(vec!["a.dsk".into()]),
            "q",
            None,
            &[
                InlineDisk::new("first", json!("1")),
                InlineDisk {
                    name: "skipped".into(),
                    content: None,
                },
                InlineDisk::new("second", json!({"n": 2})),
            ],
        )
        .await;

    let sources: Vec<&str> = context.chunks.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, ["a.dsk", "first", "second"]);
    assert_eq!(context.routing.inline_disk_names(), ["first", "second"]);
}

#[tokio::test]
async fn test_oversized_chunk_is_truncated_to_budget() {
    let fixture = DiskFixture::new().unwrap();
    let assembler = ContextAssembler::new(fixture.store(), 50);
    let big = json!({"knowledge": "x".repeat(500)});
    let small = json!("short");

    let context = assembler
        .assemble(
            RoutingResult::no_disks(),
            "q",
            None,
            &[
                InlineDisk::new("big", big.clone()),
                InlineDisk::new("small", small.clone()),
            ],
        )
        .await;

    match &context.chunks[0].payload {
        ChunkPayload::Truncated { preview, truncated } => {
            assert!(*truncated);
            assert_eq!(preview.chars().count(), 50);
            assert!(big.to_string().starts_with(preview.as_str()));
        }
        other => panic!("expected truncation, got {other:?}"),
    }
    assert_eq!(context.chunks[1].payload, ChunkPayload::Full(small));
}

#[tokio::test]
async fn test_budget_applies_per_chunk_not_in_total() {
    let fixture = DiskFixture::new().unwrap();
    let assembler = ContextAssembler::new(fixture.store(), 10);
    let inline: Vec<InlineDisk> = (0..5)
        .map(|i| InlineDisk::new(format!("d{i}"), json!("0123456789")))
        .collect();

    let context = assembler
        .assemble(RoutingResult::no_disks(), "q", None, &inline)
        .await;

    assert_eq!(context.chunks.len(), 5);
    assert!(context.chunks.iter().all(|c| !c.payload.is_truncated()));
}
