//! Integration tests for the relevance classifier
//!
//! The selection model is scripted, so these cover load failures, the
//! selection contract and every fallback branch.

use serde_json::json;
use std::sync::Arc;

use memdisk::backend::{BackendError, GenerationOptions};
use memdisk::routing::RelevanceClassifier;
use memdisk::testing::{DiskFixture, ScriptedGenerator};

fn classifier(fixture: &DiskFixture, generator: Arc<ScriptedGenerator>) -> RelevanceClassifier {
    RelevanceClassifier::new(
        fixture.store(),
        generator,
        "router-model",
        GenerationOptions::default(),
    )
}

async fn travel_fixture() -> DiskFixture {
    let fixture = DiskFixture::new().unwrap();
    fixture
        .add(
            "a.dsk",
            &json!({"persona": "Travel planner", "skills": ["itineraries"]}),
        )
        .await
        .unwrap();
    fixture
        .add(
            "b.dsk",
            &json!({"persona": "Pastry chef", "skills": ["croissants"]}),
        )
        .await
        .unwrap();
    fixture
}

fn names(list: &[String]) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}

#[tokio::test]
async fn test_model_selection_is_used() {
    let fixture = travel_fixture().await;
    let generator = Arc::new(ScriptedGenerator::replying(
        r#"{"selected":["a.dsk"],"notes":"only a is about travel"}"#,
    ));

    let result = classifier(&fixture, generator.clone())
        .route(
            "Plan my trip",
            &["a.dsk".to_string(), "b.dsk".to_string()],
            None,
        )
        .await
        .unwrap();

    assert_eq!(names(result.relevant_disk_names()), ["a.dsk"]);
    assert_eq!(result.analysis(), "only a is about travel");
    assert_eq!(result.loaded_disks().len(), 2);
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_no_loadable_disks_skips_model() {
    let fixture = DiskFixture::new().unwrap();
    fixture.add_raw("broken.dsk", b"not json").unwrap();
    let generator = Arc::new(ScriptedGenerator::replying("{}"));

    let result = classifier(&fixture, generator.clone())
        .route(
            "anything",
            &["missing.dsk".to_string(), "broken.dsk".to_string()],
            None,
        )
        .await
        .unwrap();

    assert!(result.relevant_disk_names().is_empty());
    assert_eq!(result.analysis(), "No disks available");
    assert!(result.loaded_disks().is_empty());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_empty_candidates_skips_model() {
    let fixture = DiskFixture::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::replying("{}"));

    let result = classifier(&fixture, generator.clone())
        .route("hello", &[], None)
        .await
        .unwrap();

    assert_eq!(result.analysis(), "No disks available");
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_unparseable_answer_falls_back_to_all_loaded() {
    let fixture = travel_fixture().await;
    let raw = "I would pick the travel one, probably.";
    let generator = Arc::new(ScriptedGenerator::replying(raw));

    let result = classifier(&fixture, generator)
        .route(
            "Plan my trip",
            &["a.dsk".to_string(), "missing.dsk".to_string(), "b.dsk".to_string()],
            None,
        )
        .await
        .unwrap();

    assert_eq!(names(result.relevant_disk_names()), ["a.dsk", "b.dsk"]);
    assert_eq!(result.analysis(), raw);
}

#[tokio::test]
async fn test_empty_or_unknown_selection_falls_back() {
    for raw in [
        r#"{"selected": [], "notes": "nothing fits"}"#,
        r#"{"selected": ["ghost.dsk"], "notes": "made up"}"#,
    ] {
        let fixture = travel_fixture().await;
        let generator = Arc::new(ScriptedGenerator::replying(raw));

        let result = classifier(&fixture, generator)
            .route("Plan", &["b.dsk".to_string(), "a.dsk".to_string()], None)
            .await
            .unwrap();

        assert_eq!(names(result.relevant_disk_names()), ["b.dsk", "a.dsk"], "{raw}");
        assert_eq!(result.analysis(), raw);
    }
}

#[tokio::test]
async fn test_generator_failure_is_surfaced() {
    let fixture = travel_fixture().await;
    let generator = Arc::new(ScriptedGenerator::failing("connection refused"));

    let err = classifier(&fixture, generator)
        .route("Plan", &["a.dsk".to_string()], None)
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Request(_)));
}

#[tokio::test]
async fn test_duplicate_candidates_collapse() {
    let fixture = travel_fixture().await;
    let generator = Arc::new(ScriptedGenerator::replying("not json"));

    let result = classifier(&fixture, generator.clone())
        .route(
            "Plan",
            &["a.dsk".to_string(), "a.dsk".to_string(), "b.dsk".to_string()],
            None,
        )
        .await
        .unwrap();

    assert_eq!(names(result.relevant_disk_names()), ["a.dsk", "b.dsk"]);
    let prompt = &generator.prompts()[0];
    assert_eq!(prompt.matches("[a.dsk]").count(), 1);
}

#[tokio::test]
async fn test_catalog_shows_summaries_not_full_content() {
    let fixture = DiskFixture::new().unwrap();
    fixture
        .add(
            "chef.dsk",
            &json!({
                "persona": "Pastry chef",
                "skills": ["lamination"],
                "private_notes": "the secret ingredient is cardamom"
            }),
        )
        .await
        .unwrap();
    let generator = Arc::new(ScriptedGenerator::replying(r#"{"selected":["chef.dsk"]}"#));

    classifier(&fixture, generator.clone())
        .route("Bake something", &["chef.dsk".to_string()], None)
        .await
        .unwrap();

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("[chef.dsk]"));
    assert!(prompt.contains("Pastry chef"));
    assert!(prompt.contains("lamination"));
    assert!(!prompt.contains("cardamom"));
    assert!(prompt.contains("Bake something"));
}

#[tokio::test]
async fn test_encrypted_candidates_need_matching_key() {
    let fixture = DiskFixture::new().unwrap();
    fixture
        .add_encrypted("vault.dsk", &json!({"persona": "Vault"}), "open-sesame")
        .await
        .unwrap();
    let generator = Arc::new(ScriptedGenerator::replying("no json here"));

    let wrong = classifier(&fixture, generator.clone())
        .route("q", &["vault.dsk".to_string()], Some("wrong"))
        .await
        .unwrap();
    assert!(wrong.relevant_disk_names().is_empty());
    assert_eq!(generator.call_count(), 0);

    let right = classifier(&fixture, generator.clone())
        .route("q", &["vault.dsk".to_string()], Some("open-sesame"))
        .await
        .unwrap();
    assert_eq!(names(right.relevant_disk_names()), ["vault.dsk"]);
    assert_eq!(generator.call_count(), 1);
}
