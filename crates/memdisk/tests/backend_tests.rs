//! Integration tests for the local and hosted backends
//!
//! Model servers are stood up with wiremock; each test checks the request
//! shape as well as how the response is interpreted.

use serde_json::json;
use std::sync::Arc;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use memdisk::backend::{
    ActiveModel, Backend, BackendError, Dispatcher, GenerationOptions, HostedBackend,
    LocalBackend, LocalMode, TextGenerator,
};
use memdisk::config::{HostedBackendConfig, LocalBackendConfig};
use memdisk::context::{AssembledContext, ChunkPayload, ContextChunk};
use memdisk::disk::DiskOrigin;
use memdisk::routing::RoutingResult;

fn local_config(server: &MockServer) -> LocalBackendConfig {
    LocalBackendConfig {
        endpoint: server.uri(),
        ..LocalBackendConfig::default()
    }
}

fn hosted_config(server: &MockServer) -> HostedBackendConfig {
    HostedBackendConfig {
        api_url: server.uri(),
        api_key_env: "MEMDISK_TEST_HOSTED_KEY_NEVER_SET".into(),
        ..HostedBackendConfig::default()
    }
}

fn sample_context() -> AssembledContext {
    AssembledContext {
        prompt: "Where should I travel?".into(),
        chunks: vec![ContextChunk {
            source: "travel.dsk".into(),
            origin: DiskOrigin::Persisted,
            payload: ChunkPayload::Full(json!({"persona": "Travel planner"})),
        }],
        routing: RoutingResult::no_disks(),
    }
}

// =============================================================================
// Local backend
// =============================================================================

mod local_backend_tests {
    use super::*;

    #[tokio::test]
    async fn test_streamed_fragments_are_concatenated() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"model\":\"gemma:2b\",\"response\":\"Try \",\"done\":false}\n",
            "{\"model\":\"gemma:2b\",\"response\":\"Lisbon.\",\"done\":false}\n",
            "{\"model\":\"gemma:2b\",\"response\":\"\",\"done\":true}\n",
        );
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/generate"))
            .and(matchers::body_partial_json(json!({
                "model": "gemma:2b",
                "prompt": "hello",
                "stream": true,
                "options": {"num_predict": 64}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let backend = LocalBackend::new(&local_config(&server), LocalMode::Live).unwrap();
        let options = GenerationOptions {
            max_tokens: 64,
            temperature: 0.4,
        };
        let out = backend.generate("hello", "gemma:2b", &options).await.unwrap();
        assert_eq!(out, "Try Lisbon.");
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let backend = LocalBackend::new(&local_config(&server), LocalMode::Live).unwrap();
        let err = backend
            .generate("hello", "missing", &GenerationOptions::default())
            .await
            .unwrap_err();

        match err {
            BackendError::Api { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "model not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_renders_persona_and_memories() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\":\"ok\"}\n"))
            .mount(&server)
            .await;

        let backend = LocalBackend::new(&local_config(&server), LocalMode::Live).unwrap();
        backend.send(&sample_context(), "gemma:2b").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.starts_with("You are the MemDisk assistant."));
        assert!(prompt.contains("User Prompt:\nWhere should I travel?"));
        assert!(prompt.contains("Memory 1: (travel.dsk)"));
        assert!(prompt.contains("Travel planner"));
    }

    #[tokio::test]
    async fn test_mock_mode_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let backend = LocalBackend::new(&local_config(&server), LocalMode::Mock).unwrap();
        let out = backend.send(&sample_context(), "gemma:2b").await.unwrap();
        assert!(out.starts_with("[[MOCK LLM]] "));
        assert!(out.contains("Travel planner"));
    }
}

// =============================================================================
// Hosted backend
// =============================================================================

mod hosted_backend_tests {
    use super::*;

    #[tokio::test]
    async fn test_two_message_exchange_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/chat/completions"))
            .and(matchers::header("Authorization", "Bearer test-key"))
            .and(matchers::body_partial_json(json!({"model": "openrouter/auto"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "Go to Porto."}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HostedBackend::new(&hosted_config(&server))
            .unwrap()
            .with_api_key("test-key");
        let out = backend
            .send(&sample_context(), "openrouter/auto")
            .await
            .unwrap();
        assert_eq!(out, "Go to Porto.");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert!(messages[1]["content"]
            .as_str()
            .unwrap()
            .contains("Memory 1: (travel.dsk)"));
    }

    #[tokio::test]
    async fn test_no_chunks_sends_placeholder() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "fine"}}]
            })))
            .mount(&server)
            .await;

        let backend = HostedBackend::new(&hosted_config(&server))
            .unwrap()
            .with_api_key("k");
        let mut context = sample_context();
        context.chunks.clear();
        backend.send(&context, "m").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("(no memory disks were loaded for this query)"));
    }

    #[tokio::test]
    async fn test_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = HostedBackend::new(&hosted_config(&server))
            .unwrap()
            .with_api_key("k");
        let err = backend.send(&sample_context(), "m").await.unwrap_err();
        assert!(matches!(err, BackendError::EmptyCompletion));
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = HostedBackend::new(&hosted_config(&server)).unwrap();
        let err = backend.send(&sample_context(), "m").await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::MissingCredential { ref var } if var == "MEMDISK_TEST_HOSTED_KEY_NEVER_SET"
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HostedBackend::new(&hosted_config(&server))
            .unwrap()
            .with_api_key("k");
        let err = backend.send(&sample_context(), "m").await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 429, .. }));
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

mod dispatcher_tests {
    use super::*;

    #[tokio::test]
    async fn test_model_switch_applies_to_next_send() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\":\"ok\"}"))
            .mount(&server)
            .await;

        let backend: Arc<dyn Backend> =
            Arc::new(LocalBackend::new(&local_config(&server), LocalMode::Live).unwrap());
        let dispatcher = Dispatcher::new(backend, ActiveModel::new("gemma:2b"));

        dispatcher.send(&sample_context()).await.unwrap();
        dispatcher.set_model("llama3");
        dispatcher.send(&sample_context()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let models: Vec<String> = requests
            .iter()
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["model"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(models, vec!["gemma:2b".to_string(), "llama3".to_string()]);
    }
}
