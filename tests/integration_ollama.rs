#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Ollama client against a mocked HTTP server

use serde_json::json;
use std::time::Duration;
use textbook_rag::config::{ProviderConfig, ProviderKind};
use textbook_rag::providers::{EmbeddingProvider, GenerationProvider, OllamaClient, ProviderError};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    let config = ProviderConfig {
        kind: ProviderKind::Ollama,
        base_url: Some(server.uri()),
        embedding_model: Some("nomic-embed-text:latest".to_string()),
        generation_model: Some("llama3.2:latest".to_string()),
        timeout_seconds: 5,
        ..ProviderConfig::default()
    };
    OllamaClient::new(&config).expect("Failed to create Ollama client")
}

async fn embed_document(
    client: OllamaClient,
    text: &'static str,
) -> Result<Vec<f32>, ProviderError> {
    tokio::task::spawn_blocking(move || client.embed(text))
        .await
        .expect("blocking task completes")
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_sends_document_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "nomic-embed-text:latest",
            "input": "search_document: The margin is wide."
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, -0.25, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let embedding = embed_document(client_for(&server), "The margin is wide.")
        .await
        .expect("embedding succeeds");

    assert_eq!(embedding, vec![0.5, -0.25, 1.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_query_sends_query_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": "search_query: what is C?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let embedding = tokio::task::spawn_blocking(move || client.embed_query("what is C?"))
        .await
        .expect("blocking task completes")
        .expect("embedding succeeds");

    assert_eq!(embedding, vec![1.0, 0.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_disables_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2:latest",
            "prompt": "Say hi",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:latest",
            "response": "Hi!",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let completion = tokio::task::spawn_blocking(move || client.generate("Say hi"))
        .await
        .expect("blocking task completes")
        .expect("generation succeeds");

    assert_eq!(completion, "Hi!");
}

#[tokio::test(flavor = "multi_thread")]
async fn http_failures_map_to_error_kinds() {
    let cases = [
        (429, ProviderError::RateLimited),
        (401, ProviderError::Auth(401)),
        (500, ProviderError::Status(500)),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        let error = embed_document(client_for(&server), "text")
            .await
            .expect_err("request fails");
        assert_eq!(error, expected);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unexpected_bodies_are_malformed() {
    let bodies = [
        json!({"embedding": [1.0, 2.0]}),
        json!({"embeddings": []}),
        json!({"embeddings": [[1.0], [2.0]]}),
        json!({"embeddings": [[]]}),
    ];

    for body in bodies {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let error = embed_document(client_for(&server), "text")
            .await
            .expect_err("body is rejected");
        assert_eq!(error.kind(), "malformed-response");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [[1.0]]}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).with_timeout(Duration::from_millis(200));
    let error = embed_document(client, "text").await.expect_err("call times out");

    assert_eq!(error, ProviderError::Timeout(Duration::from_millis(200)));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_requires_both_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "nomic-embed-text:latest", "size": 274302450},
                {"name": "llama3.2:latest"}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (health, missing) = tokio::task::spawn_blocking(move || {
        (client.health_check(), client.validate_model("mistral:latest"))
    })
    .await
    .expect("blocking task completes");

    assert!(health.is_ok());
    let error = missing.expect_err("mistral is not pulled");
    assert!(error.to_string().contains("mistral:latest"));
}
