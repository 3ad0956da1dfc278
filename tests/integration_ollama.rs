#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Ollama instance with both models pulled
// Run with: cargo test --test integration_ollama -- --ignored

use handbook_rag::config::OllamaConfig;
use handbook_rag::embeddings::{Embedder, OllamaClient, TextGenerator};
use std::env;
use std::time::Duration;
use tracing::info;

fn create_integration_test_client() -> OllamaClient {
    let defaults = OllamaConfig::default();
    let config = OllamaConfig {
        host: env::var("OLLAMA_HOST").unwrap_or(defaults.host),
        port: env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port),
        embedding_model: env::var("OLLAMA_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
        generation_model: env::var("OLLAMA_GENERATION_MODEL")
            .unwrap_or(defaults.generation_model),
        batch_size: 2,
        ..OllamaConfig::default()
    };

    OllamaClient::new(&config)
        .expect("Failed to create Ollama client")
        .with_timeout(Duration::from_secs(120))
        .with_retry_attempts(3)
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
#[ignore = "requires a running Ollama instance"]
fn real_ollama_health_check() {
    init_test_tracing();

    let client = create_integration_test_client();
    let result = client.health_check();

    assert!(
        result.is_ok(),
        "Health check should succeed with local Ollama: {:?}",
        result
    );
}

#[test]
#[ignore = "requires a running Ollama instance"]
fn real_ollama_list_models() {
    init_test_tracing();

    let client = create_integration_test_client();
    let models = client.list_models().expect("should list models");

    info!(
        "Available models: {:?}",
        models.iter().map(|m| &m.name).collect::<Vec<_>>()
    );
    assert!(!models.is_empty(), "at least one model should be pulled");
}

#[test]
#[ignore = "requires a running Ollama instance"]
fn real_ollama_batch_embeddings() {
    init_test_tracing();

    let client = create_integration_test_client();
    let texts = vec![
        "GitLab is an all-remote company.".to_string(),
        "Iteration means shipping the smallest viable change.".to_string(),
        "Transparency is one of the company values.".to_string(),
    ];

    // batch_size 2 splits this into two requests
    let vectors = client
        .generate_embeddings_batch(&texts)
        .expect("should embed batch");

    assert_eq!(vectors.len(), texts.len());
    let dimension = vectors[0].len();
    assert!(dimension >= 100, "embedding should have a realistic size");
    assert!(vectors.iter().all(|v| v.len() == dimension));
}

#[tokio::test]
#[ignore = "requires a running Ollama instance"]
async fn real_ollama_embedder_and_generator() {
    init_test_tracing();

    let client = create_integration_test_client();

    let vector = client
        .embed("What is the paid time off policy?")
        .await
        .expect("should embed query");
    assert!(!vector.is_empty());

    let answer = client
        .generate("Reply with the single word: ready")
        .await
        .expect("should generate");
    info!("Generation returned {:?}", answer);
    assert!(!answer.trim().is_empty());
}

#[test]
#[ignore = "requires a running Ollama instance"]
fn real_ollama_unknown_model_fails() {
    init_test_tracing();

    let config = OllamaConfig {
        embedding_model: "definitely-not-a-model:latest".to_string(),
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config)
        .expect("Failed to create Ollama client")
        .with_retry_attempts(1);

    let result = client.generate_embeddings_batch(&["text".to_string()]);
    assert!(result.is_err());
}
