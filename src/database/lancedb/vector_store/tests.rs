use super::*;
use crate::crawler::domain::PageUrl;
use crate::embeddings::chunking::Chunk;
use tempfile::TempDir;

fn record(path: &str, content: &str, vector: Vec<f32>) -> StoredChunk {
    let url = PageUrl::parse(&format!("https://handbook.gitlab.com{}", path))
        .expect("should parse url");
    StoredChunk {
        chunk: Chunk::new(url, "Section", content.to_string(), 0, 0, 1)
            .expect("should build chunk"),
        vector,
    }
}

#[tokio::test]
async fn fresh_store_is_empty() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = LanceStore::open(temp_dir.path().join("vectors"))
        .await
        .expect("should open store");

    assert_eq!(store.vector_dimension(), None);
    assert_eq!(store.count().await.expect("should count"), 0);
    assert!(
        store
            .nearest(&[0.1, 0.2], 3)
            .await
            .expect("should search empty store")
            .is_empty()
    );
}

#[tokio::test]
async fn add_and_search() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = LanceStore::open(temp_dir.path())
        .await
        .expect("should open store");

    store
        .add(vec![
            record("/values/", "values chunk", vec![1.0, 0.0, 0.0]),
            record("/remote/", "remote chunk", vec![0.0, 1.0, 0.0]),
            record("/hiring/", "hiring chunk", vec![0.0, 0.0, 1.0]),
        ])
        .await
        .expect("should add records");

    assert_eq!(store.vector_dimension(), Some(3));
    assert_eq!(store.count().await.expect("should count"), 3);

    let matches = store
        .nearest(&[0.0, 0.9, 0.1], 2)
        .await
        .expect("should search");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].chunk.content(), "remote chunk");
    assert!(matches[0].distance <= matches[1].distance);
}

#[tokio::test]
async fn rejects_dimension_mismatch() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = LanceStore::open(temp_dir.path())
        .await
        .expect("should open store");

    store
        .add(vec![record("/a/", "first", vec![1.0, 0.0])])
        .await
        .expect("should add records");

    let err = store
        .add(vec![record("/b/", "second", vec![1.0, 0.0, 0.0])])
        .await
        .expect_err("should reject wider vectors");
    assert!(matches!(err, RagError::Index(_)));

    assert!(store.nearest(&[1.0], 1).await.is_err());
}

#[tokio::test]
async fn reopen_keeps_rows_and_dimension() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    {
        let mut store = LanceStore::open(temp_dir.path())
            .await
            .expect("should open store");
        store
            .add(vec![
                record("/a/", "first", vec![0.5, 0.5]),
                record("/b/", "second", vec![0.1, 0.9]),
            ])
            .await
            .expect("should add records");
    }

    let store = LanceStore::open(temp_dir.path())
        .await
        .expect("should reopen store");
    assert_eq!(store.vector_dimension(), Some(2));
    assert_eq!(store.count().await.expect("should count"), 2);
}

#[tokio::test]
async fn clear_drops_table() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = LanceStore::open(temp_dir.path())
        .await
        .expect("should open store");

    store
        .add(vec![record("/a/", "first", vec![0.5, 0.5])])
        .await
        .expect("should add records");
    store.clear().await.expect("should clear");

    assert_eq!(store.count().await.expect("should count"), 0);
    assert_eq!(store.vector_dimension(), None);

    store
        .add(vec![record("/a/", "first", vec![0.5, 0.5, 0.5])])
        .await
        .expect("should accept a new dimension after clearing");
    assert_eq!(store.vector_dimension(), Some(3));
}

#[tokio::test]
async fn zero_k_returns_nothing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = LanceStore::open(temp_dir.path())
        .await
        .expect("should open store");
    store
        .add(vec![record("/a/", "first", vec![0.5, 0.5])])
        .await
        .expect("should add records");

    assert!(store.nearest(&[0.5, 0.5], 0).await.expect("should search").is_empty());
}
