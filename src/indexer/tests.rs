use super::*;
use crate::database::MemoryStore;
use crate::testing::{KeywordEmbedder, chunk};

fn corpus() -> Vec<Chunk> {
    vec![
        chunk(
            "https://handbook.gitlab.com/handbook/values",
            "Values",
            "Collaboration and results are core values",
        ),
        chunk(
            "https://handbook.gitlab.com/handbook/company/culture/all-remote",
            "Remote Work",
            "GitLab is an all-remote company.",
        ),
        chunk(
            "https://handbook.gitlab.com/handbook/hiring",
            "Hiring",
            "Hiring managers review every candidate",
        ),
    ]
}

fn index() -> Index<KeywordEmbedder, MemoryStore> {
    Index::new(
        KeywordEmbedder::new(&["values", "remote", "hiring"]),
        MemoryStore::default(),
    )
}

#[tokio::test]
async fn ingest_loads_in_batches() {
    let mut index = index().with_batch_size(2);
    let report = index.ingest(&corpus()).await.expect("should ingest");

    assert_eq!(
        report,
        IngestReport::Loaded {
            chunks: 3,
            batches: 2
        }
    );
    assert_eq!(index.count().await.expect("should count"), 3);
    assert_eq!(index.embedder.calls(), 2);
}

#[tokio::test]
async fn second_ingest_is_a_no_op() {
    let mut index = index();
    index.ingest(&corpus()).await.expect("should ingest");
    let calls = index.embedder.calls();

    let report = index.ingest(&corpus()).await.expect("should skip");
    assert_eq!(report, IngestReport::Skipped { existing: 3 });
    assert_eq!(index.count().await.expect("should count"), 3);
    assert_eq!(index.embedder.calls(), calls);
}

#[tokio::test]
async fn reset_allows_reload() {
    let mut index = index();
    index.ingest(&corpus()).await.expect("should ingest");
    index.reset().await.expect("should reset");
    assert_eq!(index.count().await.expect("should count"), 0);

    let report = index.ingest(&corpus()[..1]).await.expect("should reload");
    assert_eq!(
        report,
        IngestReport::Loaded {
            chunks: 1,
            batches: 1
        }
    );
}

#[tokio::test]
async fn failed_batch_keeps_earlier_batches() {
    let mut index = Index::new(
        KeywordEmbedder::new(&["values", "remote", "hiring"]).failing_on(2),
        MemoryStore::default(),
    )
    .with_batch_size(1);

    let err = index
        .ingest(&corpus())
        .await
        .expect_err("second batch should fail");
    assert!(matches!(err, RagError::Embedding(_)));
    assert_eq!(index.count().await.expect("should count"), 1);
    assert_eq!(index.embedder.calls(), 2);
}

#[tokio::test]
async fn empty_ingest_reports_nothing_loaded() {
    let mut index = index();
    let report = index.ingest(&[]).await.expect("should accept empty input");
    assert_eq!(
        report,
        IngestReport::Loaded {
            chunks: 0,
            batches: 0
        }
    );
}

#[tokio::test]
async fn search_ranks_by_distance() {
    let mut index = index();
    index.ingest(&corpus()).await.expect("should ingest");

    let matches = index
        .search("How does remote work?", 2)
        .await
        .expect("should search");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].chunk.section_title(), "Remote Work");
    assert_eq!(matches[0].distance, 0.0);
    assert!(matches[1].distance >= matches[0].distance);
}

#[tokio::test]
async fn search_on_empty_index_skips_embedding() {
    let index = index();
    let matches = index.search("anything", 5).await.expect("should search");
    assert!(matches.is_empty());
    assert_eq!(index.embedder.calls(), 0);
}

#[test]
fn batch_size_is_at_least_one() {
    assert_eq!(index().with_batch_size(0).batch_size(), 1);
    assert_eq!(index().batch_size(), DEFAULT_INGEST_BATCH_SIZE);
}
