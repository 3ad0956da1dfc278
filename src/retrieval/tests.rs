use super::*;
use crate::database::MemoryStore;
use crate::testing::{KeywordEmbedder, chunk};

fn hit(distance: f32) -> RetrievedMatch {
    RetrievedMatch {
        chunk: chunk("https://handbook.gitlab.com/handbook", "Handbook", "text"),
        distance,
    }
}

#[test]
fn no_matches_is_low() {
    assert_eq!(
        score_confidence(&[], ConfidenceThresholds::default()),
        Confidence::Low
    );
}

#[test]
fn single_match_tiers() {
    let thresholds = ConfidenceThresholds::default();
    assert_eq!(score_confidence(&[hit(0.1)], thresholds), Confidence::High);
    assert_eq!(score_confidence(&[hit(0.4)], thresholds), Confidence::Medium);
    assert_eq!(score_confidence(&[hit(0.6)], thresholds), Confidence::Low);
}

#[test]
fn boundaries_fall_to_lower_tier() {
    let thresholds = ConfidenceThresholds::default();
    assert_eq!(
        score_confidence(&[hit(0.3), hit(0.3)], thresholds),
        Confidence::Medium
    );
    assert_eq!(score_confidence(&[hit(0.5)], thresholds), Confidence::Low);

    let exact = ConfidenceThresholds {
        high: 0.25,
        medium: 0.75,
    };
    assert_eq!(
        score_confidence(&[hit(0.0), hit(0.5)], exact),
        Confidence::Medium
    );
    assert_eq!(
        score_confidence(&[hit(0.5), hit(1.0)], exact),
        Confidence::Low
    );
}

#[test]
fn averages_across_matches() {
    let thresholds = ConfidenceThresholds::default();
    assert_eq!(
        score_confidence(&[hit(0.0), hit(0.1), hit(0.2)], thresholds),
        Confidence::High
    );
    assert_eq!(
        score_confidence(&[hit(0.0), hit(1.0)], thresholds),
        Confidence::Low
    );
}

#[test]
fn custom_thresholds() {
    let loose = ConfidenceThresholds {
        high: 1.0,
        medium: 2.0,
    };
    assert_eq!(score_confidence(&[hit(0.6)], loose), Confidence::High);
    assert_eq!(score_confidence(&[hit(1.5)], loose), Confidence::Medium);
}

#[test]
fn confidence_labels_and_serde() {
    assert_eq!(Confidence::High.to_string(), "high");
    assert_eq!(Confidence::Medium.label(), "Medium");
    assert_eq!(
        serde_json::to_string(&Confidence::Low).expect("should serialize"),
        "\"low\""
    );
    let parsed: Confidence = serde_json::from_str("\"medium\"").expect("should parse");
    assert_eq!(parsed, Confidence::Medium);
}

#[test]
fn preview_truncation() {
    assert_eq!(truncate_preview("short", 200), "short");

    let exact = "a".repeat(200);
    assert_eq!(truncate_preview(&exact, 200), exact);

    let long = "ü".repeat(201);
    let preview = truncate_preview(&long, 200);
    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), 203);
}

#[tokio::test]
async fn preview_uses_retrieval_order() {
    let mut index = Index::new(
        KeywordEmbedder::new(&["values", "remote"]),
        MemoryStore::default(),
    );
    index
        .ingest(&[
            chunk(
                "https://handbook.gitlab.com/handbook/values",
                "Values",
                "Our values guide decisions",
            ),
            chunk(
                "https://handbook.gitlab.com/handbook/remote",
                "Remote",
                &format!("Remote work {}", "x".repeat(300)),
            ),
        ])
        .await
        .expect("should ingest");

    let retriever = Retriever::new(index, RetrievalConfig::default());
    let previews = retriever
        .preview("remote", 1)
        .await
        .expect("should preview");

    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].section_title, "Remote");
    assert_eq!(previews[0].url, "https://handbook.gitlab.com/handbook/remote");
    assert_eq!(previews[0].preview.chars().count(), 203);
}

#[test]
fn config_defaults() {
    let config = RetrievalConfig::default();
    assert_eq!(config.top_k, 5);
    assert_eq!(config.preview_chunks, 3);
    assert_eq!(config.ingest_batch_size, 100);
    assert_eq!(config.thresholds.high, 0.3);
    assert_eq!(config.thresholds.medium, 0.5);
}
