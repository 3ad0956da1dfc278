// Retrieval over the index, confidence scoring and the transparency preview

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;
use crate::database::{RetrievedMatch, VectorStore};
use crate::embeddings::Embedder;
use crate::indexer::{DEFAULT_INGEST_BATCH_SIZE, Index};

/// Characters of chunk content shown in a preview before truncation
pub const PREVIEW_CHARS: usize = 200;

/// Upper bounds on average match distance for each confidence tier
///
/// These are tuning knobs, not calibrated probabilities: an average distance
/// strictly below `high` is high confidence, strictly below `medium` is
/// medium, anything else is low.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub high: f32,
    pub medium: f32,
}

impl Default for ConfidenceThresholds {
    #[inline]
    fn default() -> Self {
        Self {
            high: 0.3,
            medium: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Matches retrieved per question
    pub top_k: usize,
    /// Matches shown by the preview
    pub preview_chunks: usize,
    /// Chunks embedded per ingestion batch
    pub ingest_batch_size: usize,
    pub thresholds: ConfidenceThresholds,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 5,
            preview_chunks: 3,
            ingest_batch_size: DEFAULT_INGEST_BATCH_SIZE,
            thresholds: ConfidenceThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Numeric weight used when averaging confidence across queries
    #[inline]
    pub fn weight(self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Medium => 0.5,
            Self::Low => 0.0,
        }
    }

    /// Capitalised label for display
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map the mean distance of `matches` onto a confidence tier; no matches is low
#[inline]
pub fn score_confidence(matches: &[RetrievedMatch], thresholds: ConfidenceThresholds) -> Confidence {
    if matches.is_empty() {
        return Confidence::Low;
    }

    let total: f32 = matches.iter().map(|m| m.distance).sum();
    let average = total / matches.len() as f32;

    if average < thresholds.high {
        Confidence::High
    } else if average < thresholds.medium {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// What grounds an answer, shown to the user alongside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextPreview {
    pub section_title: String,
    pub url: String,
    pub preview: String,
}

impl From<&RetrievedMatch> for ContextPreview {
    #[inline]
    fn from(m: &RetrievedMatch) -> Self {
        Self {
            section_title: m.chunk.section_title().to_string(),
            url: m.chunk.source_url().to_string(),
            preview: truncate_preview(m.chunk.content(), PREVIEW_CHARS),
        }
    }
}

/// First `max_chars` characters of `text`, with "..." appended when cut
#[inline]
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_end, _)) => format!("{}...", &text[..byte_end]),
        None => text.to_string(),
    }
}

/// Query-side view of the index
pub struct Retriever<E, S> {
    index: Index<E, S>,
    config: RetrievalConfig,
}

impl<E: Embedder, S: VectorStore> Retriever<E, S> {
    #[inline]
    pub fn new(index: Index<E, S>, config: RetrievalConfig) -> Self {
        Self { index, config }
    }

    #[inline]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    #[inline]
    pub fn index(&self) -> &Index<E, S> {
        &self.index
    }

    #[inline]
    pub fn index_mut(&mut self) -> &mut Index<E, S> {
        &mut self.index
    }

    /// Up to `k` matches for `query`, by ascending distance
    #[inline]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>> {
        self.index.search(query, k).await
    }

    #[inline]
    pub fn score(&self, matches: &[RetrievedMatch]) -> Confidence {
        score_confidence(matches, self.config.thresholds)
    }

    /// Retrieve `max_chunks` matches and render them as truncated previews
    #[inline]
    pub async fn preview(&self, query: &str, max_chunks: usize) -> Result<Vec<ContextPreview>> {
        let matches = self.retrieve(query, max_chunks).await?;
        Ok(matches.iter().map(ContextPreview::from).collect())
    }
}
