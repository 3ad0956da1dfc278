// Usage analytics: a rolling window of per-query summaries plus running
// counters, persisted as JSON next to the index


use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chat::AnswerResult;
use crate::retrieval::Confidence;

/// Query summaries kept; older entries are dropped first
pub const MAX_QUERY_RECORDS: usize = 1000;

const TOP_SOURCES: usize = 5;
const RECENT_QUERIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub confidence: Confidence,
    pub sources_count: usize,
    pub guardrail_triggered: bool,
    pub error: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceDistribution {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl ConfidenceDistribution {
    fn record(&mut self, confidence: Confidence) {
        match confidence {
            Confidence::High => self.high += 1,
            Confidence::Medium => self.medium += 1,
            Confidence::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct AnalyticsData {
    total_queries: u64,
    queries: Vec<QueryRecord>,
    sources_accessed: BTreeMap<String, u64>,
    confidence_distribution: ConfidenceDistribution,
    guardrail_triggers: u64,
    errors: u64,
}

/// Summary returned by [`Analytics::insights`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub total_queries: u64,
    /// Most cited URLs with their counts, most cited first
    pub top_sources: Vec<(String, u64)>,
    pub confidence_distribution: ConfidenceDistribution,
    /// Mean of high=1, medium=0.5, low=0 over all queries, two decimals
    pub average_confidence: f64,
    pub guardrail_triggers: u64,
    /// Percentage of queries that errored, two decimals
    pub error_rate: f64,
    pub recent_queries: Vec<QueryRecord>,
}

/// Query tracker, optionally backed by a JSON file
#[derive(Debug, Clone, Default)]
pub struct Analytics {
    path: Option<PathBuf>,
    data: AnalyticsData,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Analytics {
    /// Tracker that never touches disk
    #[inline]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load `path` if it exists; later updates are written back to it
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read analytics file: {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse analytics file: {}", path.display()))?
        } else {
            debug!("No analytics file at {}, starting fresh", path.display());
            AnalyticsData::default()
        };

        Ok(Self {
            path: Some(path),
            data,
        })
    }

    #[inline]
    pub fn total_queries(&self) -> u64 {
        self.data.total_queries
    }

    /// Record one answered query and persist
    #[inline]
    pub fn track(&mut self, query: &str, result: &AnswerResult) -> Result<()> {
        let data = &mut self.data;
        data.total_queries += 1;

        data.queries.push(QueryRecord {
            timestamp: Utc::now(),
            query: query.to_string(),
            confidence: result.confidence,
            sources_count: result.sources.len(),
            guardrail_triggered: result.guardrail_triggered,
            error: result.is_error(),
        });
        if data.queries.len() > MAX_QUERY_RECORDS {
            let excess = data.queries.len() - MAX_QUERY_RECORDS;
            data.queries.drain(..excess);
        }

        for source in &result.sources {
            *data.sources_accessed.entry(source.url.clone()).or_insert(0) += 1;
        }

        data.confidence_distribution.record(result.confidence);

        if result.guardrail_triggered {
            data.guardrail_triggers += 1;
        }
        if result.is_error() {
            data.errors += 1;
        }

        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize analytics")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write analytics file: {}", path.display()))
    }

    /// Totals, top sources, confidence and error rates, and recent queries
    #[inline]
    pub fn insights(&self) -> Insights {
        let data = &self.data;
        let total = data.total_queries;

        let mut top_sources: Vec<(String, u64)> = data
            .sources_accessed
            .iter()
            .map(|(url, count)| (url.clone(), *count))
            .collect();
        // BTreeMap order makes ties resolve by URL
        top_sources.sort_by(|a, b| b.1.cmp(&a.1));
        top_sources.truncate(TOP_SOURCES);

        let (average_confidence, error_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            let dist = data.confidence_distribution;
            let weighted = dist.high as f64 * Confidence::High.weight()
                + dist.medium as f64 * Confidence::Medium.weight()
                + dist.low as f64 * Confidence::Low.weight();
            (
                round2(weighted / total as f64),
                round2(data.errors as f64 / total as f64 * 100.0),
            )
        };

        let recent_start = data.queries.len().saturating_sub(RECENT_QUERIES);

        Insights {
            total_queries: total,
            top_sources,
            confidence_distribution: data.confidence_distribution,
            average_confidence,
            guardrail_triggers: data.guardrail_triggers,
            error_rate,
            recent_queries: data.queries[recent_start..].to_vec(),
        }
    }
}
