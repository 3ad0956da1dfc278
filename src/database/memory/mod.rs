
use async_trait::async_trait;
use tracing::debug;

use super::{RetrievedMatch, StoredChunk, VectorStore};
use crate::{RagError, Result};

/// Squared Euclidean distance, the metric LanceDB uses by default
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Brute-force in-process vector store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<StoredChunk>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn dimension(&self) -> Option<usize> {
        self.records.first().map(|r| r.vector.len())
    }

    fn check_dimension(&self, dimension: usize) -> Result<()> {
        match self.dimension() {
            Some(expected) if expected != dimension => Err(RagError::Index(format!(
                "vector dimension {} does not match stored dimension {}",
                dimension, expected
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    #[inline]
    async fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    #[inline]
    async fn add(&mut self, records: Vec<StoredChunk>) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };

        let dimension = first.vector.len();
        self.check_dimension(dimension)?;
        if records.iter().any(|r| r.vector.len() != dimension) {
            return Err(RagError::Index(
                "records in one batch have different vector dimensions".to_string(),
            ));
        }

        debug!("Storing {} records in memory", records.len());
        self.records.extend(records);
        Ok(())
    }

    #[inline]
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedMatch>> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(vector.len())?;

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (i, squared_l2(&record.vector, vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, distance)| RetrievedMatch {
                chunk: self.records[i].chunk.clone(),
                distance,
            })
            .collect())
    }

    #[inline]
    async fn clear(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }
}
