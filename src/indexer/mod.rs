// Load-once ingestion of chunks into a vector store, plus query-time search

#[cfg(test)]
mod tests;

use tracing::{debug, info, warn};

use crate::database::{StoredChunk, VectorStore};
use crate::embeddings::{Chunk, Embedder};
use crate::progress::progress_bar;
use crate::{RagError, Result};

pub use crate::database::RetrievedMatch;

/// Default number of chunks embedded and inserted together
pub const DEFAULT_INGEST_BATCH_SIZE: usize = 100;

/// Outcome of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestReport {
    /// The store already held `existing` chunks; nothing was embedded
    Skipped { existing: usize },
    /// `chunks` chunks were embedded and stored in `batches` batches
    Loaded { chunks: usize, batches: usize },
}

/// Searchable chunk index over an embedding service and a vector store
pub struct Index<E, S> {
    embedder: E,
    store: S,
    batch_size: usize,
}

impl<E: Embedder, S: VectorStore> Index<E, S> {
    #[inline]
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            batch_size: DEFAULT_INGEST_BATCH_SIZE,
        }
    }

    /// Set the ingestion batch size (at least 1)
    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Embed and store `chunks` unless the store is already populated
    ///
    /// Batches are processed in order. A failing batch aborts the run and
    /// leaves earlier batches in the store; rerun with [`Index::reset`] first
    /// to rebuild from scratch.
    #[inline]
    pub async fn ingest(&mut self, chunks: &[Chunk]) -> Result<IngestReport> {
        let existing = self.store.count().await?;
        if existing > 0 {
            info!(
                "Index already holds {} chunks, skipping ingestion",
                existing
            );
            return Ok(IngestReport::Skipped { existing });
        }

        if chunks.is_empty() {
            warn!("No chunks to ingest; the index stays empty");
            return Ok(IngestReport::Loaded {
                chunks: 0,
                batches: 0,
            });
        }

        info!(
            "Ingesting {} chunks in batches of {}",
            chunks.len(),
            self.batch_size
        );

        let pb = progress_bar(
            chunks.len() as u64,
            "{spinner:.green} Embedding [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})",
        );

        let mut batches = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content().to_string()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            if vectors.len() != batch.len() {
                pb.abandon();
                return Err(RagError::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            let records = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| StoredChunk { chunk, vector })
                .collect();
            self.store.add(records).await?;

            batches += 1;
            pb.inc(batch.len() as u64);
            debug!("Stored batch {} ({} chunks)", batches, batch.len());
        }

        pb.finish_and_clear();
        info!("Ingested {} chunks in {} batches", chunks.len(), batches);

        Ok(IngestReport::Loaded {
            chunks: chunks.len(),
            batches,
        })
    }

    /// Up to `k` chunks closest to `query`, by ascending distance
    #[inline]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        if self.store.count().await? == 0 {
            debug!("Search on an empty index");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let matches = self.store.nearest(&vector, k).await?;
        debug!("Search for {:?} returned {} matches", query, matches.len());
        Ok(matches)
    }

    /// Remove every stored chunk so the next ingest reloads
    #[inline]
    pub async fn reset(&mut self) -> Result<()> {
        info!("Clearing the index");
        self.store.clear().await
    }
}
