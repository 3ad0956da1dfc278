// Vector storage: an in-process store for tests and ephemeral sessions,
// and a LanceDB-backed store for the persistent index

pub mod lancedb;
pub mod memory;

use async_trait::async_trait;

use crate::Result;
use crate::embeddings::chunking::Chunk;

pub use self::lancedb::vector_store::LanceStore;
pub use memory::MemoryStore;

/// A chunk together with its embedding, ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A similarity-search hit; lower distance means more similar
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedMatch {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Storage and nearest-neighbour search over embedded chunks
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Number of stored chunks
    async fn count(&self) -> Result<usize>;

    /// Append records; all vectors must share the store's dimension
    async fn add(&mut self, records: Vec<StoredChunk>) -> Result<()>;

    /// Up to `k` stored chunks closest to `vector`, by ascending distance
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedMatch>>;

    /// Remove everything
    async fn clear(&mut self) -> Result<()>;
}
