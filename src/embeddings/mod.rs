// Embedding and generation services, plus the chunking that feeds them

pub mod chunking;
pub mod ollama;

use async_trait::async_trait;

use crate::{RagError, Result};

pub use chunking::{
    Chunk, ChunkingConfig, RecursiveSplitter, count_tokens, split_section, split_sections,
};
pub use ollama::OllamaClient;

/// Turns text into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each text, returning vectors in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    #[inline]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        self.embed_batch(&texts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("embedding service returned no vectors".to_string()))
    }
}

/// Opaque text-completion service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
