// Embeddings module
// Remote embedding generation and document chunking

pub mod chunking;
pub mod jina;

use crate::Result;

pub use chunking::{ChunkingConfig, ContentChunk, DocumentProcessor, ProcessedDocument, split_text};
pub use jina::{EmbeddingTask, JinaClient};

/// Capability shared by every embedding backend
pub trait Embedder {
    /// Embed a batch of passages in one request. The result holds one vector
    /// per input, in input order.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

impl<T: Embedder + ?Sized> Embedder for &T {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_documents(texts)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_query(text)
    }
}
