// LanceDB vector database module
// Handles vector storage and similarity search for embeddings


pub mod vector_store;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::loader::DocumentMetadata;

pub use vector_store::{SearchResult, VectorStore};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Chunk identifier, `doc_<n>`
    pub id: String,
    /// The chunk text
    pub text: String,
    /// The vector embedding; its length fixes the table's dimension
    pub vector: Vec<f32>,
    /// Where the chunk came from
    pub metadata: DocumentMetadata,
    /// Timestamp when this embedding was created
    pub created_at: String,
}

impl EmbeddingRecord {
    #[inline]
    pub fn new(id: String, text: String, vector: Vec<f32>, metadata: DocumentMetadata) -> Self {
        Self {
            id,
            text,
            vector,
            metadata,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
