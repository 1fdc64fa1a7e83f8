// Database module
// Embedded LanceDB storage for chunk vectors

pub mod lancedb;

pub use self::lancedb::{EmbeddingRecord, SearchResult, VectorStore};
