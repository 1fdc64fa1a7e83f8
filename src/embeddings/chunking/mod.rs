#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::loader::{DocumentLoader, DocumentMetadata, SourceUnit};
use crate::{RagError, Result};

/// Represents a chunk of content ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// Sequential identifier, `doc_<chunk_index>`
    pub id: String,
    /// The content text
    pub content: String,
    /// Metadata of the source unit this chunk was cut from
    pub metadata: DocumentMetadata,
    /// The index of this chunk within the document
    pub chunk_index: usize,
}

/// Configuration for content chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of the same unit
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidChunkOverlap(
                self.chunk_overlap,
                self.chunk_size,
            ));
        }

        Ok(())
    }

    /// Distance between the start offsets of consecutive chunks
    #[inline]
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

/// Chunked document as three parallel sequences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedDocument {
    pub texts: Vec<String>,
    pub metadatas: Vec<DocumentMetadata>,
    pub ids: Vec<String>,
}

impl ProcessedDocument {
    #[inline]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

impl FromIterator<ContentChunk> for ProcessedDocument {
    #[inline]
    fn from_iter<I: IntoIterator<Item = ContentChunk>>(iter: I) -> Self {
        let mut document = Self::default();
        for chunk in iter {
            document.texts.push(chunk.content);
            document.metadatas.push(chunk.metadata);
            document.ids.push(chunk.id);
        }
        document
    }
}

/// Splits loaded documents into fixed-size overlapping chunks
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    config: ChunkingConfig,
}

impl Default for DocumentProcessor {
    #[inline]
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

impl DocumentProcessor {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load the document behind `loader` and chunk every unit it yields
    #[inline]
    pub fn process(&self, loader: &DocumentLoader) -> Result<ProcessedDocument> {
        let units = loader.load()?;
        let chunks = self.chunk_units(&units);

        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(loader.path().display().to_string()));
        }

        debug!(
            "Chunked {} document {} into {} chunks from {} units",
            loader.kind(),
            loader.path().display(),
            chunks.len(),
            units.len()
        );

        Ok(chunks.into_iter().collect())
    }

    /// Chunk source units in order. Ids run contiguously across units.
    #[inline]
    pub fn chunk_units(&self, units: &[SourceUnit]) -> Vec<ContentChunk> {
        let mut chunks = Vec::new();

        for unit in units {
            if unit.content.trim().is_empty() {
                continue;
            }

            for content in split_text(&unit.content, &self.config) {
                let chunk_index = chunks.len();
                chunks.push(ContentChunk {
                    id: chunk_id(chunk_index),
                    content,
                    metadata: unit.metadata.clone(),
                    chunk_index,
                });
            }
        }

        chunks
    }
}

#[inline]
pub fn chunk_id(index: usize) -> String {
    format!("doc_{}", index)
}

/// Split text into windows of `chunk_size` characters advancing by
/// `chunk_size - chunk_overlap`. The last window may be shorter; text no
/// longer than one window comes back whole.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    // Byte offset of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    if char_count == 0 {
        return Vec::new();
    }

    let size = config.chunk_size.max(1);
    let step = config.step();
    let mut chunks = Vec::with_capacity(char_count.div_ceil(step));
    let mut start = 0;

    loop {
        let end = (start + size).min(char_count);
        if let Some(window) = text.get(boundaries[start]..boundaries[end]) {
            chunks.push(window.to_string());
        }
        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}
