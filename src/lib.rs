use thiserror::Error;

pub type Result<T, E = RagError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} not found in environment or .env file")]
    MissingCredential(String),

    #[error("Unsupported file type: {0}. Only .txt and .pdf are supported.")]
    UnsupportedFileType(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Document contains no text: {0}")]
    EmptyDocument(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod config;
pub mod database;
pub mod embeddings;
pub mod loader;
pub mod session;
pub mod ui;
