use clap::Parser;
use doc_rag::Result;
use doc_rag::config::{ApiKey, Config};
use doc_rag::database::VectorStore;
use doc_rag::embeddings::{DocumentProcessor, JinaClient};
use doc_rag::session::SessionController;
use doc_rag::ui::Console;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "doc-rag")]
#[command(about = "Embed a local .txt or .pdf document and query it by similarity")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector database
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Directory whose files are offered for embedding
    #[arg(long)]
    documents_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::config_dir()?,
    };
    let mut config = Config::load(&config_dir)?;
    if let Some(dir) = cli.documents_dir {
        config.documents_dir = Some(dir);
    }

    let api_key = ApiKey::from_env(&config.embedding.api_key_env)?;
    let embedder = JinaClient::new(&config.embedding, api_key)?;
    let processor = DocumentProcessor::new(config.chunking.clone())?;
    let store = VectorStore::from_config(&config).await?;
    let documents_dir = config.documents_path()?;

    info!(
        "Serving documents from {} with model {} into table {}",
        documents_dir.display(),
        embedder.model(),
        store.table_name()
    );

    SessionController::new(embedder, processor, store, Console::stdio(), documents_dir)
        .with_result_count(config.store.n_results)
        .run()
        .await
}
