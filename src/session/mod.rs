// Session controller module
// Drives file selection, ingestion and the query loop


use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::settings::DEFAULT_RESULT_COUNT;
use crate::database::VectorStore;
use crate::embeddings::{DocumentProcessor, Embedder};
use crate::loader::select_loader;
use crate::ui::{Console, FileChoice, Query, list_files};
use crate::{RagError, Result};

/// How one outer-loop iteration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Back to the file prompt
    Continue,
    /// The user quit at the file prompt
    Exit,
}

/// Owns every pipeline component and runs the interactive loops
pub struct SessionController<E, R, W> {
    embedder: E,
    processor: DocumentProcessor,
    store: VectorStore,
    console: Console<R, W>,
    documents_dir: PathBuf,
    n_results: usize,
}

impl<E: Embedder, R: BufRead, W: Write> SessionController<E, R, W> {
    #[inline]
    pub fn new(
        embedder: E,
        processor: DocumentProcessor,
        store: VectorStore,
        console: Console<R, W>,
        documents_dir: PathBuf,
    ) -> Self {
        Self {
            embedder,
            processor,
            store,
            console,
            documents_dir,
            n_results: DEFAULT_RESULT_COUNT,
        }
    }

    #[inline]
    pub fn with_result_count(mut self, n_results: usize) -> Self {
        self.n_results = n_results;
        self
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    #[inline]
    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    /// Run sessions until the user quits
    ///
    /// Errors from a session are printed and the next session starts. Only
    /// I/O failures on the console or the documents directory end the loop.
    #[inline]
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.run_session().await {
                Ok(SessionOutcome::Exit) => break,
                Ok(SessionOutcome::Continue) => {}
                Err(RagError::Io(e)) => return Err(RagError::Io(e)),
                Err(e) => {
                    warn!("Session failed: {}", e);
                    self.console.error(&e)?;
                }
            }
        }

        info!("Session loop finished");
        Ok(())
    }

    /// One outer-loop iteration: choose a file, ingest it, answer queries
    #[inline]
    pub async fn run_session(&mut self) -> Result<SessionOutcome> {
        self.console.banner()?;

        let files = list_files(&self.documents_dir)?;
        let path = match self.console.choose_file(&files)? {
            FileChoice::Quit => {
                self.console.goodbye()?;
                return Ok(SessionOutcome::Exit);
            }
            FileChoice::Selected(path) => path,
        };

        let chunk_count = self.ingest(&path).await?;
        self.console.success(&format!(
            "Successfully embedded and stored {} chunks!",
            chunk_count
        ))?;

        self.query_loop().await?;
        Ok(SessionOutcome::Continue)
    }

    /// Load, chunk, embed and store one document in place of the previous
    /// one. Returns the chunk count.
    #[inline]
    pub async fn ingest(&mut self, path: &Path) -> Result<usize> {
        let loader = select_loader(path)?;
        let document = self.processor.process(&loader)?;

        info!("Embedding {} chunks from {}", document.len(), path.display());
        let vectors = self.embed_documents(&document.texts)?;

        self.store
            .replace_documents(&document.texts, &document.metadatas, &document.ids, &vectors)
            .await?;

        Ok(document.len())
    }

    async fn query_loop(&mut self) -> Result<()> {
        loop {
            let text = match self.console.get_query()? {
                Query::Quit => {
                    self.console.info("📁 Done with this document.")?;
                    return Ok(());
                }
                Query::Text(text) if text.is_empty() => continue,
                Query::Text(text) => text,
            };

            let query_vector = self.embedder.embed_query(&text)?;
            let results = self
                .store
                .query_documents(&query_vector, self.n_results)
                .await?;
            self.console.display_results(&results)?;
        }
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            )
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(format!("Embedding {} chunks", texts.len()));
        bar.tick();

        let result = self.embedder.embed_documents(texts);
        bar.finish_and_clear();
        result
    }
}
