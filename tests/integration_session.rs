//! End-to-end sessions over real files and a real LanceDB directory
#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use doc_rag::{
    Result,
    config::Config,
    database::VectorStore,
    embeddings::{DocumentProcessor, Embedder},
    session::SessionController,
    ui::Console,
};
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

const DIMENSIONS: usize = 64;

/// Bag-of-words vectors hashed into a fixed number of buckets
struct WordEmbedder;

fn word_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7_usize, |hash, b| hash.wrapping_mul(31).wrapping_add(usize::from(b)));
        vector[bucket % DIMENSIONS] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt().max(1.0);
    vector.iter().map(|v| v / norm).collect()
}

impl Embedder for WordEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| word_vector(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(word_vector(text))
    }
}

fn create_test_config() -> (Config, TempDir, TempDir) {
    let config_dir = TempDir::new().expect("should create config dir");
    let docs_dir = TempDir::new().expect("should create docs dir");
    let config = Config {
        base_dir: config_dir.path().to_path_buf(),
        documents_dir: Some(docs_dir.path().to_path_buf()),
        ..Config::default()
    };
    (config, config_dir, docs_dir)
}

async fn run_with_input(config: &Config, input: &str) -> (String, usize) {
    console::set_colors_enabled(false);
    let store = VectorStore::from_config(config)
        .await
        .expect("should open store");
    let processor = DocumentProcessor::new(config.chunking.clone()).expect("valid chunking");
    let documents_dir = config.documents_path().expect("documents dir is set");
    let console = Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());

    let mut controller = SessionController::new(WordEmbedder, processor, store, console, documents_dir)
        .with_result_count(config.store.n_results);
    controller.run().await.expect("session loop should finish");

    let count = controller.store().count().await.expect("should count");
    let output = String::from_utf8(controller.into_console().into_output()).expect("utf-8 output");
    (output, count)
}

#[tokio::test]
async fn quitting_immediately_ingests_nothing() {
    let (config, _config_dir, docs_dir) = create_test_config();
    fs::write(docs_dir.path().join("notes.txt"), "Some notes.").expect("should write fixture");

    let (output, count) = run_with_input(&config, "q\n").await;

    assert!(output.contains("1. notes.txt"));
    assert!(output.contains("👋 Exiting the app. Goodbye!"));
    assert!(!output.contains("Successfully embedded"));
    assert_eq!(count, 0);
}

#[tokio::test]
async fn text_document_is_chunked_stored_and_queried() {
    let (config, _config_dir, docs_dir) = create_test_config();
    let filler: String = "lorem ipsum dolor sit amet ".repeat(40);
    let text = format!("{}the lighthouse keeper trims the lamp wick nightly", filler);
    fs::write(docs_dir.path().join("story.txt"), &text).expect("should write fixture");

    let (output, count) =
        run_with_input(&config, "1\nlighthouse keeper lamp wick\nq\nq\n").await;

    let expected_chunks = doc_rag::embeddings::split_text(&text, &config.chunking).len();
    assert_eq!(count, expected_chunks);
    assert!(output.contains(&format!(
        "Successfully embedded and stored {} chunks!",
        expected_chunks
    )));

    let first = output.find("Result 1:").expect("results are shown");
    let best = output
        .get(first..)
        .and_then(|rest| rest.lines().nth(1))
        .expect("result text follows header");
    assert!(best.contains("lighthouse keeper"));
    assert!(output.contains("(story.txt)"));
    assert!(!output.contains("Result 4:"));
}

#[tokio::test]
async fn unsupported_and_missing_files_do_not_end_the_program() {
    let (config, _config_dir, docs_dir) = create_test_config();
    fs::write(docs_dir.path().join("a.docx"), "not really a docx").expect("should write fixture");
    fs::write(docs_dir.path().join("b.txt"), "Plain text survives.").expect("should write fixture");

    let (output, count) = run_with_input(&config, "1\n42\nnope\n2\nplain\nq\nq\n").await;

    assert!(output.contains("⚠️ Error: Unsupported file type: a.docx"));
    assert_eq!(output.matches("⚠️ Error: File not found").count(), 2);
    assert!(output.contains("Successfully embedded and stored 1 chunks!"));
    assert!(output.contains("Plain text survives."));
    assert_eq!(count, 1);
}

#[tokio::test]
async fn each_run_starts_with_an_empty_store() {
    let (config, _config_dir, docs_dir) = create_test_config();
    fs::write(docs_dir.path().join("notes.txt"), "Remember the milk.").expect("should write fixture");

    let (_, count) = run_with_input(&config, "1\nq\nq\n").await;
    assert_eq!(count, 1);

    let (output, count) = run_with_input(&config, "q\n").await;
    assert_eq!(count, 0);
    assert!(output.contains("Goodbye"));
}

#[tokio::test]
async fn store_survives_restart_when_reset_is_disabled() {
    let (mut config, _config_dir, docs_dir) = create_test_config();
    config.store.reset_on_start = false;
    fs::write(docs_dir.path().join("notes.txt"), "Remember the milk.").expect("should write fixture");

    let (_, count) = run_with_input(&config, "1\nq\nq\n").await;
    assert_eq!(count, 1);

    let (output, count) = run_with_input(&config, "q\n").await;
    assert_eq!(count, 1);
    assert!(output.contains("Goodbye"));
}
