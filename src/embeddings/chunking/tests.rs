use super::*;
use std::fs;
use tempfile::TempDir;

use crate::loader::select_loader;

fn unit(content: &str, page: Option<u32>) -> SourceUnit {
    SourceUnit {
        content: content.to_string(),
        metadata: DocumentMetadata {
            source: "notes.txt".to_string(),
            page,
        },
    }
}

/// Text where every character encodes its own offset, so windows can be located
fn numbered_text(len: usize) -> String {
    (0..len)
        .map(|i| char::from(b'a' + (i % 26) as u8))
        .collect()
}

#[test]
fn default_config() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 512);
    assert_eq!(config.chunk_overlap, 50);
    assert_eq!(config.step(), 462);
    assert!(config.validate().is_ok());
}

#[test]
fn overlap_must_be_smaller_than_chunk_size() {
    assert!(ChunkingConfig::new(100, 99).is_ok());
    assert!(matches!(
        ChunkingConfig::new(100, 100),
        Err(ConfigError::InvalidChunkOverlap(100, 100))
    ));
    assert!(ChunkingConfig::new(100, 150).is_err());
    assert!(matches!(
        ChunkingConfig::new(0, 0),
        Err(ConfigError::InvalidChunkSize(0))
    ));
    assert!(DocumentProcessor::new(ChunkingConfig {
        chunk_size: 10,
        chunk_overlap: 10,
    })
    .is_err());
}

#[test]
fn thousand_characters_make_three_chunks() {
    let text = numbered_text(1000);
    let chunks = split_text(&text, &ChunkingConfig::default());

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].chars().count(), 512);
    assert_eq!(chunks[1].chars().count(), 512);
    assert_eq!(chunks[2].chars().count(), 76);

    let chars: Vec<char> = text.chars().collect();
    for (chunk, offset) in chunks.iter().zip([0, 462, 924]) {
        let expected: String = chars[offset..].iter().take(512).collect();
        assert_eq!(chunk, &expected);
    }
}

#[test]
fn consecutive_chunks_share_the_overlap() {
    let text = numbered_text(1000);
    let chunks = split_text(&text, &ChunkingConfig::default());

    for pair in chunks.windows(2) {
        let tail: String = pair[0].chars().skip(512 - 50).collect();
        let head: String = pair[1].chars().take(50).collect();
        assert_eq!(tail, head);
    }
}

#[test]
fn chunks_never_exceed_chunk_size() {
    let config = ChunkingConfig::new(37, 5).expect("valid config");
    for len in [1, 36, 37, 38, 100, 333] {
        let text = numbered_text(len);
        let chunks = split_text(&text, &config);

        assert!(chunks.iter().all(|c| c.chars().count() <= 37));
        // Every character is covered and the windows advance by exactly 32
        let last_start = (chunks.len() - 1) * 32;
        assert_eq!(last_start + chunks[chunks.len() - 1].chars().count(), len);
    }
}

#[test]
fn short_text_yields_single_chunk() {
    let text = "A short note about vector databases.";
    let chunks = split_text(text, &ChunkingConfig::default());
    assert_eq!(chunks, vec![text.to_string()]);
}

#[test]
fn exact_chunk_size_yields_single_chunk() {
    let text = numbered_text(512);
    let chunks = split_text(&text, &ChunkingConfig::default());
    assert_eq!(chunks.len(), 1);
}

#[test]
fn empty_text_yields_nothing() {
    assert!(split_text("", &ChunkingConfig::default()).is_empty());
}

#[test]
fn windows_count_characters_not_bytes() {
    let text = "é".repeat(10);
    let config = ChunkingConfig::new(4, 1).expect("valid config");
    let chunks = split_text(&text, &config);

    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().all(|ch| ch == 'é')));
    assert_eq!(chunks[0].chars().count(), 4);
    assert_eq!(chunks[2].chars().count(), 4);
}

#[test]
fn ids_are_contiguous_across_units() {
    let processor =
        DocumentProcessor::new(ChunkingConfig::new(10, 2).expect("valid config")).expect("ok");
    let units = vec![
        unit(&numbered_text(25), Some(1)),
        unit("   \n", Some(2)),
        unit(&numbered_text(8), Some(3)),
    ];

    let chunks = processor.chunk_units(&units);
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["doc_0", "doc_1", "doc_2", "doc_3"]);

    let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    // First unit produced three windows, the blank page none, the last page one
    let pages: Vec<Option<u32>> = chunks.iter().map(|c| c.metadata.page).collect();
    assert_eq!(pages, vec![Some(1), Some(1), Some(1), Some(3)]);
}

#[test]
fn processed_document_keeps_sequences_parallel() {
    let processor = DocumentProcessor::default();
    let chunks = processor.chunk_units(&[unit(&numbered_text(1000), None)]);
    let document: ProcessedDocument = chunks.into_iter().collect();

    assert_eq!(document.len(), 3);
    assert_eq!(document.metadatas.len(), 3);
    assert_eq!(document.ids, vec!["doc_0", "doc_1", "doc_2"]);
    assert!(document.metadatas.iter().all(|m| m.source == "notes.txt"));
}

#[test]
fn process_text_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("report.txt");
    fs::write(&path, numbered_text(1000)).expect("should write fixture");

    let loader = select_loader(&path).expect("txt is supported");
    let document = DocumentProcessor::default()
        .process(&loader)
        .expect("should process text file");

    assert_eq!(document.len(), 3);
    assert_eq!(document.texts[2].chars().count(), 76);
    assert_eq!(document.metadatas[0].source, "report.txt");
    assert_eq!(document.metadatas[0].page, None);
}

#[test]
fn process_blank_file_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("blank.txt");
    fs::write(&path, "\n\n   \n").expect("should write fixture");

    let loader = select_loader(&path).expect("txt is supported");
    let result = DocumentProcessor::default().process(&loader);
    assert!(matches!(result, Err(RagError::EmptyDocument(_))));
}
