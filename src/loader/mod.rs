// Document loading module
// Chooses a format-specific loader from the file extension


use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{RagError, Result};

/// File formats that can be embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
}

impl DocumentKind {
    /// Classify a path by its extension, ignoring case
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("txt") => Ok(Self::Text),
            Some("pdf") => Ok(Self::Pdf),
            _ => Err(RagError::UnsupportedFileType(file_name(path))),
        }
    }
}

impl fmt::Display for DocumentKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Pdf => f.write_str("PDF"),
        }
    }
}

/// Where a piece of text came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File name of the source document
    pub source: String,
    /// 1-based page number, for paged formats
    pub page: Option<u32>,
}

/// One independently loaded piece of a document: a whole text file or a PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// Reads a document of a known kind. Constructing one performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLoader {
    path: PathBuf,
    kind: DocumentKind,
}

/// Pick the loader for `path` from its extension alone
#[inline]
pub fn select_loader(path: &Path) -> Result<DocumentLoader> {
    let kind = DocumentKind::from_path(path)?;
    debug!("Selected {} loader for {}", kind, path.display());
    Ok(DocumentLoader {
        path: path.to_path_buf(),
        kind,
    })
}

impl DocumentLoader {
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Read the document into source units
    #[inline]
    pub fn load(&self) -> Result<Vec<SourceUnit>> {
        match self.kind {
            DocumentKind::Text => self.load_text(),
            DocumentKind::Pdf => self.load_pdf(),
        }
    }

    fn load_text(&self) -> Result<Vec<SourceUnit>> {
        let bytes = fs::read(&self.path).map_err(|e| {
            RagError::Loader(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let content = String::from_utf8(bytes).map_err(|_| {
            RagError::Loader(format!("{} is not valid UTF-8", self.path.display()))
        })?;

        debug!(
            "Loaded {} characters from {}",
            content.chars().count(),
            self.path.display()
        );

        Ok(vec![SourceUnit {
            content,
            metadata: self.metadata(None),
        }])
    }

    fn load_pdf(&self) -> Result<Vec<SourceUnit>> {
        let document = lopdf::Document::load(&self.path).map_err(|e| {
            RagError::Loader(format!("Failed to open PDF {}: {}", self.path.display(), e))
        })?;

        let pages = document.get_pages();
        let mut units = Vec::with_capacity(pages.len());

        for &page_number in pages.keys() {
            match document.extract_text(&[page_number]) {
                Ok(content) => units.push(SourceUnit {
                    content,
                    metadata: self.metadata(Some(page_number)),
                }),
                Err(e) => warn!(
                    "Skipping page {} of {}: {}",
                    page_number,
                    self.path.display(),
                    e
                ),
            }
        }

        debug!(
            "Extracted text from {}/{} pages of {}",
            units.len(),
            pages.len(),
            self.path.display()
        );

        Ok(units)
    }

    fn metadata(&self, page: Option<u32>) -> DocumentMetadata {
        DocumentMetadata {
            source: file_name(&self.path),
            page,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
