//! Core data models for the knowledge base.
//!
//! A [`Document`] is the unit of upload. Its text is split into [`Chunk`]s
//! that only live long enough to be embedded; each one is persisted as the
//! `content` of an [`Embedding`] record pointing back at its document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Dimensionality of every stored and query embedding.
pub const EMBEDDING_DIMS: usize = 1536;

/// Largest accepted upload, in KB (50 MB).
pub const MAX_FILE_SIZE_KB: u64 = 50 * 1024;

/// Supported document type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Txt,
    Docx,
    Html,
    Md,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Pdf,
        FileType::Txt,
        FileType::Docx,
        FileType::Html,
        FileType::Md,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Txt => "txt",
            FileType::Docx => "docx",
            FileType::Html => "html",
            FileType::Md => "md",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = RagError;

    /// Case-insensitive; a leading dot (`".PDF"`) is tolerated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_lowercase();
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| RagError::UnsupportedFileType(s.to_string()))
    }
}

/// A validated document ready to be handed to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub file_name: String,
    pub file_type: FileType,
    pub file_size_kb: u64,
    pub content: String,
}

impl NewDocument {
    /// Validate raw upload metadata.
    ///
    /// Rejects blank names or content, unknown type tags, and files above
    /// [`MAX_FILE_SIZE_KB`].
    pub fn new(
        file_name: &str,
        file_type: &str,
        content: impl Into<String>,
        file_size_kb: u64,
    ) -> Result<Self, RagError> {
        let content = content.into();
        if file_name.trim().is_empty() {
            return Err(RagError::InvalidInput("file name must not be empty".into()));
        }
        if content.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "document content must not be empty".into(),
            ));
        }
        let file_type: FileType = file_type.parse()?;
        if file_size_kb > MAX_FILE_SIZE_KB {
            return Err(RagError::FileTooLarge {
                size_kb: file_size_kb,
                max_kb: MAX_FILE_SIZE_KB,
            });
        }

        Ok(Self {
            file_name: file_name.trim().to_string(),
            file_type,
            file_size_kb,
            content,
        })
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub file_name: String,
    pub file_type: FileType,
    pub file_size_kb: u64,
    pub content: String,
    /// Unix seconds.
    pub uploaded_at: i64,
}

/// A contiguous segment of a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// A persisted chunk with its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub vector: Vec<f32>,
}
