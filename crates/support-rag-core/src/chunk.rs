//! Paragraph- and sentence-aware text chunker.
//!
//! Splits document text into variable-length chunks that favour semantic
//! boundaries over fixed windows, so each chunk embeds into something
//! informative for retrieval.
//!
//! # Algorithm
//!
//! 1. Split text on blank lines into paragraphs; skip empty ones.
//! 2. Accumulate paragraphs into a buffer. If appending the next paragraph
//!    would push the buffer past `max_size`, flush the buffer first.
//! 3. A paragraph longer than `target_size` is split into sentences
//!    (`.`, `!` or `?` followed by whitespace) which are accumulated the
//!    same way.
//! 4. Once the buffer reaches `target_size` after a paragraph, flush it.
//! 5. Flush whatever remains.
//!
//! A sentence that on its own exceeds `max_size` (no paragraph breaks, no
//! punctuation) is cut into fixed-width windows of `window_size` characters
//! advancing by `window_size - overlap`.
//!
//! Sizes are measured in characters, not bytes.
//!
//! # Example
//!
//! ```rust
//! use support_rag_core::chunk::{chunk_text, ChunkerConfig};
//!
//! let chunks = chunk_text("Cats are mammals. Dogs are mammals too.", &ChunkerConfig::default());
//! assert_eq!(chunks, vec!["Cats are mammals. Dogs are mammals too.".to_string()]);
//! ```

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::RagError;
use crate::models::Chunk;

const PARAGRAPH_SEP: &str = "\n\n";
const SENTENCE_SEP: &str = " ";

/// Chunk size bounds, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Buffer size at which a chunk is emitted eagerly.
    pub target_size: usize,
    /// Hard upper bound on chunk length.
    pub max_size: usize,
    /// Window width for the fixed-width fallback.
    pub window_size: usize,
    /// Characters shared by consecutive fallback windows.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: 1000,
            max_size: 1500,
            window_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<(), RagError> {
        if self.target_size == 0 {
            return Err(RagError::InvalidInput(
                "chunking.target_size must be > 0".into(),
            ));
        }
        if self.max_size < self.target_size {
            return Err(RagError::InvalidInput(
                "chunking.max_size must be >= chunking.target_size".into(),
            ));
        }
        if self.window_size == 0 || self.window_size > self.max_size {
            return Err(RagError::InvalidInput(
                "chunking.window_size must be in 1..=max_size".into(),
            ));
        }
        if self.overlap >= self.window_size {
            return Err(RagError::InvalidInput(
                "chunking.overlap must be < chunking.window_size".into(),
            ));
        }
        Ok(())
    }
}

/// Running chunk buffer with its length in characters.
#[derive(Default)]
struct Accumulator {
    out: Vec<String>,
    buf: String,
    buf_len: usize,
}

impl Accumulator {
    fn would_overflow(&self, sep: &str, piece_len: usize, max: usize) -> bool {
        !self.buf.is_empty() && self.buf_len + sep.len() + piece_len > max
    }

    fn append(&mut self, sep: &str, piece: &str, piece_len: usize) {
        if !self.buf.is_empty() {
            self.buf.push_str(sep);
            self.buf_len += sep.len();
        }
        self.buf.push_str(piece);
        self.buf_len += piece_len;
    }

    fn flush(&mut self) {
        let trimmed = self.buf.trim();
        if !trimmed.is_empty() {
            self.out.push(trimmed.to_string());
        }
        self.buf.clear();
        self.buf_len = 0;
    }
}

/// Split `text` into ordered chunks. Empty or blank text yields no chunks.
///
/// No returned chunk is longer than `config.max_size` characters, provided
/// the config passes [`ChunkerConfig::validate`].
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let max = config.max_size.max(1);
    let window = config.window_size.clamp(1, max);
    let mut acc = Accumulator::default();

    for para in split_paragraphs(text) {
        let para_len = para.chars().count();

        if acc.would_overflow(PARAGRAPH_SEP, para_len, max) {
            acc.flush();
        }

        if para_len > config.target_size {
            let mut sep = PARAGRAPH_SEP;
            for sentence in split_sentences(&para) {
                let len = sentence.chars().count();
                if len > max {
                    acc.flush();
                    acc.out
                        .extend(sliding_windows(sentence, window, config.overlap));
                    continue;
                }
                if acc.would_overflow(sep, len, max) {
                    acc.flush();
                }
                acc.append(sep, sentence, len);
                sep = SENTENCE_SEP;
            }
        } else {
            acc.append(PARAGRAPH_SEP, &para, para_len);
        }

        if acc.buf_len >= config.target_size {
            acc.flush();
        }
    }

    acc.flush();
    acc.out
}

/// Chunk a document's text into [`Chunk`]s with contiguous indices and
/// content hashes.
pub fn chunk_document(document_id: &str, text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    chunk_text(text, config)
        .into_iter()
        .enumerate()
        .map(|(i, text)| make_chunk(document_id, i as i64, text))
        .collect()
}

fn make_chunk(document_id: &str, index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        document_id: document_id.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}

/// Split on blank lines. Lines inside a paragraph keep their newlines.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs.retain(|p| !p.is_empty());
    paragraphs
}

/// Split after `.`, `!` or `?` when followed by whitespace. Terminators
/// stay attached to their sentence.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(_, next)) = chars.peek() {
            if next.is_whitespace() {
                let end = i + c.len_utf8();
                let sentence = paragraph[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }

    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Fixed-width character windows advancing by `window - overlap`.
fn sliding_windows(text: &str, window: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let window = window.max(1);
    let stride = window.saturating_sub(overlap).max(1);

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + window).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += stride;
    }
    pieces
}
