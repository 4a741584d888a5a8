//! File ingestion.
//!
//! Bridges raw uploads to [`RagEngine::ingest_document`]: the file type
//! comes from the name's extension, the size is rounded to whole KB, and
//! the text is produced by [`extract`](crate::extract). Size and type are
//! checked before any extraction work is done.

use std::path::Path;

use anyhow::{Context, Result};

use support_rag_core::models::{FileType, NewDocument, MAX_FILE_SIZE_KB};
use support_rag_core::store::Store;
use support_rag_core::{IngestReport, RagEngine, RagError};

use crate::extract::extract_text;

/// Bytes to KB, rounded to the nearest whole KB.
pub fn size_kb(len: u64) -> u64 {
    (len + 512) / 1024
}

/// File type from the last extension of `file_name`.
pub fn file_type_of(file_name: &str) -> Result<FileType, RagError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| RagError::UnsupportedFileType(file_name.to_string()))?;
    ext.parse()
}

fn check_size(len: u64) -> Result<u64, RagError> {
    let kb = size_kb(len);
    if kb > MAX_FILE_SIZE_KB {
        return Err(RagError::FileTooLarge {
            size_kb: kb,
            max_kb: MAX_FILE_SIZE_KB,
        });
    }
    Ok(kb)
}

/// Ingest an uploaded file given its original name and raw bytes.
pub async fn ingest_bytes<S: Store>(
    engine: &RagEngine<S>,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<IngestReport> {
    let file_type = file_type_of(file_name)?;
    let kb = check_size(bytes.len() as u64)?;

    // PDF parsing is CPU-bound
    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, file_type))
        .await
        .context("extraction task panicked")?
        .with_context(|| format!("Failed to extract text from {}", file_name))?;

    let doc = NewDocument::new(file_name, file_type.as_str(), text, kb)?;
    let report = engine.ingest_document(&doc).await?;

    tracing::info!(
        file_name,
        document_id = %report.document_id,
        chunks = report.chunks_total,
        failed = report.chunks_failed,
        "file ingested"
    );
    Ok(report)
}

/// Read and ingest a file from disk.
pub async fn ingest_file<S: Store>(engine: &RagEngine<S>, path: &Path) -> Result<IngestReport> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?
        .to_string();
    file_type_of(&file_name)?;

    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    check_size(meta.len())?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ingest_bytes(engine, &file_name, bytes).await
}
