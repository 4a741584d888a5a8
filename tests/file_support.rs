//! File ingestion: type detection, size limits, and text extraction
//! feeding the engine.

use std::io::Write;
use std::path::{Path, PathBuf};

use support_rag::ingest::{ingest_bytes, ingest_file};
use support_rag::RagEngine;
use support_rag::RagError;
use support_rag_core::generate::DisabledGenerator;
use support_rag_core::models::{FileType, MAX_FILE_SIZE_KB};
use support_rag_core::store::memory::InMemoryStore;
use support_rag_core::store::Store;
use tempfile::TempDir;

fn engine() -> RagEngine<InMemoryStore> {
    RagEngine::new(InMemoryStore::new(), Box::new(DisabledGenerator))
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

#[tokio::test]
async fn markdown_file_is_ingested() {
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "Returns.MD",
        b"# Returns\n\nItems can be returned within 30 days.",
    );
    let engine = engine();

    let report = ingest_file(&engine, &path).await.unwrap();
    assert_eq!(report.chunks_total, 1);

    let doc = engine
        .store()
        .get_document(&report.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.file_name, "Returns.MD");
    assert_eq!(doc.file_type, FileType::Md);
    assert_eq!(doc.file_size_kb, 0);
}

#[tokio::test]
async fn docx_file_is_extracted_by_paragraph() {
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "handbook.docx",
        &minimal_docx(&["Vacation requests need two weeks notice.", "Remote work is allowed."]),
    );
    let engine = engine();

    let report = ingest_file(&engine, &path).await.unwrap();
    let doc = engine
        .store()
        .get_document(&report.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        doc.content,
        "Vacation requests need two weeks notice.\n\nRemote work is allowed."
    );
    assert_eq!(doc.file_type, FileType::Docx);

    let results = engine
        .find_similar_chunks("vacation requests notice", 1)
        .await
        .unwrap();
    assert_eq!(results[0].document_id, report.document_id);
}

#[tokio::test]
async fn html_upload_is_stripped() {
    let engine = engine();
    let html = b"<html><body><h1>Contact</h1><p>Email support@example.com</p><script>track()</script></body></html>";

    let report = ingest_bytes(&engine, "contact.html", html.to_vec()).await.unwrap();
    let doc = engine
        .store()
        .get_document(&report.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.content, "Contact\n\nEmail support@example.com");
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "slides.pptx", b"whatever");
    let engine = engine();

    let err = ingest_file(&engine, &path).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RagError>(),
        Some(RagError::UnsupportedFileType(_))
    ));
    assert!(engine.store().get_all_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_file_is_rejected_before_reading() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("huge.txt");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len((MAX_FILE_SIZE_KB + 1) * 1024).unwrap();
    let engine = engine();

    let err = ingest_file(&engine, &path).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RagError>(),
        Some(RagError::FileTooLarge { .. })
    ));
}

#[tokio::test]
async fn broken_pdf_is_reported_and_nothing_stored() {
    let engine = engine();
    let err = ingest_bytes(&engine, "manual.pdf", b"not a pdf".to_vec())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("manual.pdf"));
    assert!(engine.store().get_all_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_text_file_is_rejected() {
    let engine = engine();
    let err = ingest_bytes(&engine, "blank.txt", b"   \n\n ".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RagError>(),
        Some(RagError::InvalidInput(_))
    ));
}
