//! Storage abstraction for the knowledge base.
//!
//! The [`Store`] trait is the only way the engine reaches persisted
//! documents and embeddings, enabling pluggable backends (SQLite,
//! in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, Embedding, NewDocument};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_document`](Store::create_document) | Persist a validated document |
/// | [`get_document`](Store::get_document) | Fetch one document |
/// | [`get_all_documents`](Store::get_all_documents) | All documents, oldest first |
/// | [`replace_document`](Store::replace_document) | Full replacement of a document's fields |
/// | [`delete_document`](Store::delete_document) | Remove a document and all its embeddings |
/// | [`get_embeddings_by_document_id`](Store::get_embeddings_by_document_id) | Embeddings of one document, by chunk index |
/// | [`create_embedding`](Store::create_embedding) | Persist one chunk vector |
/// | [`delete_embeddings_by_document_id`](Store::delete_embeddings_by_document_id) | Drop a document's embeddings |
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_document(&self, doc: &NewDocument) -> Result<Document>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Documents in ingestion order. Ranking ties are broken by this order.
    async fn get_all_documents(&self) -> Result<Vec<Document>>;

    /// Replace a document's file name, type, size, and content. Returns
    /// `None` when no document has that id. Embeddings are left untouched.
    async fn replace_document(&self, id: &str, doc: &NewDocument) -> Result<Option<Document>>;

    /// Delete a document and cascade to its embeddings in one atomic step.
    /// Returns `false` when the document did not exist.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    async fn get_embeddings_by_document_id(&self, id: &str) -> Result<Vec<Embedding>>;

    async fn create_embedding(
        &self,
        document_id: &str,
        chunk_index: i64,
        content: &str,
        vector: &[f32],
    ) -> Result<Embedding>;

    /// Returns `true` when at least one embedding was removed.
    async fn delete_embeddings_by_document_id(&self, id: &str) -> Result<bool>;
}
