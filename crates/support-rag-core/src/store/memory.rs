//! In-memory [`Store`] implementation for tests and embedded use.
//!
//! Documents and embeddings live in `Vec`s behind one `std::sync::RwLock`,
//! so a cascading delete is a single critical section. Each instance is
//! created explicitly and can be cleared with [`InMemoryStore::reset`].

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Document, Embedding, NewDocument};

use super::Store;

#[derive(Default)]
struct Tables {
    documents: Vec<Document>,
    embeddings: Vec<Embedding>,
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every document and embedding.
    pub fn reset(&self) -> Result<()> {
        let mut tables = self.write()?;
        tables.documents.clear();
        tables.embeddings.clear();
        Ok(())
    }

    pub fn embedding_count(&self) -> Result<usize> {
        Ok(self.read()?.embeddings.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_document(&self, doc: &NewDocument) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4().to_string(),
            file_name: doc.file_name.clone(),
            file_type: doc.file_type,
            file_size_kb: doc.file_size_kb,
            content: doc.content.clone(),
            uploaded_at: chrono::Utc::now().timestamp(),
        };
        self.write()?.documents.push(document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn get_all_documents(&self) -> Result<Vec<Document>> {
        Ok(self.read()?.documents.clone())
    }

    async fn replace_document(&self, id: &str, doc: &NewDocument) -> Result<Option<Document>> {
        let mut tables = self.write()?;
        let Some(existing) = tables.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        existing.file_name = doc.file_name.clone();
        existing.file_type = doc.file_type;
        existing.file_size_kb = doc.file_size_kb;
        existing.content = doc.content.clone();
        existing.uploaded_at = chrono::Utc::now().timestamp();
        Ok(Some(existing.clone()))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tables = self.write()?;
        let before = tables.documents.len();
        tables.documents.retain(|d| d.id != id);
        if tables.documents.len() == before {
            return Ok(false);
        }
        tables.embeddings.retain(|e| e.document_id != id);
        Ok(true)
    }

    async fn get_embeddings_by_document_id(&self, id: &str) -> Result<Vec<Embedding>> {
        let mut embeddings: Vec<Embedding> = self
            .read()?
            .embeddings
            .iter()
            .filter(|e| e.document_id == id)
            .cloned()
            .collect();
        embeddings.sort_by_key(|e| e.chunk_index);
        Ok(embeddings)
    }

    async fn create_embedding(
        &self,
        document_id: &str,
        chunk_index: i64,
        content: &str,
        vector: &[f32],
    ) -> Result<Embedding> {
        let mut tables = self.write()?;
        if !tables.documents.iter().any(|d| d.id == document_id) {
            bail!("cannot embed chunk for unknown document {}", document_id);
        }
        let embedding = Embedding {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            chunk_index,
            content: content.to_string(),
            vector: vector.to_vec(),
        };
        tables.embeddings.push(embedding.clone());
        Ok(embedding)
    }

    async fn delete_embeddings_by_document_id(&self, id: &str) -> Result<bool> {
        let mut tables = self.write()?;
        let before = tables.embeddings.len();
        tables.embeddings.retain(|e| e.document_id != id);
        Ok(tables.embeddings.len() != before)
    }
}
