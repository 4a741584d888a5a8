//! SQLite-backed [`Store`] implementation.
//!
//! Vectors are stored as little-endian `f32` BLOBs next to the chunk text,
//! so a ranking pass needs nothing but the `embeddings` table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use support_rag_core::embedding::{blob_to_vec, vec_to_blob};
use support_rag_core::models::{Document, Embedding, FileType, NewDocument};
use support_rag_core::store::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Remove every document and embedding.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM embeddings")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn embedding_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    let file_type: String = row.get("file_type");
    let file_type: FileType = file_type
        .parse()
        .with_context(|| format!("corrupt file_type in documents row: {}", file_type))?;
    let file_size_kb: i64 = row.get("file_size_kb");

    Ok(Document {
        id: row.get("id"),
        file_name: row.get("file_name"),
        file_type,
        file_size_kb: file_size_kb.max(0) as u64,
        content: row.get("content"),
        uploaded_at: row.get("uploaded_at"),
    })
}

/// Decode one embeddings row. Rows whose BLOB does not decode to exactly
/// `dims` floats are reported and yield `None`.
fn row_to_embedding(row: &SqliteRow) -> Option<Embedding> {
    let id: String = row.get("id");
    let blob: Vec<u8> = row.get("embedding");
    let dims: i64 = row.get("dims");
    if blob.len() % 4 != 0 || (blob.len() / 4) as i64 != dims {
        tracing::warn!(
            embedding_id = %id,
            blob_bytes = blob.len(),
            dims,
            "corrupt embedding blob, skipping"
        );
        return None;
    }

    Some(Embedding {
        id,
        document_id: row.get("document_id"),
        chunk_index: row.get("chunk_index"),
        content: row.get("content"),
        vector: blob_to_vec(&blob),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_document(&self, doc: &NewDocument) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4().to_string(),
            file_name: doc.file_name.clone(),
            file_type: doc.file_type,
            file_size_kb: doc.file_size_kb,
            content: doc.content.clone(),
            uploaded_at: chrono::Utc::now().timestamp(),
        };

        sqlx::query(
            r#"
            INSERT INTO documents (id, file_name, file_type, file_size_kb, content, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.file_name)
        .bind(document.file_type.as_str())
        .bind(document.file_size_kb as i64)
        .bind(&document.content)
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert document")?;

        Ok(document)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, file_name, file_type, file_size_kb, content, uploaded_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn get_all_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_name, file_type, file_size_kb, content, uploaded_at
            FROM documents
            ORDER BY uploaded_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn replace_document(&self, id: &str, doc: &NewDocument) -> Result<Option<Document>> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET file_name = ?, file_type = ?, file_size_kb = ?, content = ?, uploaded_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&doc.file_name)
        .bind(doc.file_type.as_str())
        .bind(doc.file_size_kb as i64)
        .bind(&doc.content)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_document(id).await
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM embeddings WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_embeddings_by_document_id(&self, id: &str) -> Result<Vec<Embedding>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, chunk_index, content, embedding, dims
            FROM embeddings
            WHERE document_id = ?
            ORDER BY chunk_index ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_embedding).collect())
    }

    async fn create_embedding(
        &self,
        document_id: &str,
        chunk_index: i64,
        content: &str,
        vector: &[f32],
    ) -> Result<Embedding> {
        let embedding = Embedding {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            chunk_index,
            content: content.to_string(),
            vector: vector.to_vec(),
        };

        sqlx::query(
            r#"
            INSERT INTO embeddings (id, document_id, chunk_index, content, embedding, dims)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&embedding.id)
        .bind(&embedding.document_id)
        .bind(embedding.chunk_index)
        .bind(&embedding.content)
        .bind(vec_to_blob(vector))
        .bind(vector.len() as i64)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "Failed to insert embedding {} for document {}",
                chunk_index, document_id
            )
        })?;

        Ok(embedding)
    }

    async fn delete_embeddings_by_document_id(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM embeddings WHERE document_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
