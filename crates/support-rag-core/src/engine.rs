//! Retrieval orchestrator.
//!
//! [`RagEngine`] ties the pipeline together over an injected [`Store`] and
//! [`Generator`]:
//!
//! - **ingest**: validate → store document → chunk → embed each chunk →
//!   store embeddings. A failing chunk is logged and skipped.
//! - **query**: embed question → scan every stored embedding → rank →
//!   top-k chunk texts → generator. Generation failures become a local
//!   fallback answer built from the retrieved chunks.
//!
//! Embedding and ranking are pure functions of stored state, so repeated
//! queries over an unchanged corpus retrieve the same context.

use serde::Serialize;

use crate::chunk::{chunk_document, ChunkerConfig};
use crate::embedding::{EmbeddingProvider, HashingEmbedder};
use crate::error::RagError;
use crate::generate::{
    fallback_answer, GenerationRequest, Generator, WidgetConfig, APOLOGY, EMPTY_QUERY_REPLY,
};
use crate::models::{Document, NewDocument};
use crate::search::{rank, Candidate, RankOptions, RankedChunk};
use crate::store::Store;

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunks_total: usize,
    pub chunks_embedded: usize,
    pub chunks_failed: usize,
}

/// The RAG engine.
pub struct RagEngine<S: Store> {
    store: S,
    generator: Box<dyn Generator>,
    embedder: Box<dyn EmbeddingProvider>,
    chunker: ChunkerConfig,
    ranking: RankOptions,
}

impl<S: Store> RagEngine<S> {
    /// Engine with the 1536-dim [`HashingEmbedder`] and default chunking and
    /// ranking settings.
    pub fn new(store: S, generator: Box<dyn Generator>) -> Self {
        let ranking = RankOptions::default();
        Self {
            store,
            generator,
            embedder: Box::new(HashingEmbedder::new(ranking.dims)),
            chunker: ChunkerConfig::default(),
            ranking,
        }
    }

    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// Replace ranking options. The installed embedder always wins on
    /// dimensionality; use [`with_embedder`](Self::with_embedder) to change it.
    pub fn with_ranking(mut self, ranking: RankOptions) -> Self {
        let dims = self.embedder.dims();
        if ranking.dims != dims {
            tracing::warn!(
                requested = ranking.dims,
                embedder = self.embedder.model_name(),
                dims,
                "ranking dims differ from embedder, keeping embedder dims"
            );
        }
        self.ranking = RankOptions { dims, ..ranking };
        self
    }

    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingProvider>) -> Self {
        self.ranking.dims = embedder.dims();
        self.embedder = embedder;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ranking(&self) -> &RankOptions {
        &self.ranking
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    /// Store a document and embed its chunks.
    ///
    /// Fails only when the document itself cannot be stored; per-chunk
    /// failures are counted in the report.
    pub async fn ingest_document(&self, doc: &NewDocument) -> Result<IngestReport, RagError> {
        let stored = self
            .store
            .create_document(doc)
            .await
            .map_err(RagError::store)?;
        tracing::info!(
            document_id = %stored.id,
            file_name = %stored.file_name,
            file_type = %stored.file_type,
            "document stored"
        );
        Ok(self.embed_document(&stored).await)
    }

    /// Validate raw upload fields, then [`ingest_document`](Self::ingest_document).
    pub async fn ingest_text(
        &self,
        file_name: &str,
        file_type: &str,
        content: &str,
        file_size_kb: u64,
    ) -> Result<IngestReport, RagError> {
        let doc = NewDocument::new(file_name, file_type, content, file_size_kb)?;
        self.ingest_document(&doc).await
    }

    /// Fully replace a document and rebuild its embeddings
    /// (delete, then recreate).
    pub async fn replace_document(
        &self,
        id: &str,
        doc: &NewDocument,
    ) -> Result<IngestReport, RagError> {
        let stored = self
            .store
            .replace_document(id, doc)
            .await
            .map_err(RagError::store)?
            .ok_or_else(|| RagError::NotFound(id.to_string()))?;
        self.store
            .delete_embeddings_by_document_id(id)
            .await
            .map_err(RagError::store)?;
        Ok(self.embed_document(&stored).await)
    }

    /// Delete a document and every embedding derived from it.
    ///
    /// The store performs the cascade atomically; any embeddings still
    /// reachable afterwards are removed before returning.
    pub async fn delete_document(&self, id: &str) -> Result<bool, RagError> {
        let deleted = self
            .store
            .delete_document(id)
            .await
            .map_err(RagError::store)?;

        let leftovers = self
            .store
            .get_embeddings_by_document_id(id)
            .await
            .map_err(RagError::store)?;
        if !leftovers.is_empty() {
            tracing::warn!(
                document_id = %id,
                count = leftovers.len(),
                "removing orphaned embeddings"
            );
            self.store
                .delete_embeddings_by_document_id(id)
                .await
                .map_err(RagError::store)?;
        }

        if deleted {
            tracing::info!(document_id = %id, "document deleted");
        }
        Ok(deleted)
    }

    async fn embed_document(&self, doc: &Document) -> IngestReport {
        let chunks = chunk_document(&doc.id, &doc.content, &self.chunker);
        let mut embedded = 0;
        let mut failed = 0;

        for chunk in &chunks {
            let vector = match self.embedder.embed(&chunk.text) {
                Ok(v) if v.len() == self.ranking.dims => v,
                Ok(v) => {
                    let err = RagError::DimensionMismatch {
                        expected: self.ranking.dims,
                        actual: v.len(),
                    };
                    tracing::warn!(
                        document_id = %doc.id,
                        chunk_index = chunk.chunk_index,
                        error = %err,
                        "failed to embed chunk"
                    );
                    failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        document_id = %doc.id,
                        chunk_index = chunk.chunk_index,
                        error = %e,
                        "failed to embed chunk"
                    );
                    failed += 1;
                    continue;
                }
            };

            match self
                .store
                .create_embedding(&doc.id, chunk.chunk_index, &chunk.text, &vector)
                .await
            {
                Ok(_) => embedded += 1,
                Err(e) => {
                    tracing::warn!(
                        document_id = %doc.id,
                        chunk_index = chunk.chunk_index,
                        error = %e,
                        "failed to store embedding"
                    );
                    failed += 1;
                }
            }
        }

        tracing::info!(
            document_id = %doc.id,
            chunks = chunks.len(),
            embedded,
            failed,
            "document embedded"
        );

        IngestReport {
            document_id: doc.id.clone(),
            chunks_total: chunks.len(),
            chunks_embedded: embedded,
            chunks_failed: failed,
        }
    }

    /// Collect every stored embedding as a ranking candidate.
    ///
    /// A document whose embeddings cannot be read contributes nothing.
    async fn gather_candidates(&self) -> Vec<Candidate> {
        let documents = match self.store.get_all_documents().await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list documents");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for doc in &documents {
            match self.store.get_embeddings_by_document_id(&doc.id).await {
                Ok(embeddings) => candidates.extend(embeddings.into_iter().map(Candidate::from)),
                Err(e) => {
                    tracing::warn!(document_id = %doc.id, error = %e, "failed to load embeddings");
                }
            }
        }
        candidates
    }

    /// Rank stored chunks against `query` and return the best `k`.
    pub async fn find_similar_chunks(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RankedChunk>, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".into()));
        }

        let candidates = self.gather_candidates().await;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query)?;
        let opts = RankOptions {
            top_k: k,
            ..self.ranking
        };
        rank(&query_vec, &candidates, &opts)
    }

    /// Answer a question from the knowledge base.
    ///
    /// Only an empty query is reported as an error. Retrieval problems,
    /// malformed widget settings, and generator failures all degrade to a
    /// text answer.
    pub async fn answer(&self, query: &str, config: &WidgetConfig) -> Result<String, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".into()));
        }

        let context: Vec<String> = match self.find_similar_chunks(query, self.ranking.top_k).await
        {
            Ok(chunks) => chunks.into_iter().map(|c| c.text).collect(),
            Err(e) => {
                tracing::error!(error = %e, query_len = query.len(), "retrieval failed");
                return Ok(APOLOGY.to_string());
            }
        };

        if context.is_empty() {
            tracing::info!(query_len = query.len(), "no context chunks found for query");
        } else {
            tracing::info!(
                count = context.len(),
                query_len = query.len(),
                "found relevant context chunks"
            );
        }

        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "malformed widget config, using fallback answer");
            let sanitized = WidgetConfig::from_raw(
                config.ai_tone.as_str(),
                i64::from(config.response_length),
                config.ai_instructions.clone(),
            );
            return Ok(fallback_answer(&context, &sanitized));
        }

        let request = GenerationRequest::new(query, context, config);
        match self.generator.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!(
                    generator = self.generator.name(),
                    "generator returned an empty answer, using fallback"
                );
                Ok(fallback_answer(&request.context, config))
            }
            Err(e) => {
                tracing::warn!(
                    generator = self.generator.name(),
                    error = %RagError::generation(&e),
                    "generation failed, using fallback"
                );
                Ok(fallback_answer(&request.context, config))
            }
        }
    }

    /// Like [`answer`](Self::answer), but always yields user-facing text.
    pub async fn reply(&self, query: &str, config: &WidgetConfig) -> String {
        match self.answer(query, config).await {
            Ok(text) => text,
            Err(RagError::InvalidInput(_)) => EMPTY_QUERY_REPLY.to_string(),
            Err(_) => APOLOGY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::bail;
    use async_trait::async_trait;

    use super::*;
    use crate::models::Embedding;
    use crate::store::memory::InMemoryStore;

    /// Records every request; optionally fails.
    struct StubGenerator {
        fail: bool,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl StubGenerator {
        fn ok() -> Self {
            Self {
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for StubGenerator {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                bail!("upstream timed out");
            }
            Ok(format!("answer with {} chunks", request.context.len()))
        }
    }

    fn engine_with(stub: StubGenerator) -> (RagEngine<InMemoryStore>, Arc<StubGenerator>) {
        let stub = Arc::new(stub);
        let engine = RagEngine::new(InMemoryStore::new(), Box::new(stub.clone()));
        (engine, stub)
    }

    #[tokio::test]
    async fn test_ingest_single_small_document() {
        let (engine, _) = engine_with(StubGenerator::ok());
        let report = engine
            .ingest_text("pets.txt", "txt", "Cats are mammals. Dogs are mammals too.", 1)
            .await
            .unwrap();
        assert_eq!(report.chunks_total, 1);
        assert_eq!(report.chunks_embedded, 1);
        assert_eq!(report.chunks_failed, 0);

        let embs = engine
            .store()
            .get_embeddings_by_document_id(&report.document_id)
            .await
            .unwrap();
        assert_eq!(embs.len(), 1);
        assert_eq!(embs[0].vector.len(), 1536);
    }

    #[tokio::test]
    async fn test_ingest_rejects_bad_upload() {
        let (engine, _) = engine_with(StubGenerator::ok());
        let err = engine.ingest_text("x.exe", "exe", "data", 1).await.unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFileType(_)));
        assert!(engine.store().get_all_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_finds_relevant_chunk() {
        let (engine, _) = engine_with(StubGenerator::ok());
        engine
            .ingest_text("pets.txt", "txt", "Cats are mammals. Dogs are mammals too.", 1)
            .await
            .unwrap();
        let results = engine.find_similar_chunks("What are cats?", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.0);
        assert_eq!(results[0].text, "Cats are mammals. Dogs are mammals too.");
    }

    #[tokio::test]
    async fn test_answer_falls_back_when_generator_fails() {
        let (engine, stub) = engine_with(StubGenerator::failing());
        engine
            .ingest_text("pets.txt", "txt", "Cats are mammals. Dogs are mammals too.", 1)
            .await
            .unwrap();
        let answer = engine
            .answer("What are cats?", &WidgetConfig::default())
            .await
            .unwrap();
        assert!(answer.contains("Cats are mammals."));
        assert!(answer.starts_with("Based on the information in our knowledge base"));
        assert_eq!(stub.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_answer_without_documents_still_calls_generator() {
        let (engine, stub) = engine_with(StubGenerator::ok());
        assert!(engine.find_similar_chunks("anything", 5).await.unwrap().is_empty());

        let answer = engine.answer("anything", &WidgetConfig::default()).await.unwrap();
        assert_eq!(answer, "answer with 0 chunks");
        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].context.is_empty());
    }

    #[tokio::test]
    async fn test_answer_without_documents_and_failing_generator() {
        let (engine, _) = engine_with(StubGenerator::failing());
        let answer = engine.answer("anything", &WidgetConfig::default()).await.unwrap();
        assert!(!answer.is_empty());
        assert!(answer.contains("knowledge base"));
    }

    #[tokio::test]
    async fn test_empty_query_is_structured_error() {
        let (engine, stub) = engine_with(StubGenerator::ok());
        let err = engine.answer("   ", &WidgetConfig::default()).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
        assert_eq!(engine.reply("", &WidgetConfig::default()).await, EMPTY_QUERY_REPLY);
        assert!(stub.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_config_uses_fallback() {
        let (engine, stub) = engine_with(StubGenerator::ok());
        engine
            .ingest_text("faq.md", "md", "Refunds are processed within 5 days.", 1)
            .await
            .unwrap();
        let bad = WidgetConfig {
            response_length: 9,
            ..WidgetConfig::default()
        };
        let answer = engine.answer("refunds", &bad).await.unwrap();
        assert!(answer.contains("Refunds are processed within 5 days."));
        assert!(stub.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_passed_in_rank_order_with_top_k() {
        let (engine, stub) = engine_with(StubGenerator::ok());
        for i in 0..8 {
            engine
                .ingest_text(&format!("doc{}.txt", i), "txt", &format!("shipping note {}", i), 1)
                .await
                .unwrap();
        }
        let answer = engine.answer("shipping", &WidgetConfig::default()).await.unwrap();
        assert_eq!(answer, "answer with 5 chunks");
        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen[0].context.len(), 5);
    }

    #[tokio::test]
    async fn test_delete_document_removes_embeddings() {
        let (engine, _) = engine_with(StubGenerator::ok());
        let report = engine
            .ingest_text("a.txt", "txt", "Alpha paragraph.\n\nBeta paragraph.", 1)
            .await
            .unwrap();
        assert!(engine.delete_document(&report.document_id).await.unwrap());
        assert!(engine
            .store()
            .get_embeddings_by_document_id(&report.document_id)
            .await
            .unwrap()
            .is_empty());
        assert!(engine.find_similar_chunks("alpha", 5).await.unwrap().is_empty());
        assert!(!engine.delete_document(&report.document_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_document_rebuilds_embeddings() {
        let (engine, _) = engine_with(StubGenerator::ok());
        let report = engine
            .ingest_text("a.txt", "txt", "Old content about billing.", 1)
            .await
            .unwrap();
        let new_doc = NewDocument::new("a.txt", "txt", "New content about returns.", 1).unwrap();
        let replaced = engine
            .replace_document(&report.document_id, &new_doc)
            .await
            .unwrap();
        assert_eq!(replaced.document_id, report.document_id);

        let embs = engine
            .store()
            .get_embeddings_by_document_id(&report.document_id)
            .await
            .unwrap();
        assert_eq!(embs.len(), 1);
        assert_eq!(embs[0].content, "New content about returns.");

        let missing = engine.replace_document("nope", &new_doc).await.unwrap_err();
        assert!(matches!(missing, RagError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dedup_option_limits_one_chunk_per_document() {
        let paragraph_chunks = ChunkerConfig {
            target_size: 10,
            max_size: 30,
            window_size: 10,
            overlap: 2,
        };
        let text = "returns policy one\n\nreturns policy two\n\nreturns policy three";

        let (plain, _) = engine_with(StubGenerator::ok());
        let plain = plain.with_chunker(paragraph_chunks);
        plain.ingest_text("a.txt", "txt", text, 1).await.unwrap();
        plain.ingest_text("b.txt", "txt", "returns policy four", 1).await.unwrap();
        assert_eq!(plain.find_similar_chunks("returns policy", 5).await.unwrap().len(), 4);

        let (dedup, _) = engine_with(StubGenerator::ok());
        let dedup = dedup.with_chunker(paragraph_chunks).with_ranking(RankOptions {
            dedup_by_document: true,
            ..RankOptions::default()
        });
        dedup.ingest_text("a.txt", "txt", text, 1).await.unwrap();
        dedup.ingest_text("b.txt", "txt", "returns policy four", 1).await.unwrap();
        let results = dedup.find_similar_chunks("returns policy", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_ne!(results[0].document_id, results[1].document_id);
    }

    #[tokio::test]
    async fn test_repeated_queries_are_stable() {
        let (engine, _) = engine_with(StubGenerator::ok());
        for (name, body) in [
            ("a.txt", "Orders ship within two days.\n\nExpress shipping costs extra."),
            ("b.txt", "Returns are accepted for thirty days.\n\nRefunds go to the original card."),
        ] {
            engine.ingest_text(name, "txt", body, 1).await.unwrap();
        }
        let first = engine.find_similar_chunks("how fast is shipping", 2).await.unwrap();
        let second = engine.find_similar_chunks("how fast is shipping", 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    /// Hashing embedder that refuses any text containing "poison".
    struct FlakyEmbedder(HashingEmbedder);

    impl EmbeddingProvider for FlakyEmbedder {
        fn model_name(&self) -> &str {
            "flaky"
        }

        fn dims(&self) -> usize {
            self.0.dims()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            if text.contains("poison") {
                return Err(RagError::InvalidInput("refused".into()));
            }
            self.0.embed(text)
        }
    }

    #[tokio::test]
    async fn test_failing_chunk_is_skipped_not_fatal() {
        let (engine, _) = engine_with(StubGenerator::ok());
        let engine = engine
            .with_chunker(ChunkerConfig {
                target_size: 10,
                max_size: 60,
                window_size: 10,
                overlap: 2,
            })
            .with_embedder(Box::new(FlakyEmbedder(HashingEmbedder::new(64))));
        assert_eq!(engine.ranking().dims, 64);

        let report = engine
            .ingest_text(
                "mixed.txt",
                "txt",
                "First paragraph is fine.\n\nThis one has poison in it.\n\nThird paragraph is fine.",
                1,
            )
            .await
            .unwrap();
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_embedded, 2);
        assert_eq!(report.chunks_failed, 1);

        let embs = engine
            .store()
            .get_embeddings_by_document_id(&report.document_id)
            .await
            .unwrap();
        assert_eq!(
            embs.iter().map(|e| e.chunk_index).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert!(embs.iter().all(|e| e.vector.len() == 64));
    }

    #[tokio::test]
    async fn test_ranking_after_custom_embedder_keeps_it() {
        let (engine, _) = engine_with(StubGenerator::ok());
        let engine = engine
            .with_embedder(Box::new(FlakyEmbedder(HashingEmbedder::new(64))))
            .with_ranking(RankOptions {
                dedup_by_document: true,
                ..RankOptions::default()
            });
        assert_eq!(engine.embedder().model_name(), "flaky");
        assert_eq!(engine.ranking().dims, 64);
        assert!(engine.ranking().dedup_by_document);

        engine
            .ingest_text("a.txt", "txt", "Orders ship within two days.", 1)
            .await
            .unwrap();
        let results = engine.find_similar_chunks("orders ship", 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_builder_order_does_not_matter() {
        let opts = RankOptions {
            top_k: 3,
            ..RankOptions::default()
        };
        let (a, _) = engine_with(StubGenerator::ok());
        let a = a
            .with_ranking(opts)
            .with_embedder(Box::new(FlakyEmbedder(HashingEmbedder::new(32))));
        let (b, _) = engine_with(StubGenerator::ok());
        let b = b
            .with_embedder(Box::new(FlakyEmbedder(HashingEmbedder::new(32))))
            .with_ranking(opts);
        assert_eq!(a.ranking(), b.ranking());
        assert_eq!(a.embedder().model_name(), b.embedder().model_name());
    }

    /// In-memory store that fails on demand: listing, reading one
    /// document's embeddings, or writing chunks containing "unwritable".
    #[derive(Default)]
    struct FailingStore {
        inner: InMemoryStore,
        fail_listing: AtomicBool,
        unreadable: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Store for FailingStore {
        async fn create_document(&self, doc: &NewDocument) -> anyhow::Result<Document> {
            self.inner.create_document(doc).await
        }

        async fn get_document(&self, id: &str) -> anyhow::Result<Option<Document>> {
            self.inner.get_document(id).await
        }

        async fn get_all_documents(&self) -> anyhow::Result<Vec<Document>> {
            if self.fail_listing.load(Ordering::SeqCst) {
                bail!("database is locked");
            }
            self.inner.get_all_documents().await
        }

        async fn replace_document(
            &self,
            id: &str,
            doc: &NewDocument,
        ) -> anyhow::Result<Option<Document>> {
            self.inner.replace_document(id, doc).await
        }

        async fn delete_document(&self, id: &str) -> anyhow::Result<bool> {
            self.inner.delete_document(id).await
        }

        async fn get_embeddings_by_document_id(&self, id: &str) -> anyhow::Result<Vec<Embedding>> {
            let unreadable = self.unreadable.lock().unwrap().as_deref() == Some(id);
            if unreadable {
                bail!("disk I/O error");
            }
            self.inner.get_embeddings_by_document_id(id).await
        }

        async fn create_embedding(
            &self,
            document_id: &str,
            chunk_index: i64,
            content: &str,
            vector: &[f32],
        ) -> anyhow::Result<Embedding> {
            if content.contains("unwritable") {
                bail!("disk full");
            }
            self.inner
                .create_embedding(document_id, chunk_index, content, vector)
                .await
        }

        async fn delete_embeddings_by_document_id(&self, id: &str) -> anyhow::Result<bool> {
            self.inner.delete_embeddings_by_document_id(id).await
        }
    }

    fn failing_engine() -> (RagEngine<FailingStore>, Arc<StubGenerator>) {
        let stub = Arc::new(StubGenerator::ok());
        let engine = RagEngine::new(FailingStore::default(), Box::new(stub.clone())).with_chunker(
            ChunkerConfig {
                target_size: 10,
                max_size: 60,
                window_size: 10,
                overlap: 2,
            },
        );
        (engine, stub)
    }

    #[tokio::test]
    async fn test_unreadable_document_is_skipped_in_ranking() {
        let (engine, stub) = failing_engine();
        let broken = engine
            .ingest_text("broken.txt", "txt", "Shipping takes five days.", 1)
            .await
            .unwrap();
        let healthy = engine
            .ingest_text("healthy.txt", "txt", "Shipping is free over fifty dollars.", 1)
            .await
            .unwrap();
        *engine.store().unreadable.lock().unwrap() = Some(broken.document_id.clone());

        let results = engine.find_similar_chunks("shipping", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, healthy.document_id);

        let answer = engine.answer("shipping", &WidgetConfig::default()).await.unwrap();
        assert_eq!(answer, "answer with 1 chunks");
        assert_eq!(stub.seen.lock().unwrap()[0].context.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_means_no_candidates() {
        let (engine, stub) = failing_engine();
        engine
            .ingest_text("a.txt", "txt", "Shipping takes five days.", 1)
            .await
            .unwrap();
        engine.store().fail_listing.store(true, Ordering::SeqCst);

        assert!(engine.find_similar_chunks("shipping", 5).await.unwrap().is_empty());
        let answer = engine.answer("shipping", &WidgetConfig::default()).await.unwrap();
        assert_eq!(answer, "answer with 0 chunks");
        assert!(stub.seen.lock().unwrap()[0].context.is_empty());
    }

    #[tokio::test]
    async fn test_store_write_failures_are_counted() {
        let (engine, _) = failing_engine();
        let report = engine
            .ingest_text(
                "mixed.txt",
                "txt",
                "First paragraph is fine.\n\nThis chunk is unwritable.\n\nThird paragraph is fine.",
                1,
            )
            .await
            .unwrap();
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_embedded, 2);
        assert_eq!(report.chunks_failed, 1);

        let embs = engine
            .store()
            .get_embeddings_by_document_id(&report.document_id)
            .await
            .unwrap();
        assert_eq!(
            embs.iter().map(|e| e.chunk_index).collect::<Vec<_>>(),
            vec![0, 2]
        );
    }
}
