//! Wiring: build a [`RagEngine`] over SQLite from a [`Config`].

use anyhow::{Context, Result};

use support_rag_core::embedding::HashingEmbedder;
use support_rag_core::RagEngine;

use crate::config::Config;
use crate::generation::create_generator;
use crate::migrate::init_db;
use crate::sqlite_store::SqliteStore;

/// Validate `config`, open (and migrate) the configured database, and
/// assemble the engine with the configured chunking, ranking, and generator.
pub async fn open(config: &Config) -> Result<RagEngine<SqliteStore>> {
    config.validate().context("Invalid configuration")?;

    let pool = init_db(config).await?;
    let generator = create_generator(&config.generation)?;
    tracing::info!(
        db = %config.db.path.display(),
        generator = generator.name(),
        top_k = config.retrieval.top_k,
        dims = config.retrieval.dims,
        "engine ready"
    );

    Ok(RagEngine::new(SqliteStore::new(pool), generator)
        .with_embedder(Box::new(HashingEmbedder::new(config.retrieval.dims)))
        .with_chunker(config.chunking)
        .with_ranking(config.retrieval))
}
