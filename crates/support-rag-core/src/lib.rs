//! # Support RAG Core
//!
//! Retrieval engine behind the support chat widget: data models, the
//! paragraph/sentence-aware chunker, the hashing embedder, cosine ranking,
//! the store abstraction, and the answer orchestrator.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Persistence and language-model access are injected through the
//! [`store::Store`] and [`generate::Generator`] traits.
//!
//! ## Data Flow
//!
//! ```text
//! ingest:  document ─▶ chunk ─▶ embed (per chunk) ─▶ Store::create_embedding
//! query:   question ─▶ embed ─▶ rank (full scan) ─▶ top-k chunks ─▶ Generator
//! ```

pub mod chunk;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generate;
pub mod models;
pub mod search;
pub mod store;

pub use engine::{IngestReport, RagEngine};
pub use error::RagError;
