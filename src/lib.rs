//! # Support RAG
//!
//! Retrieval-augmented answering for a customer-support chat widget.
//!
//! Uploaded documents are split into paragraph/sentence-aware chunks,
//! embedded with a deterministic hashing embedder, and stored in SQLite.
//! A question is embedded the same way, ranked against every stored chunk
//! by cosine similarity, and the best chunks are handed to a
//! chat-completions endpoint. When that endpoint is unavailable the
//! answer is assembled locally from the retrieved chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌──────────┐
//! │ ingest       │──▶│ support-rag-core   │──▶│  SQLite  │
//! │ extract      │   │ chunk+embed+rank   │   │ (sqlx)   │
//! └──────────────┘   └─────────┬──────────┘   └──────────┘
//!                              ▼
//!                      ┌────────────────┐
//!                      │ generation     │
//!                      │ (chat API)     │
//!                      └────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`generation`] | Chat-completions generator |
//! | [`extract`] | PDF/DOCX/HTML text extraction |
//! | [`ingest`] | File ingestion |
//! | [`engine`] | Engine assembly from config |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod db;
pub mod engine;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod sqlite_store;

pub use support_rag_core::{IngestReport, RagEngine, RagError};
