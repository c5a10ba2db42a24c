//! Retrieval-augmented guideline lookup: chunking, deterministic
//! embeddings, and cosine-similarity queries over ingested documents.

pub mod chunking;
pub mod embedding;
pub mod fixtures;
pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chunking::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use embedding::{cosine_similarity, HashedEmbedder, DEFAULT_EMBEDDING_DIM};
pub use store::{DocumentStats, GuidelineStore};

pub const DEFAULT_TOP_K: usize = 5;

/// A guideline document submitted for ingestion. `doc_id` is the stable
/// document identity; bumping `version` marks a conscious rebuild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineDocument {
    pub doc_id: String,
    pub version: String,
    pub body: String,
}

/// One retrievable unit of guideline text. Produced only by the store;
/// immutable once returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievalChunk {
    pub doc_id: String,
    pub doc_version: String,
    pub section: String,
    pub chunk_id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Cosine similarity against the query; higher is better.
    pub relevance_score: f64,
}

impl RetrievalChunk {
    /// Citation key in `doc_id:section` form.
    pub fn citation_key(&self) -> String {
        format!("{}:{}", self.doc_id, self.section)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub documents: usize,
    pub chunks: usize,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("retrieval store unavailable: {0}")]
    Unavailable(String),
    #[error("guideline ingestion failed: {0}")]
    Ingest(String),
}

/// Read path of the retrieval store: one query returning the `k` most
/// relevant chunks ordered by relevance descending.
pub trait GuidelineRetriever: Send + Sync {
    fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalChunk>, RetrievalError>;
}

impl<T: GuidelineRetriever + ?Sized> GuidelineRetriever for std::sync::Arc<T> {
    fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalChunk>, RetrievalError> {
        (**self).query(text, k)
    }
}
