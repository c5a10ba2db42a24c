use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::retrieval::chunking::{chunk_text, split_into_sections, ChunkingConfig};
use crate::retrieval::embedding::{cosine_similarity, HashedEmbedder};
use crate::retrieval::{
    GuidelineDocument, GuidelineRetriever, IngestSummary, RetrievalChunk, RetrievalError,
};

struct IndexedChunk {
    doc_id: String,
    doc_version: String,
    section: String,
    chunk_id: String,
    text: String,
    embedding: Vec<f32>,
}

/// In-process vector store over guideline chunks. Queries take the read
/// lock; ingestion rebuilds the whole collection under the write lock, so
/// a rebuild blocks queries instead of interleaving with them.
pub struct GuidelineStore {
    embedder: HashedEmbedder,
    chunking: ChunkingConfig,
    chunks: RwLock<Vec<IndexedChunk>>,
}

impl Default for GuidelineStore {
    fn default() -> Self {
        Self::new(HashedEmbedder::default(), ChunkingConfig::default())
    }
}

impl GuidelineStore {
    pub fn new(embedder: HashedEmbedder, chunking: ChunkingConfig) -> Self {
        Self { embedder, chunking, chunks: RwLock::new(Vec::new()) }
    }

    /// Replaces the collection with the chunked, embedded contents of
    /// `documents`. Chunk ids are deterministic, so re-ingesting the same
    /// documents is idempotent; re-ingestion with changed documents is a
    /// conscious rebuild.
    pub fn ingest(&self, documents: &[GuidelineDocument]) -> Result<IngestSummary, RetrievalError> {
        let mut indexed = Vec::new();

        for document in documents {
            for (section, section_text) in split_into_sections(&document.body) {
                let section_slug = slugify(&section);
                for (index, text) in chunk_text(&section_text, self.chunking).into_iter().enumerate()
                {
                    let chunk_id = format!("{}:{}:{}", document.doc_id, section_slug, index);
                    let embedding = self.embedder.embed(&text);
                    indexed.push(IndexedChunk {
                        doc_id: document.doc_id.clone(),
                        doc_version: document.version.clone(),
                        section: section.clone(),
                        chunk_id,
                        text,
                        embedding,
                    });
                }
            }
        }

        let summary = IngestSummary { documents: documents.len(), chunks: indexed.len() };
        let mut chunks = match self.chunks.write() {
            Ok(chunks) => chunks,
            Err(poisoned) => poisoned.into_inner(),
        };
        *chunks = indexed;
        Ok(summary)
    }

    pub fn chunk_count(&self) -> usize {
        match self.chunks.read() {
            Ok(chunks) => chunks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Per-document section list and chunk count, for ingestion tooling.
    pub fn document_summary(&self) -> BTreeMap<String, DocumentStats> {
        let chunks = match self.chunks.read() {
            Ok(chunks) => chunks,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut summary: BTreeMap<String, DocumentStats> = BTreeMap::new();
        for chunk in chunks.iter() {
            let stats = summary.entry(chunk.doc_id.clone()).or_default();
            if !stats.sections.contains(&chunk.section) {
                stats.sections.push(chunk.section.clone());
            }
            stats.chunk_count += 1;
        }
        summary
    }
}

impl GuidelineRetriever for GuidelineStore {
    fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalChunk>, RetrievalError> {
        let query_embedding = self.embedder.embed(text);
        let chunks = match self.chunks.read() {
            Ok(chunks) => chunks,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut scored: Vec<(f32, &IndexedChunk)> = chunks
            .iter()
            .map(|chunk| (cosine_similarity(&query_embedding, &chunk.embedding), chunk))
            .collect();
        // Descending by relevance, chunk-id tiebreak for determinism.
        scored.sort_by(|(left_score, left), (right_score, right)| {
            right_score
                .total_cmp(left_score)
                .then_with(|| left.chunk_id.cmp(&right.chunk_id))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, chunk)| RetrievalChunk {
                doc_id: chunk.doc_id.clone(),
                doc_version: chunk.doc_version.clone(),
                section: chunk.section.clone(),
                chunk_id: chunk.chunk_id.clone(),
                text: chunk.text.clone(),
                metadata: BTreeMap::from([
                    ("doc_id".to_string(), chunk.doc_id.clone()),
                    ("doc_version".to_string(), chunk.doc_version.clone()),
                    ("section".to_string(), chunk.section.clone()),
                ]),
                relevance_score: f64::from(score),
            })
            .collect())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct DocumentStats {
    pub sections: Vec<String>,
    pub chunk_count: usize,
}

fn slugify(section: &str) -> String {
    section
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::retrieval::fixtures::builtin_guidelines;
    use crate::retrieval::{GuidelineDocument, GuidelineRetriever};

    use super::GuidelineStore;

    fn document(doc_id: &str, body: &str) -> GuidelineDocument {
        GuidelineDocument {
            doc_id: doc_id.to_string(),
            version: "v1.0".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn ingest_chunks_every_section() {
        let store = GuidelineStore::default();
        let summary = store
            .ingest(&[document(
                "eligibility",
                "# Property Types\nSingle family homes are eligible.\n# Coverage\nCoverage above the standard limit requires review.",
            )])
            .expect("ingest");

        assert_eq!(summary.documents, 1);
        assert_eq!(summary.chunks, 2);
        assert_eq!(store.chunk_count(), 2);
    }

    #[test]
    fn reingest_is_an_idempotent_rebuild() {
        let store = GuidelineStore::default();
        let documents = builtin_guidelines();

        store.ingest(&documents).expect("first ingest");
        let first = store.query("wildfire risk", 3).expect("first query");

        store.ingest(&documents).expect("second ingest");
        let second = store.query("wildfire risk", 3).expect("second query");

        assert_eq!(first, second);
    }

    #[test]
    fn query_orders_by_relevance_descending() {
        let store = GuidelineStore::default();
        store
            .ingest(&[
                document("wildfire", "# Wildfire\nWildfire risk requires defensible space and brush clearance around the structure."),
                document("billing", "# Billing\nInvoices are issued monthly on the first business day."),
            ])
            .expect("ingest");

        let results = store.query("wildfire defensible space brush", 2).expect("query");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doc_id, "wildfire");
        assert!(results[0].relevance_score >= results[1].relevance_score);
    }

    #[test]
    fn query_on_an_empty_collection_returns_no_chunks() {
        let store = GuidelineStore::default();
        let results = store.query("anything", 5).expect("query");
        assert!(results.is_empty());
    }

    #[test]
    fn top_k_bounds_the_result_set() {
        let store = GuidelineStore::default();
        store.ingest(&builtin_guidelines()).expect("ingest");
        assert!(store.chunk_count() > 5);

        let results = store.query("property eligibility standard", 5).expect("query");
        assert_eq!(results.len(), 5);
    }
}
