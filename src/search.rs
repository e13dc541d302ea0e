//! Cosine-similarity retrieval over stored chunks.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::embedding::{cosine_similarity, Embedder};
use crate::models::ChunkHit;
use crate::store::KnowledgeStore;

/// Hits returned when the caller does not specify `top_k`.
pub const DEFAULT_TOP_K: i64 = 5;

pub struct SearchEngine {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<Embedder>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn KnowledgeStore>, embedder: Arc<Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Rank stored chunks against `query` by cosine similarity.
    ///
    /// `top_k <= 0` falls back to [`DEFAULT_TOP_K`]. A stored vector whose
    /// length no longer matches the query vector (dimensionality drift
    /// after a config change) is regenerated transiently for scoring; the
    /// store is never written here — ingestion is the only writer. Ties
    /// keep store order, so results are deterministic.
    pub async fn search(
        &self,
        query: &str,
        top_k: i64,
        category: Option<&str>,
    ) -> Result<Vec<ChunkHit>> {
        let limit = if top_k <= 0 { DEFAULT_TOP_K } else { top_k } as usize;
        let query_vec = self.embedder.embed(query).await;

        let chunks = self.store.find_chunks(category).await?;
        debug!(candidates = chunks.len(), limit, "scoring chunks");

        let mut hits = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = if chunk.embedding.len() == query_vec.len() {
                chunk.embedding
            } else {
                warn!(chunk_id = %chunk.chunk_id, "stored vector dimensionality drifted, regenerating for scoring");
                self.embedder.embed(&chunk.content).await
            };

            let similarity = cosine_similarity(&query_vec, &embedding) as f64;
            hits.push(ChunkHit {
                chunk_id: chunk.chunk_id,
                document_id: chunk.document_id,
                title: chunk.title,
                content: chunk.content,
                similarity,
                category: chunk.category,
            });
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);

        Ok(hits)
    }
}
