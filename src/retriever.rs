//! Semantic retrieval: embed the query, search the routed partition's
//! collection, and hand back ranked passages with their provenance.

use std::sync::Arc;
use tracing::info;

use crate::error::PipelineError;
use crate::providers::{Embedder, ScoredHit, VectorSearch};
use crate::topics::Partition;

/// A transcript chunk with the metadata needed for citation. Rank starts
/// at 1 for the closest hit.
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub text: String,
    pub source_label: String,
    pub start_timestamp: String,
    pub relevance_rank: usize,
}

/// Converts ranked hits into passages. Hits arrive already ordered by
/// descending relevance, so rank is positional.
fn passages_from_hits(hits: Vec<ScoredHit>) -> Vec<RetrievedPassage> {
    hits.into_iter()
        .enumerate()
        .map(|(idx, hit)| RetrievedPassage {
            text: hit.content,
            source_label: hit.lecture,
            start_timestamp: hit.start_time,
            relevance_rank: idx + 1,
        })
        .collect()
}

pub struct SemanticRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorSearch>,
    top_k: usize,
}

impl SemanticRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorSearch>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k: top_k.max(1),
        }
    }

    /// Read-only: zero hits is a normal outcome (the synthesizer declines),
    /// only transport/provider failures are errors.
    pub async fn retrieve(
        &self,
        partition: &Partition,
        query: &str,
    ) -> Result<Vec<RetrievedPassage>, PipelineError> {
        let vector = self.embedder.embed(query).await.map_err(|e| {
            PipelineError::RetrievalFailure(format!("query embedding failed: {}", e))
        })?;

        let hits = self
            .store
            .search(&partition.collection, vector, self.top_k as u64)
            .await
            .map_err(|e| {
                PipelineError::RetrievalFailure(format!(
                    "vector search against '{}' failed: {}",
                    partition.collection, e
                ))
            })?;

        let passages = passages_from_hits(hits);

        info!(
            collection = %partition.collection,
            topic = ?partition.topic,
            passage_count = passages.len(),
            "Retrieval completed"
        );

        Ok(passages)
    }
}
