//! Qdrant nearest-neighbor search over the partition collections.

use anyhow::{Context, Result};
use async_trait::async_trait;
use qdrant_client::{
    qdrant::{SearchPoints, Value},
    Qdrant,
};
use std::sync::Arc;
use tracing::debug;

use super::{ScoredHit, VectorSearch};

pub struct QdrantSearch {
    client: Arc<Qdrant>,
}

impl QdrantSearch {
    pub fn new(client: Arc<Qdrant>) -> Self {
        Self { client }
    }

    /// Connect to Qdrant with an optional API key. The connection is
    /// verified lazily per search; callers may health-check at startup.
    pub fn connect(url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .context("failed to build Qdrant client")?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn client(&self) -> Arc<Qdrant> {
        Arc::clone(&self.client)
    }

    fn extract_string_value(value: &Value) -> String {
        use qdrant_client::qdrant::value::Kind;

        match value.kind.as_ref() {
            Some(Kind::StringValue(s)) => s.clone(),
            Some(Kind::IntegerValue(i)) => i.to_string(),
            Some(Kind::DoubleValue(d)) => d.to_string(),
            Some(Kind::BoolValue(b)) => b.to_string(),
            _ => String::new(),
        }
    }
}

#[async_trait]
impl VectorSearch for QdrantSearch {
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredHit>> {
        let search_points = SearchPoints {
            collection_name: collection.to_string(),
            vector,
            limit,
            with_payload: Some(true.into()),
            ..Default::default()
        };

        let search_results = self
            .client
            .search_points(search_points)
            .await
            .with_context(|| format!("vector search against '{}' failed", collection))?;

        let hits: Vec<ScoredHit> = search_results
            .result
            .into_iter()
            .map(|scored_point| {
                let payload = scored_point.payload;

                // Provenance fields are preserved verbatim for citation; a
                // missing field degrades to an empty string rather than
                // dropping the passage.
                let content = payload
                    .get("content")
                    .map(Self::extract_string_value)
                    .unwrap_or_default();
                let lecture = payload
                    .get("lecture")
                    .map(Self::extract_string_value)
                    .unwrap_or_default();
                let start_time = payload
                    .get("start_time")
                    .map(Self::extract_string_value)
                    .unwrap_or_default();

                ScoredHit {
                    content,
                    lecture,
                    start_time,
                    score: scored_point.score,
                }
            })
            .collect();

        debug!(
            collection = %collection,
            hit_count = hits.len(),
            "Vector search completed"
        );

        Ok(hits)
    }
}
