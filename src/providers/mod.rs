//! Outbound provider capabilities, expressed as traits so each component
//! takes an injected `Arc<dyn ...>` handle and tests can substitute fakes.

pub mod openai;
pub mod qdrant_store;

use anyhow::Result;
use async_trait::async_trait;

/// One system + user exchange against a chat-completion model.
#[derive(Debug, Clone)]
pub struct ChatExchange {
    pub system_prompt: String,
    pub user_content: String,
    pub temperature: f32,
    /// Ask the provider for a JSON-object response (structured calls).
    pub json_response: bool,
}

/// A chat-completion capability. The router and the synthesizer each hold
/// their own handle, configured with their own model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the assistant message content for the exchange.
    async fn chat(&self, exchange: ChatExchange) -> Result<String>;
}

/// Maps text into the fixed-dimension vector space the partitions were
/// indexed with.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// One ranked nearest-neighbor hit, payload fields verbatim.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub content: String,
    pub lecture: String,
    pub start_time: String,
    pub score: f32,
}

/// Nearest-neighbor search over a named collection.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredHit>>;
}
