//! Query routing: a structured classification call that maps a free-text
//! query onto one supported topic, or the sentinel when it falls outside
//! every track.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::providers::{ChatExchange, ChatModel};
use crate::topics::Topic;

const ROUTER_SYSTEM_PROMPT: &str = include_str!("../config/router_prompt.txt");

/// Outcome of routing one query. When `topic` is the sentinel the message
/// is returned to the caller and the pipeline stops.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub topic: Topic,
    pub user_facing_message: Option<String>,
}

/// The only shape the classifier is allowed to produce. Anything else is
/// a shape mismatch and fails closed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassifierVerdict {
    topic: Topic,
}

/// Strict decode of the classifier content. Kept free of I/O so the
/// fail-closed behavior is unit-testable.
fn parse_verdict(content: &str) -> Result<Topic, PipelineError> {
    let verdict: ClassifierVerdict = serde_json::from_str(content).map_err(|e| {
        PipelineError::RoutingFailure(format!(
            "classifier returned malformed output: {}. Raw content: {}",
            e, content
        ))
    })?;
    Ok(verdict.topic)
}

/// Decline prose is assembled locally from the registered topic names, so
/// routing correctness never depends on model-generated text.
fn decline_message() -> String {
    let names: Vec<&str> = Topic::supported()
        .iter()
        .map(|t| t.display_name())
        .collect();
    format!(
        "I can only answer questions about the {} lectures. Please ask something from those tracks.",
        names.join(" or ")
    )
}

pub struct QueryRouter {
    chat: Arc<dyn ChatModel>,
}

impl QueryRouter {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Classifies the query's subject. The classification call is the only
    /// side effect; ambiguous queries resolve to the single dominant topic
    /// per the prompt, with NodeJS winning a dead heat.
    pub async fn route(&self, query: &str) -> Result<RoutingDecision, PipelineError> {
        let exchange = ChatExchange {
            system_prompt: ROUTER_SYSTEM_PROMPT.to_string(),
            user_content: query.to_string(),
            temperature: 0.1,
            json_response: true,
        };

        let content = self.chat.chat(exchange).await.map_err(|e| {
            PipelineError::ServiceUnavailable(format!("classification call failed: {}", e))
        })?;

        let topic = parse_verdict(&content)?;

        if topic.is_sentinel() {
            warn!(query = %query, "Query routed outside supported topics");
            return Ok(RoutingDecision {
                topic,
                user_facing_message: Some(decline_message()),
            });
        }

        info!(query = %query, topic = ?topic, "Query routed");
        Ok(RoutingDecision {
            topic,
            user_facing_message: None,
        })
    }
}
