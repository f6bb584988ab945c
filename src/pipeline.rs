//! The invocation state machine: Routing -> Retrieving -> Synthesizing,
//! with a Declined short-circuit out of Routing and a single failure
//! mapping at every stage.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::retriever::SemanticRetriever;
use crate::router::QueryRouter;
use crate::synthesizer::AnswerSynthesizer;
use crate::topics::TopicRegistry;

/// Fallback when a sentinel decision arrives without its own message.
const DEFAULT_DECLINE_MESSAGE: &str =
    "I can only answer questions about the supported lecture topics.";

/// Stage labels for log correlation; invocations are otherwise stateless.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Routing,
    Retrieving,
    Synthesizing,
}

/// Terminal content outcomes. Failures travel as `PipelineError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Answered(String),
    Declined(String),
}

impl PipelineOutcome {
    pub fn into_response_text(self) -> String {
        match self {
            Self::Answered(text) | Self::Declined(text) => text,
        }
    }
}

pub struct ChatPipeline {
    registry: Arc<TopicRegistry>,
    router: QueryRouter,
    retriever: SemanticRetriever,
    synthesizer: AnswerSynthesizer,
    timeout: Duration,
}

impl ChatPipeline {
    pub fn new(
        registry: Arc<TopicRegistry>,
        router: QueryRouter,
        retriever: SemanticRetriever,
        synthesizer: AnswerSynthesizer,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            router,
            retriever,
            synthesizer,
            timeout,
        }
    }

    /// Runs one invocation under the overall deadline. Invocations share
    /// nothing but the read-only registry and the provider handles, so
    /// concurrent calls need no coordination.
    pub async fn run(&self, query: &str) -> Result<PipelineOutcome, PipelineError> {
        let job_id = Uuid::new_v4();

        if query.trim().is_empty() {
            return Err(PipelineError::Validation(
                "query must not be empty".to_string(),
            ));
        }

        match tokio::time::timeout(self.timeout, self.execute(job_id, query)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    job_id = %job_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Pipeline invocation exceeded its deadline"
                );
                Err(PipelineError::DeadlineExceeded(self.timeout.as_secs()))
            }
        }
    }

    async fn execute(&self, job_id: Uuid, query: &str) -> Result<PipelineOutcome, PipelineError> {
        info!(job_id = %job_id, stage = ?Stage::Routing, query = %query, "Pipeline started");
        let decision = self.router.route(query).await?;

        if decision.topic.is_sentinel() {
            let message = decision
                .user_facing_message
                .unwrap_or_else(|| DEFAULT_DECLINE_MESSAGE.to_string());
            info!(job_id = %job_id, "Pipeline declined outside supported topics");
            return Ok(PipelineOutcome::Declined(message));
        }

        // A routed topic with no registered partition is a deployment
        // defect, not a normal decline.
        let partition = self
            .registry
            .partition_for(decision.topic)
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "topic {:?} has no registered partition",
                    decision.topic
                ))
            })?
            .clone();

        info!(
            job_id = %job_id,
            stage = ?Stage::Retrieving,
            topic = ?decision.topic,
            collection = %partition.collection,
            "Query routed to partition"
        );
        let passages = self.retriever.retrieve(&partition, query).await?;

        info!(
            job_id = %job_id,
            stage = ?Stage::Synthesizing,
            passage_count = passages.len(),
            "Passages handed to synthesizer"
        );
        let answer = self.synthesizer.synthesize(query, &passages).await?;

        info!(job_id = %job_id, "Pipeline completed");
        Ok(PipelineOutcome::Answered(answer))
    }
}
