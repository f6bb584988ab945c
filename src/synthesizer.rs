//! Grounded answer synthesis: bind the generator to the retrieved
//! passages, require citations, and fail closed on any citation that
//! points at provenance we never retrieved.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::providers::{ChatExchange, ChatModel};
use crate::retriever::RetrievedPassage;

const ANSWER_SYSTEM_PROMPT_TEMPLATE: &str = include_str!("../config/answer_prompt.txt");

/// Deterministic decline answer for an empty context. No generation call
/// is made in that case, so decline-vs-answer branching is reproducible.
pub const NOT_FOUND_ANSWER: &str =
    "I couldn't find that information in the available lecture content.";

static CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[lecture:\s*([^,\]]+?)\s*,\s*start_time:\s*([^\]]+?)\s*\]")
        .expect("citation regex must compile")
});

/// Serializes passages into the numbered context blocks the prompt
/// template substitutes in.
fn render_context(passages: &[RetrievedPassage]) -> String {
    let mut context = String::new();
    for passage in passages {
        context.push_str(&format!(
            "--- Passage {} ---\nlecture: {}\nstart_time: {}\ntext: {}\n\n",
            passage.relevance_rank, passage.source_label, passage.start_timestamp, passage.text
        ));
    }
    context.trim_end().to_string()
}

/// Every citation token in the answer must name provenance present in the
/// retrieved set. Returns the offending token on mismatch.
fn validate_citations(answer: &str, passages: &[RetrievedPassage]) -> Result<(), String> {
    for caps in CITATION_RE.captures_iter(answer) {
        let lecture = caps[1].trim();
        let start_time = caps[2].trim();
        let known = passages
            .iter()
            .any(|p| p.source_label == lecture && p.start_timestamp == start_time);
        if !known {
            return Err(format!(
                "[lecture: {}, start_time: {}]",
                lecture, start_time
            ));
        }
    }
    Ok(())
}

pub struct AnswerSynthesizer {
    chat: Arc<dyn ChatModel>,
}

impl AnswerSynthesizer {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        passages: &[RetrievedPassage],
    ) -> Result<String, PipelineError> {
        if passages.is_empty() {
            info!("No passages retrieved; declining without a generation call");
            return Ok(NOT_FOUND_ANSWER.to_string());
        }

        let system_prompt =
            ANSWER_SYSTEM_PROMPT_TEMPLATE.replace("{context}", &render_context(passages));

        let exchange = ChatExchange {
            system_prompt,
            user_content: query.to_string(),
            temperature: 0.2,
            json_response: false,
        };

        let answer = self.chat.chat(exchange).await.map_err(|e| {
            PipelineError::SynthesisFailure(format!("generation call failed: {}", e))
        })?;

        if let Err(token) = validate_citations(&answer, passages) {
            warn!(citation = %token, "Generated answer cited provenance outside the retrieved set");
            return Err(PipelineError::SynthesisFailure(format!(
                "answer cited a source not present in the retrieved passages: {}",
                token
            )));
        }

        info!(
            passage_count = passages.len(),
            answer_len = answer.len(),
            "Answer synthesized"
        );

        Ok(answer)
    }
}
