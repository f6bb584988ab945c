// Integration tests for the query pipeline.
//
// Providers are replaced with in-process fakes so every branch of the
// state machine can be driven without network access: routing, decline,
// retrieval, synthesis, and each failure kind.

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lecture_chat_backend::api::{handle_chat_request, AppState, ChatRequest};
use lecture_chat_backend::error::PipelineError;
use lecture_chat_backend::pipeline::{ChatPipeline, PipelineOutcome};
use lecture_chat_backend::providers::{ChatExchange, ChatModel, Embedder, ScoredHit, VectorSearch};
use lecture_chat_backend::retriever::SemanticRetriever;
use lecture_chat_backend::router::QueryRouter;
use lecture_chat_backend::synthesizer::{AnswerSynthesizer, NOT_FOUND_ANSWER};
use lecture_chat_backend::topics::{Partition, Topic, TopicRegistry};

// --- Fakes ---

/// Chat model that always returns the same content and counts its calls.
struct ScriptedChat {
    content: String,
    calls: AtomicUsize,
}

impl ScriptedChat {
    fn new(content: &str) -> Arc<Self> {
        Arc::new(Self {
            content: content.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn chat(&self, _exchange: ChatExchange) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.content.clone())
    }
}

struct FailingChat;

#[async_trait]
impl ChatModel for FailingChat {
    async fn chat(&self, _exchange: ChatExchange) -> Result<String> {
        bail!("connection refused")
    }
}

struct SlowChat;

#[async_trait]
impl ChatModel for SlowChat {
    async fn chat(&self, _exchange: ChatExchange) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(r#"{"topic": "nodejs"}"#.to_string())
    }
}

struct FakeEmbedder {
    calls: AtomicUsize,
}

impl FakeEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0.1; 8])
    }
}

/// Vector search that records which collections were queried.
struct RecordingSearch {
    hits: Vec<ScoredHit>,
    calls: AtomicUsize,
    collections: Mutex<Vec<String>>,
}

impl RecordingSearch {
    fn new(hits: Vec<ScoredHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            calls: AtomicUsize::new(0),
            collections: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn collections_seen(&self) -> Vec<String> {
        self.collections.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorSearch for RecordingSearch {
    async fn search(
        &self,
        collection: &str,
        _vector: Vec<f32>,
        _limit: u64,
    ) -> Result<Vec<ScoredHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.collections.lock().unwrap().push(collection.to_string());
        Ok(self.hits.clone())
    }
}

struct FailingSearch;

#[async_trait]
impl VectorSearch for FailingSearch {
    async fn search(
        &self,
        _collection: &str,
        _vector: Vec<f32>,
        _limit: u64,
    ) -> Result<Vec<ScoredHit>> {
        bail!("vector store unreachable")
    }
}

// --- Helpers ---

fn default_registry() -> Arc<TopicRegistry> {
    Arc::new(TopicRegistry::with_partitions(vec![
        Partition {
            topic: Topic::NodeJs,
            collection: "ChaiCode-NodeJS".to_string(),
        },
        Partition {
            topic: Topic::Python,
            collection: "ChaiCode-Python".to_string(),
        },
    ]))
}

fn build_pipeline(
    registry: Arc<TopicRegistry>,
    router_chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn VectorSearch>,
    answer_chat: Arc<dyn ChatModel>,
) -> ChatPipeline {
    ChatPipeline::new(
        registry,
        QueryRouter::new(router_chat),
        SemanticRetriever::new(embedder, search, 5),
        AnswerSynthesizer::new(answer_chat),
        Duration::from_secs(5),
    )
}

fn nodejs_hit() -> ScoredHit {
    ScoredHit {
        content: "Node.js is a JavaScript runtime".to_string(),
        lecture: "Getting-Started-with-NodeJS".to_string(),
        start_time: "00:01:34".to_string(),
        score: 0.91,
    }
}

// --- Scenarios ---

#[tokio::test]
async fn nodejs_query_is_answered_with_a_citation_from_its_partition() {
    let router_chat = ScriptedChat::new(r#"{"topic": "nodejs"}"#);
    let answer_chat = ScriptedChat::new(
        "Node.js is a JavaScript runtime \
         [lecture: Getting-Started-with-NodeJS, start_time: 00:01:34].",
    );
    let embedder = FakeEmbedder::new();
    let search = RecordingSearch::new(vec![nodejs_hit()]);

    let pipeline = build_pipeline(
        default_registry(),
        router_chat.clone(),
        embedder.clone(),
        search.clone(),
        answer_chat.clone(),
    );

    let outcome = pipeline
        .run("tell me about event loop in nodejs?")
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::Answered(answer) => {
            assert!(answer
                .contains("[lecture: Getting-Started-with-NodeJS, start_time: 00:01:34]"));
        }
        other => panic!("expected an answer, got {:?}", other),
    }

    assert_eq!(embedder.call_count(), 1);
    assert_eq!(search.collections_seen(), vec!["ChaiCode-NodeJS"]);
    assert_eq!(answer_chat.call_count(), 1);
}

#[tokio::test]
async fn python_query_only_searches_the_python_partition() {
    let router_chat = ScriptedChat::new(r#"{"topic": "python"}"#);
    let answer_chat = ScriptedChat::new("unused");
    let search = RecordingSearch::new(vec![]);

    let pipeline = build_pipeline(
        default_registry(),
        router_chat,
        FakeEmbedder::new(),
        search.clone(),
        answer_chat,
    );

    pipeline.run("tell me about list in python?").await.unwrap();

    assert_eq!(search.collections_seen(), vec!["ChaiCode-Python"]);
}

#[tokio::test]
async fn out_of_domain_query_declines_without_any_retrieval() {
    let router_chat = ScriptedChat::new(r#"{"topic": "none"}"#);
    let answer_chat = ScriptedChat::new("unused");
    let embedder = FakeEmbedder::new();
    let search = RecordingSearch::new(vec![nodejs_hit()]);

    let pipeline = build_pipeline(
        default_registry(),
        router_chat,
        embedder.clone(),
        search.clone(),
        answer_chat.clone(),
    );

    let outcome = pipeline.run("tell me about list in rust?").await.unwrap();

    match outcome {
        PipelineOutcome::Declined(message) => {
            assert!(message.contains("NodeJS"));
            assert!(message.contains("Python"));
        }
        other => panic!("expected a decline, got {:?}", other),
    }

    assert_eq!(embedder.call_count(), 0);
    assert_eq!(search.call_count(), 0);
    assert_eq!(answer_chat.call_count(), 0);
}

#[tokio::test]
async fn empty_retrieval_declines_deterministically_without_generation() {
    let router_chat = ScriptedChat::new(r#"{"topic": "nodejs"}"#);
    let answer_chat = ScriptedChat::new("unused");
    let search = RecordingSearch::new(vec![]);

    let pipeline = build_pipeline(
        default_registry(),
        router_chat,
        FakeEmbedder::new(),
        search,
        answer_chat.clone(),
    );

    // Same empty passage set twice: the branch must be deterministic.
    for _ in 0..2 {
        let outcome = pipeline.run("tell me about event loop in nodejs?").await.unwrap();
        assert_eq!(outcome, PipelineOutcome::Answered(NOT_FOUND_ANSWER.to_string()));
    }

    assert_eq!(answer_chat.call_count(), 0);
}

#[tokio::test]
async fn fabricated_citation_fails_closed() {
    let router_chat = ScriptedChat::new(r#"{"topic": "nodejs"}"#);
    let answer_chat =
        ScriptedChat::new("Made up [lecture: Imaginary-Lecture, start_time: 12:34:56].");
    let search = RecordingSearch::new(vec![nodejs_hit()]);

    let pipeline = build_pipeline(
        default_registry(),
        router_chat,
        FakeEmbedder::new(),
        search,
        answer_chat,
    );

    let err = pipeline
        .run("tell me about event loop in nodejs?")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::SynthesisFailure(_)));
}

#[tokio::test]
async fn malformed_classifier_output_is_a_routing_failure() {
    let router_chat = ScriptedChat::new("the topic is nodejs");
    let answer_chat = ScriptedChat::new("unused");
    let search = RecordingSearch::new(vec![]);

    let pipeline = build_pipeline(
        default_registry(),
        router_chat,
        FakeEmbedder::new(),
        search.clone(),
        answer_chat,
    );

    let err = pipeline.run("tell me about nodejs?").await.unwrap_err();
    assert!(matches!(err, PipelineError::RoutingFailure(_)));
    assert_eq!(search.call_count(), 0);
}

#[tokio::test]
async fn classifier_outage_is_service_unavailable() {
    let pipeline = build_pipeline(
        default_registry(),
        Arc::new(FailingChat),
        FakeEmbedder::new(),
        RecordingSearch::new(vec![]),
        ScriptedChat::new("unused"),
    );

    let err = pipeline.run("tell me about nodejs?").await.unwrap_err();
    assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn unreachable_store_is_a_recoverable_retrieval_failure() {
    let router_chat = ScriptedChat::new(r#"{"topic": "nodejs"}"#);
    let answer_chat = ScriptedChat::new("unused");

    let pipeline = build_pipeline(
        default_registry(),
        router_chat,
        FakeEmbedder::new(),
        Arc::new(FailingSearch),
        answer_chat.clone(),
    );

    let err = pipeline
        .run("tell me about event loop in nodejs?")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::RetrievalFailure(_)));
    assert!(!err.is_fatal());
    // No partial answer: synthesis never ran.
    assert_eq!(answer_chat.call_count(), 0);
}

#[tokio::test]
async fn routed_topic_without_a_partition_is_a_fatal_configuration_error() {
    let registry = Arc::new(TopicRegistry::with_partitions(vec![Partition {
        topic: Topic::NodeJs,
        collection: "ChaiCode-NodeJS".to_string(),
    }]));
    let router_chat = ScriptedChat::new(r#"{"topic": "python"}"#);

    let pipeline = build_pipeline(
        registry,
        router_chat,
        FakeEmbedder::new(),
        RecordingSearch::new(vec![]),
        ScriptedChat::new("unused"),
    );

    let err = pipeline.run("tell me about list in python?").await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn invocation_past_its_deadline_fails_recoverably() {
    let pipeline = ChatPipeline::new(
        default_registry(),
        QueryRouter::new(Arc::new(SlowChat)),
        SemanticRetriever::new(FakeEmbedder::new(), RecordingSearch::new(vec![]), 5),
        AnswerSynthesizer::new(ScriptedChat::new("unused")),
        Duration::from_millis(50),
    );

    let err = pipeline.run("tell me about nodejs?").await.unwrap_err();
    assert!(matches!(err, PipelineError::DeadlineExceeded(_)));
    assert!(!err.is_fatal());
}

// --- HTTP boundary ---

fn app_state(pipeline: ChatPipeline) -> AppState {
    AppState {
        pipeline: Arc::new(pipeline),
    }
}

#[tokio::test]
async fn blank_message_is_rejected_before_routing() {
    let router_chat = ScriptedChat::new(r#"{"topic": "nodejs"}"#);
    let state = app_state(build_pipeline(
        default_registry(),
        router_chat.clone(),
        FakeEmbedder::new(),
        RecordingSearch::new(vec![]),
        ScriptedChat::new("unused"),
    ));

    let result = handle_chat_request(
        State(state),
        Json(ChatRequest {
            message: "   ".to_string(),
        }),
    )
    .await;

    assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(router_chat.call_count(), 0);
}

#[tokio::test]
async fn internal_failures_surface_as_a_generic_server_error() {
    let router_chat = ScriptedChat::new(r#"{"topic": "nodejs"}"#);
    let state = app_state(build_pipeline(
        default_registry(),
        router_chat,
        FakeEmbedder::new(),
        Arc::new(FailingSearch),
        ScriptedChat::new("unused"),
    ));

    let result = handle_chat_request(
        State(state),
        Json(ChatRequest {
            message: "tell me about event loop in nodejs?".to_string(),
        }),
    )
    .await;

    assert_eq!(result.err(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn decline_message_is_a_successful_response() {
    let state = app_state(build_pipeline(
        default_registry(),
        ScriptedChat::new(r#"{"topic": "none"}"#),
        FakeEmbedder::new(),
        RecordingSearch::new(vec![]),
        ScriptedChat::new("unused"),
    ));

    let result = handle_chat_request(
        State(state),
        Json(ChatRequest {
            message: "tell me about list in rust?".to_string(),
        }),
    )
    .await;

    let response = result.expect("decline must be a 200");
    assert!(response.0.response.contains("NodeJS"));
}
