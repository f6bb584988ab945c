use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use lecture_chat_backend::api::{app, AppState};
use lecture_chat_backend::config::Settings;
use lecture_chat_backend::pipeline::ChatPipeline;
use lecture_chat_backend::providers::openai::{OpenAiChat, OpenAiEmbeddings};
use lecture_chat_backend::providers::qdrant_store::QdrantSearch;
use lecture_chat_backend::retriever::SemanticRetriever;
use lecture_chat_backend::router::QueryRouter;
use lecture_chat_backend::synthesizer::AnswerSynthesizer;
use lecture_chat_backend::topics::TopicRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lecture_chat_backend=info,axum=info".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;

    info!(
        server_port = settings.server_port,
        qdrant_url = %settings.qdrant_url,
        router_model = %settings.router_model,
        answer_model = %settings.answer_model,
        embedding_model = %settings.embedding_model,
        retrieval_top_k = settings.retrieval_top_k,
        "Initializing lecture chat backend"
    );

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("Failed to create HTTP client");

    let qdrant = QdrantSearch::connect(&settings.qdrant_url, settings.qdrant_api_key.clone())?;

    // Connectivity is an ops signal, not a startup gate: a late-arriving
    // vector store surfaces per-request as a recoverable failure.
    match qdrant.client().health_check().await {
        Ok(_) => info!(qdrant_url = %settings.qdrant_url, "Connected to Qdrant"),
        Err(e) => warn!(
            qdrant_url = %settings.qdrant_url,
            error = %e,
            "Qdrant health check failed; retrieval will fail until it is reachable"
        ),
    }

    let router_chat = Arc::new(OpenAiChat::new(
        http_client.clone(),
        settings.openai_base_url.clone(),
        settings.openai_api_key.clone(),
        settings.router_model.clone(),
    ));
    let answer_chat = Arc::new(OpenAiChat::new(
        http_client.clone(),
        settings.openai_base_url.clone(),
        settings.openai_api_key.clone(),
        settings.answer_model.clone(),
    ));
    let embedder = Arc::new(OpenAiEmbeddings::new(
        http_client,
        settings.openai_base_url.clone(),
        settings.openai_api_key.clone(),
        settings.embedding_model.clone(),
    ));

    let registry = Arc::new(TopicRegistry::from_settings(&settings));

    let pipeline = ChatPipeline::new(
        Arc::clone(&registry),
        QueryRouter::new(router_chat),
        SemanticRetriever::new(embedder, Arc::new(qdrant), settings.retrieval_top_k),
        AnswerSynthesizer::new(answer_chat),
        Duration::from_secs(settings.pipeline_timeout_secs),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server_port));
    info!(addr = %addr, "Starting lecture chat backend server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
