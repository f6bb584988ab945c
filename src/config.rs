use anyhow::{Context, Result};
use std::env;

/// Runtime configuration, resolved once at startup from the process
/// environment (optionally seeded from a `.env` file).
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_port: u16,

    // OpenAI-compatible chat + embeddings provider
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub router_model: String,
    pub answer_model: String,
    pub embedding_model: String,

    // Vector store
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub nodejs_collection: String,
    pub python_collection: String,

    // Pipeline policy
    pub retrieval_top_k: usize,
    pub pipeline_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid port number")?;

        let openai_api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;

        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        let router_model =
            env::var("ROUTER_MODEL").unwrap_or_else(|_| "gpt-4.1-nano".to_string());
        let answer_model =
            env::var("ANSWER_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());
        let embedding_model = env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-large".to_string());

        let qdrant_url =
            env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string());
        // Trailing whitespace in env vars is a recurring deployment hazard.
        let qdrant_url = qdrant_url.trim().to_string();
        let qdrant_api_key = env::var("QDRANT_API_KEY").ok();

        let nodejs_collection =
            env::var("NODEJS_COLLECTION").unwrap_or_else(|_| "ChaiCode-NodeJS".to_string());
        let python_collection =
            env::var("PYTHON_COLLECTION").unwrap_or_else(|_| "ChaiCode-Python".to_string());

        let retrieval_top_k = env::var("RETRIEVAL_TOP_K")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<usize>()
            .context("RETRIEVAL_TOP_K must be a valid integer")?
            .max(1);

        let pipeline_timeout_secs = env::var("PIPELINE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .context("PIPELINE_TIMEOUT_SECS must be a valid integer")?;

        Ok(Self {
            server_port,
            openai_base_url,
            openai_api_key,
            router_model,
            answer_model,
            embedding_model,
            qdrant_url,
            qdrant_api_key,
            nodejs_collection,
            python_collection,
            retrieval_top_k,
            pipeline_timeout_secs,
        })
    }
}
