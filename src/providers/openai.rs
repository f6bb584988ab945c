//! OpenAI-compatible chat-completion and embeddings clients over reqwest.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{ChatExchange, ChatModel, Embedder};

/// Chat-completions client bound to one model. The router and the
/// synthesizer each get their own instance so the models stay
/// independently configurable.
pub struct OpenAiChat {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(
        http_client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn chat(&self, exchange: ChatExchange) -> Result<String> {
        let mut payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": exchange.system_prompt
                },
                {
                    "role": "user",
                    "content": exchange.user_content
                }
            ],
            "temperature": exchange.temperature
        });
        if exchange.json_response {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!(
                "chat completions returned error status {}: {}",
                status,
                error_text
            );
        }

        let api_response: serde_json::Value = response.json().await?;

        let content = api_response
            .get("choices")
            .and_then(|choices| choices.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                anyhow::anyhow!("failed to extract content from chat completions response")
            })?;

        debug!(
            model = %self.model,
            content_len = content.len(),
            "Received chat completion"
        );

        Ok(content.to_string())
    }
}

/// Embeddings client for the same provider. The query must be embedded in
/// the same vector space the collections were indexed with, so the model
/// name is deployment configuration.
pub struct OpenAiEmbeddings {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(
        http_client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let payload = json!({
            "model": self.model,
            "input": text
        });

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("embeddings returned error status {}: {}", status, error_text);
        }

        let api_response: serde_json::Value = response.json().await?;

        let embedding = api_response
            .get("data")
            .and_then(|data| data.as_array())
            .and_then(|arr| arr.first())
            .and_then(|entry| entry.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                anyhow::anyhow!("failed to extract embedding from embeddings response")
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect::<Vec<f32>>();

        if embedding.is_empty() {
            bail!("embeddings response contained an empty vector");
        }

        debug!(
            model = %self.model,
            dim = embedding.len(),
            "Generated query embedding"
        );

        Ok(embedding)
    }
}
