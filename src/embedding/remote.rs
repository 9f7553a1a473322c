//! Remote embedding client for OpenAI-compatible `/embeddings` endpoints.

use async_trait::async_trait;
use serde::Deserialize;

use super::{clamp_input, EmbeddingClient, EmbeddingError};
use crate::config::EmbeddingConfig;

/// Calls `POST {api_base}/embeddings` with a bearer token read from the
/// environment at construction time.
pub struct RemoteEmbeddingClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl RemoteEmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let api_key = if config.api_key_env.is_empty() {
            None
        } else {
            std::env::var(&config.api_key_env).ok()
        };
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "no API key in environment; embedding requests will be unauthenticated"
            );
        }

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingClient for RemoteEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.api_base);
        let body = serde_json::json!({
            "model": self.model,
            "input": clamp_input(text),
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let truncated = body.chars().take(200).collect();
            return Err(EmbeddingError::Service {
                status: status.as_u16(),
                body: truncated,
            });
        }

        let parsed: EmbeddingsResponse = resp.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::NoVector)?;

        // A wrong-width vector would be rejected much later by the vec0
        // table with an opaque SQL error; fail here with the real cause.
        if vector.len() != self.dimensions() {
            return Err(EmbeddingError::Dimensions {
                got: vector.len(),
                expected: self.dimensions(),
            });
        }
        Ok(vector)
    }
}
