//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingClient`] trait and a remote implementation that
//! calls an OpenAI-compatible `/embeddings` endpoint. The client is created
//! via [`create_client`] from configuration.
//!
//! A failed embedding ([`EmbeddingError`]) never takes down a whole sync run:
//! the sync engine catches it per chunk and moves on to siblings.

pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

/// Number of dimensions in the embedding vectors (text-embedding-3-small).
pub const EMBEDDING_DIM: usize = 1536;

/// Maximum input length in characters; longer inputs are silently truncated
/// to a deterministic left-to-right prefix before submission.
pub const MAX_INPUT_CHARS: usize = 8000;

/// Failure modes of the embedding service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The service responded but returned no vector for the request.
    #[error("embedding service returned no vector")]
    NoVector,
    /// The HTTP request itself failed (network, timeout, malformed response).
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service returned a non-success status.
    #[error("embedding service error ({status}): {body}")]
    Service { status: u16, body: String },
    /// The returned vector does not fit the store's column width.
    #[error("embedding has {got} dimensions, expected {expected}")]
    Dimensions { got: usize, expected: usize },
}

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`EMBEDDING_DIM`] dimensions
/// and own input truncation via [`clamp_input`]. No retries happen at this
/// layer; callers own retry policy.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Return the number of dimensions this client produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding client from config.
pub fn create_client(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingClient>> {
    let client = remote::RemoteEmbeddingClient::new(config)?;
    Ok(Box::new(client))
}

/// The text submitted for a chunk: `"{heading}: {text}"`, biasing the vector
/// toward the chunk's topic.
pub fn chunk_input(heading: &str, text: &str) -> String {
    format!("{heading}: {text}")
}

/// Truncate to a prefix of at most [`MAX_INPUT_CHARS`] characters, respecting
/// char boundaries.
pub fn clamp_input(text: &str) -> &str {
    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
