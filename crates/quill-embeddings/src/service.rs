//! The [`Embedder`] trait and the deterministic hash-based implementation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::errors::{EmbeddingError, Result};
use crate::normalize::l2_normalize;

/// Turns text into vectors.
///
/// The pipeline embeds document chunks in one batch per item; the query
/// path embeds single strings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of chunk texts, one vector per chunk, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let vectors = self.embed(&texts).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("empty batch result".into()))
    }

    /// Output dimensionality.
    fn dimensions(&self) -> usize;

    /// Model identifier recorded alongside stored vectors.
    fn model_name(&self) -> &str;
}

/// Deterministic embedder: SHA-256 of the text seeds the components, then
/// the vector is L2-normalized. Same text, same vector, which is what the
/// tests and local runs need from it.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    /// Create a hash embedder with the given output dimensionality.
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();

        let mut v: Vec<f32> = (0..self.dims)
            .map(|i| {
                let byte = digest[i % digest.len()];
                // rotate the digest so dimensions beyond 32 differ
                let twist = digest[(i / digest.len()) % digest.len()];
                (f32::from(byte ^ twist) / 127.5) - 1.0
            })
            .collect();
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}
