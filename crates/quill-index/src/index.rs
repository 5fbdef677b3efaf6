//! The [`VectorIndex`] trait and search result types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::IndexError;

/// Limits applied to a grouped search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Maximum number of documents in the result.
    pub document_limit: u32,
    /// Maximum chunks returned per document.
    pub chunk_limit: u32,
}

/// One scored chunk hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredChunk {
    /// Point id.
    pub id: String,
    /// Chunk text.
    pub value: String,
    /// Similarity score, higher is closer.
    pub score: f32,
}

/// All hits for one document, best first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHits {
    /// Document the chunks belong to.
    pub document_id: String,
    /// Scored chunks, best first, at most `chunk_limit` of them.
    pub hits: Vec<ScoredChunk>,
}

/// The vector-index seam.
///
/// Collections are keyed by tenant; every point carries its workspace and
/// document ids so deletes and searches can filter on them.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store one vector per chunk for a document. Returns the number of
    /// points written.
    async fn upsert(
        &self,
        org_id: &str,
        workspace_id: &str,
        document_id: &str,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<usize, IndexError>;

    /// Delete every point belonging to a document. Returns the number of
    /// points removed.
    async fn delete_by_document(
        &self,
        org_id: &str,
        workspace_id: &str,
        document_id: &str,
    ) -> Result<u64, IndexError>;

    /// Delete every point belonging to a workspace. Returns the number of
    /// points removed.
    async fn delete_by_workspace(
        &self,
        org_id: &str,
        workspace_id: &str,
    ) -> Result<u64, IndexError>;

    /// Similarity search grouped by document: at most `document_limit`
    /// documents, each with at most `chunk_limit` chunks, both ordered
    /// best-first.
    async fn search(
        &self,
        org_id: &str,
        workspace_id: &str,
        vector: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<DocumentHits>, IndexError>;
}
