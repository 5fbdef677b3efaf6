//! In-memory [`VectorIndex`] with brute-force cosine search.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use quill_embeddings::cosine_similarity;
use uuid::Uuid;

use crate::errors::IndexError;
use crate::index::{DocumentHits, ScoredChunk, SearchOptions, VectorIndex};

struct Point {
    id: String,
    workspace_id: String,
    document_id: String,
    chunk: String,
    vector: Vec<f32>,
}

/// Brute-force cosine index: one point list per tenant.
#[derive(Default)]
pub struct MemoryVectorIndex {
    collections: Mutex<HashMap<String, Vec<Point>>>,
}

impl MemoryVectorIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total points stored for a tenant (test helper).
    pub fn point_count(&self, org_id: &str) -> usize {
        self.collections
            .lock()
            .get(org_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(
        &self,
        org_id: &str,
        workspace_id: &str,
        document_id: &str,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<usize, IndexError> {
        if vectors.len() != chunks.len() {
            return Err(IndexError::Backend(format!(
                "vector/chunk count mismatch: {} vs {}",
                vectors.len(),
                chunks.len()
            )));
        }
        let mut collections = self.collections.lock();
        let points = collections.entry(org_id.to_string()).or_default();
        if let (Some(first), Some(existing)) = (vectors.first(), points.first()) {
            if first.len() != existing.vector.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: existing.vector.len(),
                    got: first.len(),
                });
            }
        }
        let written = vectors.len();
        for (vector, chunk) in vectors.into_iter().zip(chunks) {
            points.push(Point {
                id: Uuid::new_v4().to_string(),
                workspace_id: workspace_id.to_string(),
                document_id: document_id.to_string(),
                chunk,
                vector,
            });
        }
        Ok(written)
    }

    async fn delete_by_document(
        &self,
        org_id: &str,
        workspace_id: &str,
        document_id: &str,
    ) -> Result<u64, IndexError> {
        let mut collections = self.collections.lock();
        let Some(points) = collections.get_mut(org_id) else {
            return Ok(0);
        };
        let before = points.len();
        points.retain(|p| !(p.workspace_id == workspace_id && p.document_id == document_id));
        Ok((before - points.len()) as u64)
    }

    async fn delete_by_workspace(
        &self,
        org_id: &str,
        workspace_id: &str,
    ) -> Result<u64, IndexError> {
        let mut collections = self.collections.lock();
        let Some(points) = collections.get_mut(org_id) else {
            return Ok(0);
        };
        let before = points.len();
        points.retain(|p| p.workspace_id != workspace_id);
        Ok((before - points.len()) as u64)
    }

    async fn search(
        &self,
        org_id: &str,
        workspace_id: &str,
        vector: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<DocumentHits>, IndexError> {
        let collections = self.collections.lock();
        let Some(points) = collections.get(org_id) else {
            return Err(IndexError::MissingCollection(org_id.to_string()));
        };

        let mut by_document: HashMap<&str, Vec<ScoredChunk>> = HashMap::new();
        for point in points.iter().filter(|p| p.workspace_id == workspace_id) {
            let score = cosine_similarity(vector, &point.vector);
            by_document
                .entry(point.document_id.as_str())
                .or_default()
                .push(ScoredChunk {
                    id: point.id.clone(),
                    value: point.chunk.clone(),
                    score,
                });
        }

        let mut groups: Vec<DocumentHits> = by_document
            .into_iter()
            .map(|(document_id, mut hits)| {
                hits.sort_by(|a, b| b.score.total_cmp(&a.score));
                hits.truncate(options.chunk_limit as usize);
                DocumentHits {
                    document_id: document_id.to_string(),
                    hits,
                }
            })
            .collect();

        // rank documents by their best chunk
        groups.sort_by(|a, b| {
            let a_best = a.hits.first().map_or(f32::MIN, |h| h.score);
            let b_best = b.hits.first().map_or(f32::MIN, |h| h.score);
            b_best.total_cmp(&a_best)
        });
        groups.truncate(options.document_limit as usize);
        Ok(groups)
    }
}
