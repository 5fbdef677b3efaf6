//! Query-path glue: the opaque embed → search → respond sequence.
//!
//! The answer model itself is an external collaborator behind
//! [`Responder`]; this module wires the session's query messages through
//! the embedder and index and publishes every step live. The completion
//! stream is an ordered, possibly-cancelled sequence: the session consumes
//! it from its own task, and dropping that task stops the stream cleanly
//! mid-flight.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use quill_core::control::QueryMessage;
use quill_core::envelope;
use quill_embeddings::Embedder;
use quill_index::{IndexError, ScoredChunk, SearchOptions, VectorIndex};
use quill_settings::SearchSettings;
use quill_store::DocumentStore;

use crate::errors::EngineError;
use crate::reporter::Broadcaster;

/// Produces a streamed completion for a prompt.
pub trait Responder: Send + Sync {
    /// Stream completion chunks, in order. The caller may drop the stream
    /// at any point (session closed); implementations must tolerate that.
    fn respond(&self, prompt: &str) -> BoxStream<'static, Result<String, EngineError>>;
}

/// Echoes the tail of the prompt back in fixed-size chunks. Stands in for
/// the real model in tests and local runs.
pub struct EchoResponder {
    chunk_size: usize,
}

impl EchoResponder {
    /// An echo responder emitting `chunk_size`-character chunks.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Responder for EchoResponder {
    fn respond(&self, prompt: &str) -> BoxStream<'static, Result<String, EngineError>> {
        let chars: Vec<char> = prompt.chars().collect();
        let chunks: Vec<Result<String, EngineError>> = chars
            .chunks(self.chunk_size)
            .map(|c| Ok(c.iter().collect()))
            .collect();
        stream::iter(chunks).boxed()
    }
}

/// Scored chunks for one document, named for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContext {
    /// Document id.
    pub document_id: String,
    /// Document display name.
    pub document_name: String,
    /// Scored chunks, best first.
    pub chunks: Vec<ScoredChunk>,
}

/// The search context broadcast to viewers and fed to the responder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContext {
    /// The query the context was built for.
    pub query: String,
    /// Per-document scored chunks.
    pub loaders: Vec<DocumentContext>,
}

/// The session's entry point into the retrieval flows.
pub struct QueryPath {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    responder: Arc<dyn Responder>,
    broadcaster: Arc<dyn Broadcaster>,
    search: SearchSettings,
}

impl QueryPath {
    /// Wire the query path to its collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        responder: Arc<dyn Responder>,
        broadcaster: Arc<dyn Broadcaster>,
        search: SearchSettings,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            responder,
            broadcaster,
            search,
        }
    }

    /// Raw similarity search: embed, search, broadcast one `VssResponse`.
    #[instrument(skip(self, message), fields(workspace = %message.workspace_id))]
    pub async fn run_vss(&self, org_id: &str, message: &QueryMessage) -> Result<(), EngineError> {
        let workspace_id = &message.workspace_id;
        let conversation_id = &message.conversation_id;

        let vector = self.embedder.embed_query(&message.vss_text).await?;
        let Some(context) = self
            .search_context(org_id, workspace_id, &message.vss_text, &vector)
            .await?
        else {
            return Ok(());
        };
        self.broadcaster
            .broadcast(envelope::vss_response(
                json!(context),
                workspace_id,
                conversation_id,
            ))
            .await;
        Ok(())
    }

    /// Analysis flow: echo the user message, build context, stream the
    /// model's reply chunk by chunk, then publish the final response.
    #[instrument(skip(self, message), fields(workspace = %message.workspace_id))]
    pub async fn run_analysis(
        &self,
        org_id: &str,
        message: &QueryMessage,
    ) -> Result<(), EngineError> {
        let workspace_id = &message.workspace_id;
        let conversation_id = &message.conversation_id;

        self.broadcaster
            .broadcast(envelope::user_response(message, workspace_id, conversation_id))
            .await;

        let context = if message.force_context.is_empty() {
            self.status("Performing similarity search...", workspace_id, conversation_id)
                .await;
            let vector = self.embedder.embed_query(&message.query_text).await?;
            match self
                .search_context(org_id, workspace_id, &message.query_text, &vector)
                .await?
            {
                Some(context) => {
                    self.broadcaster
                        .broadcast(envelope::vss_response(
                            json!(context),
                            workspace_id,
                            conversation_id,
                        ))
                        .await;
                    serde_json::to_string(&context).unwrap_or_default()
                }
                None => String::new(),
            }
        } else {
            message.force_context.clone()
        };

        self.status("Building prompt...", workspace_id, conversation_id)
            .await;
        let prompt = build_prompt(&message.query_text, &context, &message.response_schema);

        self.status("Querying model...", workspace_id, conversation_id)
            .await;
        let mut chunks = self.responder.respond(&prompt);
        let mut reply = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            reply.push_str(&chunk);
            self.broadcaster
                .broadcast(envelope::ai_stream_chunk(&chunk, workspace_id, conversation_id))
                .await;
        }

        self.broadcaster
            .broadcast(envelope::ai_response(
                json!({
                    "conversationId": conversation_id,
                    "text": reply,
                    "authorType": "AI",
                }),
                workspace_id,
                conversation_id,
            ))
            .await;
        Ok(())
    }

    async fn status(&self, text: &str, workspace_id: &str, conversation_id: &str) {
        self.broadcaster
            .broadcast(envelope::query_status(text, workspace_id, conversation_id))
            .await;
    }

    /// Run the grouped search and name each document. `None` means the
    /// tenant has no collection yet, which is not an error: there is
    /// simply nothing to search.
    async fn search_context(
        &self,
        org_id: &str,
        workspace_id: &str,
        query: &str,
        vector: &[f32],
    ) -> Result<Option<SearchContext>, EngineError> {
        let options = SearchOptions {
            document_limit: self.search.document_limit,
            chunk_limit: self.search.chunk_limit,
        };
        let groups = match self.index.search(org_id, workspace_id, vector, options).await {
            Ok(groups) => groups,
            Err(IndexError::MissingCollection(_)) => {
                debug!(org_id, "no collection yet, skipping search");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let mut loaders = Vec::with_capacity(groups.len());
        for group in groups {
            let document_name = match self.store.get_document(&group.document_id).await {
                Ok(document) => document.props.name,
                Err(_) => group.document_id.clone(),
            };
            loaders.push(DocumentContext {
                document_id: group.document_id,
                document_name,
                chunks: group.hits,
            });
        }
        Ok(Some(SearchContext {
            query: query.to_string(),
            loaders,
        }))
    }
}

fn build_prompt(query: &str, context: &str, response_schema: &str) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        prompt.push_str("Relevant pieces of information:\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }
    if !response_schema.is_empty() {
        prompt.push_str("Answer using this schema:\n");
        prompt.push_str(response_schema);
        prompt.push_str("\n\n");
    }
    prompt.push_str(query);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quill_core::envelope::UpdateType;
    use quill_core::manifest::FileProps;
    use quill_embeddings::HashEmbedder;
    use quill_index::MemoryVectorIndex;
    use quill_store::{Document, MemoryDocumentStore};

    use crate::reporter::MemoryBroadcaster;

    struct Harness {
        path: QueryPath,
        store: Arc<MemoryDocumentStore>,
        index: Arc<MemoryVectorIndex>,
        embedder: Arc<HashEmbedder>,
        hub: Arc<MemoryBroadcaster>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryDocumentStore::new());
        let index = Arc::new(MemoryVectorIndex::new());
        let embedder = Arc::new(HashEmbedder::new(8));
        let hub = Arc::new(MemoryBroadcaster::new());
        let path = QueryPath::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            Arc::new(EchoResponder::new(4)),
            hub.clone(),
            SearchSettings::default(),
        );
        Harness {
            path,
            store,
            index,
            embedder,
            hub,
        }
    }

    async fn seed_document(h: &Harness, id: &str, name: &str, text: &str) {
        let _ = h
            .store
            .create_document(Document {
                id: id.to_string(),
                org_id: "org1".to_string(),
                workspace_id: "ws1".to_string(),
                props: FileProps {
                    name: name.to_string(),
                    size: text.len() as i64,
                    mime_type: "text/plain".to_string(),
                },
                chunk_count: 1,
                chunk_size: 500,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        let vector = h.embedder.embed_query(text).await.unwrap();
        let _ = h
            .index
            .upsert("org1", "ws1", id, vec![vector], vec![text.to_string()])
            .await
            .unwrap();
    }

    fn message(query: &str, vss: &str) -> QueryMessage {
        QueryMessage {
            workspace_id: "ws1".to_string(),
            conversation_id: "conv1".to_string(),
            query_text: query.to_string(),
            vss_text: vss.to_string(),
            author_type: "Human".to_string(),
            author_name: "Ada".to_string(),
            ..QueryMessage::default()
        }
    }

    fn types(hub: &MemoryBroadcaster) -> Vec<UpdateType> {
        hub.sent().iter().map(|e| e.update_type).collect()
    }

    #[tokio::test]
    async fn vss_flow_broadcasts_named_results() {
        let h = harness();
        seed_document(&h, "doc1", "contract.txt", "indemnification clause").await;

        h.path
            .run_vss("org1", &message("", "indemnification clause"))
            .await
            .unwrap();

        let sent = h.hub.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].update_type, UpdateType::VssResponse);
        assert_eq!(sent[0].conversation_id, "conv1");
        assert_eq!(sent[0].data["loaders"][0]["documentName"], "contract.txt");
        assert_eq!(sent[0].data["query"], "indemnification clause");
    }

    #[tokio::test]
    async fn vss_without_collection_is_silent() {
        let h = harness();
        h.path
            .run_vss("org1", &message("", "anything"))
            .await
            .unwrap();
        assert!(h.hub.sent().is_empty());
    }

    #[tokio::test]
    async fn analysis_flow_streams_then_finalizes() {
        let h = harness();
        seed_document(&h, "doc1", "contract.txt", "liability cap").await;

        h.path
            .run_analysis("org1", &message("what is the liability cap?", ""))
            .await
            .unwrap();

        let sequence = types(&h.hub);
        assert_eq!(sequence[0], UpdateType::UserResponse);
        assert!(sequence.contains(&UpdateType::QueryStatus));
        assert!(sequence.contains(&UpdateType::VssResponse));
        assert!(sequence.iter().filter(|t| **t == UpdateType::AiStreamChunk).count() > 1);
        assert_eq!(*sequence.last().unwrap(), UpdateType::AiResponse);

        // the streamed chunks reassemble into the final reply
        let sent = h.hub.sent();
        let streamed: String = sent
            .iter()
            .filter(|e| e.update_type == UpdateType::AiStreamChunk)
            .filter_map(|e| e.data.as_str().map(String::from))
            .collect();
        let final_text = sent
            .last()
            .and_then(|e| e.data["text"].as_str())
            .unwrap()
            .to_string();
        assert_eq!(streamed, final_text);
    }

    #[tokio::test]
    async fn force_context_bypasses_search() {
        let h = harness();
        let mut msg = message("summarize", "");
        msg.force_context = "already supplied".to_string();

        h.path.run_analysis("org1", &msg).await.unwrap();

        let sequence = types(&h.hub);
        assert!(!sequence.contains(&UpdateType::VssResponse));
        assert_eq!(*sequence.last().unwrap(), UpdateType::AiResponse);
    }

    #[tokio::test]
    async fn echo_responder_chunks_cover_prompt() {
        let responder = EchoResponder::new(3);
        let chunks: Vec<String> = responder
            .respond("abcdefgh")
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(chunks.join(""), "abcdefgh");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }

    #[test]
    fn prompt_includes_context_and_schema_when_present() {
        let prompt = build_prompt("q", "ctx", "schema");
        assert!(prompt.contains("ctx"));
        assert!(prompt.contains("schema"));
        assert!(prompt.ends_with('q'));

        let bare = build_prompt("q", "", "");
        assert_eq!(bare, "q");
    }
}
