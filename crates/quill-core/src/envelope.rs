//! Outbound message envelopes.
//!
//! An [`Envelope`] is one addressed, pre-built outbound unit: the payload,
//! an update-type tag, and the routing keys the hub fans out on (workspace
//! as topic, conversation as sub-topic). A conversation id of
//! [`crate::constants::CONVERSATION_NIL`] addresses every conversation in
//! the workspace.
//!
//! Constructor functions build each update type the wire knows about, so
//! callers never assemble routing fields by hand.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::constants::CONVERSATION_NIL;
use crate::control::QueryMessage;
use crate::manifest::{BatchStage, Manifest, UploadEvent};

/// Discriminator for outbound envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateType {
    /// Credential or quota rejection.
    AuthError,
    /// Echo of a user's query message.
    UserResponse,
    /// Final model reply for an analysis query.
    #[serde(rename = "AIResponse")]
    AiResponse,
    /// One streamed model completion chunk.
    #[serde(rename = "AIStreamChunk")]
    AiStreamChunk,
    /// Human-readable query progress line.
    QueryStatus,
    /// Scored similarity-search results grouped by document.
    VssResponse,
    /// One stage transition of one in-flight item.
    UploadStatus,
    /// A failed stage transition.
    ErrorStatus,
    /// Full manifest snapshot (batch start and batch end).
    UploadManifest,
}

/// One addressed outbound unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Pre-built payload.
    pub data: Value,
    /// Payload discriminator.
    pub update_type: UpdateType,
    /// Topic key.
    pub workspace_id: String,
    /// Sub-topic key, or `"nil"` for the whole workspace.
    pub conversation_id: String,
}

impl Envelope {
    /// Whether this envelope addresses every conversation in its workspace.
    pub fn is_workspace_wide(&self) -> bool {
        self.conversation_id == CONVERSATION_NIL
    }
}

/// Credential failure or quota rejection, addressed to the whole workspace.
pub fn auth_error(message: &str, status: u16, workspace_id: &str, user_id: &str) -> Envelope {
    Envelope {
        data: json!({ "userId": user_id, "status": status, "errorMessage": message }),
        update_type: UpdateType::AuthError,
        workspace_id: workspace_id.to_string(),
        conversation_id: CONVERSATION_NIL.to_string(),
    }
}

/// Echo a user's query message back to its conversation.
pub fn user_response(message: &QueryMessage, workspace_id: &str, conversation_id: &str) -> Envelope {
    Envelope {
        data: json!(message),
        update_type: UpdateType::UserResponse,
        workspace_id: workspace_id.to_string(),
        conversation_id: conversation_id.to_string(),
    }
}

/// Final model reply for an analysis query.
pub fn ai_response(reply: Value, workspace_id: &str, conversation_id: &str) -> Envelope {
    Envelope {
        data: reply,
        update_type: UpdateType::AiResponse,
        workspace_id: workspace_id.to_string(),
        conversation_id: conversation_id.to_string(),
    }
}

/// One streamed completion chunk.
pub fn ai_stream_chunk(chunk: &str, workspace_id: &str, conversation_id: &str) -> Envelope {
    Envelope {
        data: json!(chunk),
        update_type: UpdateType::AiStreamChunk,
        workspace_id: workspace_id.to_string(),
        conversation_id: conversation_id.to_string(),
    }
}

/// Human-readable progress line for an in-flight query.
pub fn query_status(text: &str, workspace_id: &str, conversation_id: &str) -> Envelope {
    Envelope {
        data: json!({ "text": text }),
        update_type: UpdateType::QueryStatus,
        workspace_id: workspace_id.to_string(),
        conversation_id: conversation_id.to_string(),
    }
}

/// Similarity-search results grouped by document.
pub fn vss_response(context: Value, workspace_id: &str, conversation_id: &str) -> Envelope {
    Envelope {
        data: context,
        update_type: UpdateType::VssResponse,
        workspace_id: workspace_id.to_string(),
        conversation_id: conversation_id.to_string(),
    }
}

/// One successful stage transition. Progress comes from the fixed table.
pub fn upload_status(event: &UploadEvent, workspace_id: &str, document_id: &str) -> Envelope {
    Envelope {
        data: json!({
            "documentId": document_id,
            "uploadEvent": event,
            "progress": event.stage.progress(),
        }),
        update_type: UpdateType::UploadStatus,
        workspace_id: workspace_id.to_string(),
        conversation_id: CONVERSATION_NIL.to_string(),
    }
}

/// One failed stage transition. Failed items report full progress so the
/// viewer's bar terminates rather than stalling.
pub fn error_status(event: &UploadEvent, workspace_id: &str, document_id: &str) -> Envelope {
    Envelope {
        data: json!({
            "documentId": document_id,
            "uploadEvent": event,
            "progress": 100,
        }),
        update_type: UpdateType::ErrorStatus,
        workspace_id: workspace_id.to_string(),
        conversation_id: CONVERSATION_NIL.to_string(),
    }
}

/// Full manifest snapshot, broadcast at batch start (`active`) and exactly
/// once at batch end (`done`).
pub fn upload_manifest(stage: BatchStage, workspace_id: &str, manifest: &Manifest) -> Envelope {
    Envelope {
        data: json!({ "stage": stage, "folderRecords": manifest }),
        update_type: UpdateType::UploadManifest,
        workspace_id: workspace_id.to_string(),
        conversation_id: CONVERSATION_NIL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_GROUP;
    use crate::manifest::{FileMeta, FileProps, FileRecord};
    use crate::progress::{Stage, StageAction};

    #[test]
    fn auth_error_targets_whole_workspace() {
        let env = auth_error("quota exceeded", 402, "ws1", "user1");
        assert!(env.is_workspace_wide());
        assert_eq!(env.update_type, UpdateType::AuthError);
        assert_eq!(env.data["status"], 402);
        assert_eq!(env.data["userId"], "user1");
    }

    #[test]
    fn upload_status_carries_table_progress() {
        let event = UploadEvent::new(Stage::Embedding, StageAction::Started);
        let env = upload_status(&event, "ws1", "doc1");
        assert_eq!(env.data["progress"], 45);
        assert_eq!(env.data["documentId"], "doc1");
        assert_eq!(env.data["uploadEvent"]["stage"], "Embedding");
        assert!(env.is_workspace_wide());
    }

    #[test]
    fn error_status_reports_full_progress() {
        let event = UploadEvent::failed(Stage::Parsing, "bad bytes");
        let env = error_status(&event, "ws1", "doc1");
        assert_eq!(env.update_type, UpdateType::ErrorStatus);
        assert_eq!(env.data["progress"], 100);
        assert_eq!(env.data["uploadEvent"]["detail"], "bad bytes");
    }

    #[test]
    fn conversation_envelopes_keep_their_sub_topic() {
        let env = query_status("Building prompt...", "ws1", "conv1");
        assert!(!env.is_workspace_wide());
        assert_eq!(env.conversation_id, "conv1");
    }

    #[test]
    fn manifest_snapshot_round_trips() {
        let mut manifest = Manifest::new();
        manifest.insert(
            DEFAULT_GROUP,
            FileRecord::new(FileMeta::minted(
                "ws1",
                FileProps {
                    name: "a.txt".into(),
                    size: 10,
                    mime_type: "text/plain".into(),
                },
            )),
        );
        let env = upload_manifest(BatchStage::Active, "ws1", &manifest);
        assert_eq!(env.data["stage"], "active");
        assert_eq!(
            env.data["folderRecords"][DEFAULT_GROUP]
                .as_object()
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn update_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&UpdateType::AiStreamChunk).unwrap(),
            "\"AIStreamChunk\""
        );
        assert_eq!(
            serde_json::to_string(&UpdateType::UploadManifest).unwrap(),
            "\"UploadManifest\""
        );
    }

    #[test]
    fn envelope_wire_shape() {
        let env = ai_stream_chunk("hel", "ws1", "conv1");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["updateType"], "AIStreamChunk");
        assert_eq!(json["workspaceId"], "ws1");
        assert_eq!(json["conversationId"], "conv1");
        assert_eq!(json["data"], "hel");
    }
}
