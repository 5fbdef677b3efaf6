//! Inbound control-frame types.
//!
//! A text control frame carries exactly one meaningful field; the session
//! inspects them in order and dispatches the first one present. Unknown
//! fields are ignored so clients can evolve ahead of the server.

use serde::{Deserialize, Serialize};

/// A user query routed to the retrieval path.
///
/// `vss_text` selects the raw similarity-search flow; otherwise
/// `query_text` drives the analysis flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryMessage {
    /// Workspace the query runs against.
    pub workspace_id: String,
    /// Conversation the responses are addressed to.
    pub conversation_id: String,
    /// Instruction template selector.
    pub template_id: Option<String>,
    /// Analysis query text.
    pub query_text: String,
    /// Raw similarity-search text; non-empty selects the vss flow.
    pub vss_text: String,
    /// Caller-supplied context that bypasses the search step.
    pub force_context: String,
    /// Expected shape of the model's reply.
    pub response_schema: String,
    /// Author kind ("Human" on inbound frames).
    pub author_type: String,
    /// Display name of the author.
    pub author_name: String,
    /// Client-side timestamp, RFC 3339.
    pub timestamp: Option<String>,
}

/// Folder ids selected for synchronization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderSelection {
    /// Remote folder ids.
    pub folders: Vec<String>,
}

/// One decoded text control frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlFrame {
    /// A query for the retrieval path.
    pub message: Option<QueryMessage>,
    /// Folders to register and synchronize.
    pub drive_folders: Option<FolderSelection>,
    /// Folders to synchronize (same handling as `drive_folders`).
    pub sync_folders: Option<FolderSelection>,
    /// Bearer credential for the remote folder service.
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_query_message_frame() {
        let raw = r#"{
            "message": {
                "workspaceId": "ws1",
                "conversationId": "conv1",
                "queryText": "summarize the contract",
                "authorType": "Human",
                "authorName": "Ada"
            }
        }"#;
        let frame: ControlFrame = serde_json::from_str(raw).unwrap();
        let message = frame.message.unwrap();
        assert_eq!(message.workspace_id, "ws1");
        assert_eq!(message.query_text, "summarize the contract");
        assert!(message.vss_text.is_empty());
        assert!(frame.sync_folders.is_none());
        assert!(frame.token.is_none());
    }

    #[test]
    fn decodes_sync_folders_frame() {
        let raw = r#"{ "syncFolders": { "folders": ["folder-a", "folder-b"] } }"#;
        let frame: ControlFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.sync_folders.unwrap().folders.len(), 2);
        assert!(frame.message.is_none());
    }

    #[test]
    fn decodes_token_frame() {
        let raw = r#"{ "token": "bearer-xyz" }"#;
        let frame: ControlFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.token.as_deref(), Some("bearer-xyz"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = r#"{ "token": "t", "futureField": {"x": 1} }"#;
        let frame: ControlFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.token.as_deref(), Some("t"));
    }

    #[test]
    fn empty_frame_is_valid_and_inert() {
        let frame: ControlFrame = serde_json::from_str("{}").unwrap();
        assert_eq!(frame, ControlFrame::default());
    }
}
