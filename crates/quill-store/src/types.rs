//! Persisted row types.

use chrono::{DateTime, Utc};
use quill_core::manifest::FileProps;
use serde::{Deserialize, Serialize};

/// A persisted document row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document id (uuid string).
    pub id: String,
    /// Owning tenant.
    pub org_id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Name/size/mime as last ingested.
    #[serde(flatten)]
    pub props: FileProps,
    /// Number of chunks produced at last ingest.
    pub chunk_count: i64,
    /// Chunk size used at last ingest.
    pub chunk_size: i64,
    /// Last ingest time.
    pub timestamp: DateTime<Utc>,
}

/// A synced-folder entry: one remote folder the workspace tracks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    /// Entry id.
    pub id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Folder display name.
    pub name: String,
    /// Remote folder id.
    pub remote_id: String,
    /// Remote parent folder id.
    pub remote_parent_id: String,
    /// Remote service discriminator.
    pub service_type: String,
    /// When the folder was last reconciled.
    pub last_synced: DateTime<Utc>,
}

/// A ledger entry: one remote item previously synchronized into a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Entry id (sync id).
    pub id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// The document this remote item was ingested into.
    pub document_id: String,
    /// Remote item id, the sole identity used for reconciliation.
    pub remote_id: String,
    /// Remote parent folder id.
    pub remote_parent_id: String,
    /// Remote service discriminator.
    pub service_type: String,
    /// Remote last-modified value remembered at last sync.
    pub last_modified: DateTime<Utc>,
}
