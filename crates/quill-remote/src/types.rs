//! Remote listing types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One child item in a remote folder listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    /// Remote item id, the sole identity used for reconciliation.
    pub id: String,
    /// Remote parent folder id.
    pub parent_id: String,
    /// Display name.
    pub name: String,
    /// Size in bytes as reported by the remote.
    pub size: i64,
    /// MIME type as reported by the remote.
    pub mime_type: String,
    /// Remote last-modified value.
    pub last_modified: DateTime<Utc>,
}

/// Metadata for a remote folder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFolder {
    /// Remote folder id.
    pub id: String,
    /// Remote parent folder id ("root" at the top).
    pub parent_id: String,
    /// Display name.
    pub name: String,
}
