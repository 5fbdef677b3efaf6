//! Batch-tracking structures: [`Manifest`] → [`FileRecord`] → [`EventStream`].
//!
//! One `Manifest` is created per batch invocation (a manual upload or a
//! folder reconciliation pass), lives for the batch's duration, and is
//! discarded after the terminal broadcast. Records are never deleted within
//! a batch, only superseded by the next batch's fresh manifest.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progress::{Stage, StageAction};

/// Core file properties carried by every work item.
///
/// Also the exact JSON shape of a binary upload frame's header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProps {
    /// Display name of the file.
    pub name: String,
    /// Size in bytes as reported by the source.
    pub size: i64,
    /// MIME type as reported by the source.
    pub mime_type: String,
}

/// Stable identity and addressing for one work item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// Stable identity, minted when the unit of work is identified.
    pub id: Uuid,
    /// Document id (the string form of `id` for new items, or the existing
    /// document's id for updated/missing items).
    pub document_id: String,
    /// Workspace the item belongs to.
    pub workspace_id: String,
    /// Name/size/mime as reported by the source.
    #[serde(flatten)]
    pub props: FileProps,
}

impl FileMeta {
    /// Mint a fresh identity for a newly discovered item.
    pub fn minted(workspace_id: &str, props: FileProps) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            document_id: id.to_string(),
            workspace_id: workspace_id.to_string(),
            props,
        }
    }

    /// Adopt an existing document's identity (updated/missing items).
    pub fn adopted(document_id: &str, workspace_id: &str, props: FileProps) -> Self {
        let id = Uuid::parse_str(document_id).unwrap_or_else(|_| Uuid::new_v4());
        Self {
            id,
            document_id: document_id.to_string(),
            workspace_id: workspace_id.to_string(),
            props,
        }
    }
}

/// One stage transition in an item's event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    /// Stage name.
    pub stage: Stage,
    /// Started / Completed / Failed.
    pub action: StageAction,
    /// Failure detail; empty for successful transitions.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl UploadEvent {
    /// A successful transition.
    pub fn new(stage: Stage, action: StageAction) -> Self {
        Self {
            stage,
            action,
            detail: String::new(),
        }
    }

    /// A failed transition with a detail string.
    pub fn failed(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            action: StageAction::Failed,
            detail: detail.into(),
        }
    }
}

/// Append-only ordered log of stage transitions for one item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventStream {
    events: Vec<UploadEvent>,
}

impl EventStream {
    /// An empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event.
    pub fn push(&mut self, event: UploadEvent) {
        self.events.push(event);
    }

    /// Events in arrival order.
    pub fn events(&self) -> &[UploadEvent] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether anything has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether any recorded transition failed.
    pub fn has_failure(&self) -> bool {
        self.events.iter().any(|e| e.action == StageAction::Failed)
    }
}

/// Per-item progress record within a manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Identity and core properties.
    #[serde(flatten)]
    pub meta: FileMeta,
    /// Ordered stage-transition log.
    pub event_stream: EventStream,
    /// Set exactly once, by the task that owns this record, after the
    /// event stream is fully populated.
    pub completed: bool,
}

impl FileRecord {
    /// A fresh, incomplete record for a newly identified item.
    pub fn new(meta: FileMeta) -> Self {
        Self {
            meta,
            event_stream: EventStream::new(),
            completed: false,
        }
    }
}

/// Lifecycle label attached to manifest broadcasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStage {
    /// Work is still in flight.
    Active,
    /// Every record has completed.
    Done,
}

/// In-flight batch state: group key (folder id, or [`crate::constants::DEFAULT_GROUP`]
/// for manual uploads) → document id → [`FileRecord`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    groups: HashMap<String, HashMap<String, FileRecord>>,
}

impl Manifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under a group, creating the group lazily.
    pub fn insert(&mut self, group: &str, record: FileRecord) {
        let document_id = record.meta.document_id.clone();
        let _ = self
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(document_id, record);
    }

    /// Finalize one record: install its event stream and set the completion
    /// flag. Returns false if the slot does not exist.
    pub fn finalize(&mut self, group: &str, document_id: &str, events: EventStream) -> bool {
        match self
            .groups
            .get_mut(group)
            .and_then(|g| g.get_mut(document_id))
        {
            Some(record) => {
                record.event_stream = events;
                record.completed = true;
                true
            }
            None => false,
        }
    }

    /// Whether every record in every group has completed.
    pub fn is_done(&self) -> bool {
        self.groups
            .values()
            .flat_map(HashMap::values)
            .all(|r| r.completed)
    }

    /// Look up one record.
    pub fn record(&self, group: &str, document_id: &str) -> Option<&FileRecord> {
        self.groups.get(group).and_then(|g| g.get(document_id))
    }

    /// Total number of records across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(HashMap::len).sum()
    }

    /// Whether the manifest holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
