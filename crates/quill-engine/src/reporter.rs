//! Progress reporting through the broadcast seam.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use quill_core::envelope::{self, Envelope};
use quill_core::manifest::UploadEvent;
use quill_core::progress::{Stage, StageAction};

/// Publishes envelopes to whoever is listening.
///
/// The hub implements this; tests use [`MemoryBroadcaster`]. Implementations
/// must never block on a slow consumer.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Publish one envelope. Delivery is best-effort; a dropped envelope
    /// must not fail the caller.
    async fn broadcast(&self, envelope: Envelope);
}

/// Collects broadcasts in memory for inspection.
#[derive(Default)]
pub struct MemoryBroadcaster {
    sent: Mutex<Vec<Envelope>>,
}

impl MemoryBroadcaster {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything broadcast so far, in order.
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Broadcaster for MemoryBroadcaster {
    async fn broadcast(&self, envelope: Envelope) {
        self.sent.lock().push(envelope);
    }
}

/// Formats one workspace's stage transitions and publishes them unbatched,
/// so viewers see each boundary the moment it happens.
#[derive(Clone)]
pub struct ProgressReporter {
    broadcaster: Arc<dyn Broadcaster>,
    workspace_id: String,
}

impl ProgressReporter {
    /// A reporter publishing under the given workspace topic.
    pub fn new(broadcaster: Arc<dyn Broadcaster>, workspace_id: &str) -> Self {
        Self {
            broadcaster,
            workspace_id: workspace_id.to_string(),
        }
    }

    /// Report one stage transition for one item and return the event to
    /// append to the item's stream. A `Some` error turns the transition
    /// into a Failed event published as an error status.
    pub async fn transition(
        &self,
        stage: Stage,
        action: StageAction,
        document_id: &str,
        error: Option<&str>,
    ) -> UploadEvent {
        match error {
            None => {
                let event = UploadEvent::new(stage, action);
                self.broadcaster
                    .broadcast(envelope::upload_status(&event, &self.workspace_id, document_id))
                    .await;
                event
            }
            Some(detail) => {
                let event = UploadEvent::failed(stage, detail);
                self.broadcaster
                    .broadcast(envelope::error_status(&event, &self.workspace_id, document_id))
                    .await;
                event
            }
        }
    }

    /// The underlying broadcast seam, for envelopes the reporter doesn't
    /// format itself (manifest snapshots, auth errors).
    pub fn broadcaster(&self) -> &Arc<dyn Broadcaster> {
        &self.broadcaster
    }

    /// Workspace this reporter publishes under.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }
}
