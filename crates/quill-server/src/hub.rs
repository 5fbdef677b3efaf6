//! The session hub: one registry of who listens to what.
//!
//! All subscriber-set state lives inside a single actor task reached only
//! through request messages, never a lock shared across sessions. Each
//! subscriber is a bounded outbound queue; delivery is `try_send`, so one
//! slow consumer can never stall the loop or its neighbors. A consumer
//! that keeps dropping gets evicted, which closes its queue and lets its
//! session wind down.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, gauge};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quill_core::envelope::Envelope;
use quill_engine::Broadcaster;

use crate::metrics::{WS_BROADCAST_DROPS_TOTAL, WS_CONNECTIONS_ACTIVE};

/// Total lifetime drops before a slow subscriber is evicted.
const MAX_TOTAL_DROPS: u64 = 100;

/// Bound on how long shutdown waits for sessions to unregister.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// Control-channel depth; registrations and broadcasts share it.
const CONTROL_QUEUE: usize = 256;

enum HubRequest {
    Register {
        id: u64,
        workspace_id: String,
        conversation_id: String,
        queue: mpsc::Sender<Envelope>,
    },
    Unregister {
        id: u64,
        workspace_id: String,
        conversation_id: String,
    },
    Broadcast(Envelope),
    Count(oneshot::Sender<usize>),
}

struct Subscriber {
    queue: mpsc::Sender<Envelope>,
    drops: u64,
}

type Registry = HashMap<String, HashMap<String, HashMap<u64, Subscriber>>>;

/// Handle to the hub actor. Cheap to clone; all clones address the same
/// registry task.
#[derive(Clone)]
pub struct Hub {
    tx: mpsc::Sender<HubRequest>,
    cancel: CancellationToken,
    next_id: Arc<AtomicU64>,
}

impl Hub {
    /// Spawn the hub actor. The returned task ends once `cancel` fires and
    /// every registered session has unregistered (bounded by
    /// [`SHUTDOWN_WAIT`]).
    pub fn spawn(cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CONTROL_QUEUE);
        let handle = tokio::spawn(run(rx, cancel.clone()));
        (
            Self {
                tx,
                cancel,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            handle,
        )
    }

    /// Register a session's outbound queue under (topic, sub-topic).
    /// Returns the subscriber id used to unregister later.
    pub async fn register(
        &self,
        workspace_id: &str,
        conversation_id: &str,
        queue: mpsc::Sender<Envelope>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .tx
            .send(HubRequest::Register {
                id,
                workspace_id: workspace_id.to_string(),
                conversation_id: conversation_id.to_string(),
                queue,
            })
            .await;
        id
    }

    /// Remove a session. Unregistering an already-absent session is a
    /// no-op.
    pub async fn unregister(&self, workspace_id: &str, conversation_id: &str, id: u64) {
        let _ = self
            .tx
            .send(HubRequest::Unregister {
                id,
                workspace_id: workspace_id.to_string(),
                conversation_id: conversation_id.to_string(),
            })
            .await;
    }

    /// Current subscriber count (diagnostics and tests).
    pub async fn subscriber_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(HubRequest::Count(tx)).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

#[async_trait]
impl Broadcaster for Hub {
    /// Fan an envelope out to its addressees. Envelopes broadcast after
    /// shutdown began are silently dropped.
    async fn broadcast(&self, envelope: Envelope) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.tx.send(HubRequest::Broadcast(envelope)).await;
    }
}

async fn run(mut rx: mpsc::Receiver<HubRequest>, cancel: CancellationToken) {
    let mut registry: Registry = HashMap::new();
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                shutdown(&mut registry, &mut rx).await;
                return;
            }
            request = rx.recv() => {
                let Some(request) = request else { return };
                handle(&mut registry, request);
            }
        }
    }
}

fn handle(registry: &mut Registry, request: HubRequest) {
    match request {
        HubRequest::Register {
            id,
            workspace_id,
            conversation_id,
            queue,
        } => {
            debug!(workspace = %workspace_id, conversation = %conversation_id, id, "registering");
            let _ = registry
                .entry(workspace_id)
                .or_default()
                .entry(conversation_id)
                .or_default()
                .insert(id, Subscriber { queue, drops: 0 });
            gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        }
        HubRequest::Unregister {
            id,
            workspace_id,
            conversation_id,
        } => {
            let Some(conversations) = registry.get_mut(&workspace_id) else {
                return;
            };
            let Some(subscribers) = conversations.get_mut(&conversation_id) else {
                return;
            };
            if subscribers.remove(&id).is_some() {
                debug!(workspace = %workspace_id, conversation = %conversation_id, id, "unregistered");
                gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
            }
            // prune the empty sub-topic; the topic entry is kept for reuse
            if subscribers.is_empty() {
                let _ = conversations.remove(&conversation_id);
            }
        }
        HubRequest::Broadcast(envelope) => deliver(registry, &envelope),
        HubRequest::Count(reply) => {
            let count = registry
                .values()
                .flat_map(HashMap::values)
                .map(HashMap::len)
                .sum();
            let _ = reply.send(count);
        }
    }
}

fn deliver(registry: &mut Registry, envelope: &Envelope) {
    let Some(conversations) = registry.get_mut(&envelope.workspace_id) else {
        return;
    };

    let mut evicted: Vec<(String, u64)> = Vec::new();
    if envelope.is_workspace_wide() {
        // sentinel sub-topic: the union of every conversation's subscribers
        for (conversation_id, subscribers) in conversations.iter_mut() {
            for (id, subscriber) in subscribers.iter_mut() {
                if !offer(subscriber, envelope) {
                    evicted.push((conversation_id.clone(), *id));
                }
            }
        }
    } else if let Some(subscribers) = conversations.get_mut(&envelope.conversation_id) {
        for (id, subscriber) in subscribers.iter_mut() {
            if !offer(subscriber, envelope) {
                evicted.push((envelope.conversation_id.clone(), *id));
            }
        }
    }

    for (conversation_id, id) in evicted {
        if let Some(subscribers) = conversations.get_mut(&conversation_id) {
            let _ = subscribers.remove(&id);
            gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
            if subscribers.is_empty() {
                let _ = conversations.remove(&conversation_id);
            }
        }
    }
}

/// Offer one envelope to one subscriber without blocking. Returns false
/// if the subscriber must be evicted.
fn offer(subscriber: &mut Subscriber, envelope: &Envelope) -> bool {
    match subscriber.queue.try_send(envelope.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Closed(_)) => false,
        Err(mpsc::error::TrySendError::Full(_)) => {
            subscriber.drops += 1;
            counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
            if subscriber.drops >= MAX_TOTAL_DROPS {
                warn!(drops = subscriber.drops, "evicting slow subscriber");
                false
            } else {
                warn!(drops = subscriber.drops, "subscriber queue full, envelope dropped");
                true
            }
        }
    }
}

/// Close every outbound queue, then wait (bounded) for every session to
/// come back with its unregister.
async fn shutdown(registry: &mut Registry, rx: &mut mpsc::Receiver<HubRequest>) {
    let mut remaining = 0usize;
    for conversations in registry.values_mut() {
        for subscribers in conversations.values_mut() {
            remaining += subscribers.len();
            subscribers.clear(); // drops the senders, closing each queue
        }
        conversations.clear();
    }
    registry.clear();
    info!(remaining, "hub shutting down, waiting for sessions");

    let deadline = tokio::time::Instant::now() + SHUTDOWN_WAIT;
    while remaining > 0 {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(HubRequest::Unregister { .. })) => remaining -= 1,
            Ok(Some(HubRequest::Count(reply))) => {
                let _ = reply.send(0);
            }
            Ok(Some(_)) => {} // late registrations and broadcasts are dropped
            Ok(None) => break,
            Err(_) => {
                warn!(remaining, "shutdown wait elapsed with sessions still open");
                break;
            }
        }
    }
}
