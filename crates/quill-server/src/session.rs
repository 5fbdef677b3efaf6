//! One live connection: reader, writer, liveness, dispatch.
//!
//! Each session runs two cooperating tasks linked by its outbound queue.
//! The reader decodes inbound frames and dispatches work; the writer owns
//! the socket sink, drains the queue, and sends the periodic liveness
//! probe. The probe interval stays below the read-timeout window, so a
//! healthy peer always produces traffic before the deadline. Both tasks
//! must end before the session counts as closed, and closing always
//! unregisters from the hub.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use quill_core::control::ControlFrame;
use quill_core::envelope::Envelope;
use quill_engine::JobOrchestrator;

use crate::app::AppState;
use crate::metrics::{WS_CONNECTIONS_TOTAL, WS_DECODE_FAILURES_TOTAL};
use crate::protocol::decode_upload_frame;

/// Path parameters that address a session.
#[derive(Clone, Debug)]
pub struct SessionParams {
    /// Tenant.
    pub org_id: String,
    /// Topic the session subscribes under.
    pub workspace_id: String,
    /// Sub-topic the session subscribes under.
    pub conversation_id: String,
}

/// Run one connection to completion.
pub async fn run(socket: WebSocket, state: AppState, params: SessionParams) {
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    info!(
        workspace = %params.workspace_id,
        conversation = %params.conversation_id,
        "session connected"
    );

    let session = state.settings.session.clone();
    let (queue_tx, queue_rx) = mpsc::channel(session.outbound_queue);
    let id = state
        .hub
        .register(&params.workspace_id, &params.conversation_id, queue_tx)
        .await;

    // Each session gets its own orchestrator: the manifest it carries is
    // session-scoped batch state.
    let orchestrator = Arc::new(JobOrchestrator::new(
        state.deps.clone(),
        &params.org_id,
        &params.workspace_id,
        state.settings.ingest.clone(),
    ));

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_loop(
        sink,
        queue_rx,
        Duration::from_secs(session.ping_interval_secs),
    ));

    read_loop(
        stream,
        &state,
        &params,
        &orchestrator,
        Duration::from_secs(session.read_timeout_secs),
        session.max_frame_bytes,
    )
    .await;

    // Closing: unregistering drops the queue's sender, which lets the
    // writer drain and exit; only then is the session fully closed.
    state
        .hub
        .unregister(&params.workspace_id, &params.conversation_id, id)
        .await;
    let _ = writer.await;
    info!(workspace = %params.workspace_id, "session closed");
}

/// Drain the outbound queue into the socket, pinging on the liveness
/// interval. Exclusive owner of the socket sink.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<Envelope>,
    ping_every: Duration,
) {
    let mut probe = tokio::time::interval_at(tokio::time::Instant::now() + ping_every, ping_every);
    loop {
        tokio::select! {
            envelope = queue.recv() => match envelope {
                Some(envelope) => {
                    let text = match serde_json::to_string(&envelope) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(error = %err, "failed to serialize envelope");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                None => {
                    // queue closed by the hub: say goodbye and stop
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            },
            _ = probe.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Decode inbound frames and dispatch work until the peer goes away.
///
/// One frame's decode failure is logged and the frame dropped; only a
/// missed liveness deadline or an unrecoverable socket error ends the
/// loop.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    params: &SessionParams,
    orchestrator: &Arc<JobOrchestrator>,
    read_timeout: Duration,
    max_frame_bytes: usize,
) {
    let mut credential = String::new();
    loop {
        let message = match tokio::time::timeout(read_timeout, stream.next()).await {
            Err(_) => {
                warn!(workspace = %params.workspace_id, "liveness deadline missed");
                return;
            }
            Ok(None) => return,
            Ok(Some(Err(err))) => {
                warn!(error = %err, "socket read failed");
                return;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Binary(data) => {
                if data.len() > max_frame_bytes {
                    warn!(bytes = data.len(), "oversized frame dropped");
                    continue;
                }
                match decode_upload_frame(&data) {
                    Ok((props, content)) => {
                        debug!(name = %props.name, bytes = content.len(), "upload frame accepted");
                        let orch = Arc::clone(orchestrator);
                        drop(tokio::spawn(async move {
                            if let Err(err) = orch.upload_local(props, content).await {
                                warn!(error = %err, "upload batch rejected");
                            }
                        }));
                    }
                    Err(err) => {
                        counter!(WS_DECODE_FAILURES_TOTAL).increment(1);
                        warn!(error = %err, "binary frame dropped");
                    }
                }
            }
            Message::Text(text) => match serde_json::from_str::<ControlFrame>(text.as_str()) {
                Ok(frame) => {
                    dispatch_control(state, params, orchestrator, &mut credential, frame);
                }
                Err(err) => {
                    counter!(WS_DECODE_FAILURES_TOTAL).increment(1);
                    warn!(error = %err, "control frame dropped");
                }
            },
            Message::Close(_) => return,
            // inbound pings are answered by the transport; pongs just
            // prove liveness, which the timeout above already observed
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Route one control frame. Long-running work goes to its own task so the
/// reader keeps servicing frames.
fn dispatch_control(
    state: &AppState,
    params: &SessionParams,
    orchestrator: &Arc<JobOrchestrator>,
    credential: &mut String,
    frame: ControlFrame,
) {
    if let Some(token) = frame.token {
        debug!("session credential updated");
        *credential = token;
    }

    if let Some(message) = frame.message {
        let query = Arc::clone(&state.query);
        let org_id = params.org_id.clone();
        drop(tokio::spawn(async move {
            let result = if message.vss_text.is_empty() {
                query.run_analysis(&org_id, &message).await
            } else {
                query.run_vss(&org_id, &message).await
            };
            if let Err(err) = result {
                warn!(error = %err, "query failed");
            }
        }));
    }

    // An empty selection still means "reconcile what's already synced".
    let sync_requested = frame.drive_folders.is_some() || frame.sync_folders.is_some();
    let folders: Vec<String> = frame
        .drive_folders
        .into_iter()
        .chain(frame.sync_folders)
        .flat_map(|selection| selection.folders)
        .collect();
    if sync_requested {
        let orch = Arc::clone(orchestrator);
        let credential = credential.clone();
        drop(tokio::spawn(async move {
            if let Err(err) = orch.sync_folders(&credential, &folders).await {
                warn!(error = %err, "sync batch rejected");
            }
        }));
    }
}
