//! End-to-end session tests over a real WebSocket connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use quill_core::manifest::FileProps;
use quill_embeddings::HashEmbedder;
use quill_engine::{Broadcaster, EchoResponder, OrchestratorDeps, QueryPath};
use quill_extract::PlainTextExtractor;
use quill_index::MemoryVectorIndex;
use quill_remote::{FixtureRemote, RemoteItem};
use quill_server::app::{AppState, router};
use quill_server::hub::Hub;
use quill_server::protocol::encode_upload_frame;
use quill_settings::QuillSettings;
use quill_store::{MemoryDocumentStore, RecordingUsageMeter};

const CREDENTIAL: &str = "tok";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    store: Arc<MemoryDocumentStore>,
    remote: Arc<FixtureRemote>,
    _cancel: CancellationToken,
}

async fn start_server() -> TestServer {
    let cancel = CancellationToken::new();
    let (hub, _hub_task) = Hub::spawn(cancel.clone());

    let store = Arc::new(MemoryDocumentStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let remote = Arc::new(FixtureRemote::new(CREDENTIAL));
    let embedder = Arc::new(HashEmbedder::new(16));
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(hub.clone());

    let deps = OrchestratorDeps {
        store: store.clone(),
        index: index.clone(),
        remote: remote.clone(),
        extractor: Arc::new(PlainTextExtractor::new()),
        embedder: embedder.clone(),
        meter: Arc::new(RecordingUsageMeter::new()),
        broadcaster: broadcaster.clone(),
    };
    let settings = QuillSettings::default();
    let query = Arc::new(QueryPath::new(
        store.clone(),
        index,
        embedder,
        Arc::new(EchoResponder::new(8)),
        broadcaster,
        settings.search.clone(),
    ));
    let state = AppState {
        hub,
        deps,
        query,
        settings: Arc::new(settings),
        metrics: None,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _ = tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    TestServer {
        addr,
        store,
        remote,
        _cancel: cancel,
    }
}

async fn connect(addr: SocketAddr, conversation: &str) -> Socket {
    let url = format!("ws://{addr}/ws/org1/ws1/{conversation}");
    let (socket, _) = connect_async(url).await.expect("websocket connect");
    socket
}

/// Next text frame as JSON, skipping transport frames.
async fn next_envelope(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(10), socket.next())
            .await
            .expect("timed out waiting for envelope")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("envelope is JSON");
        }
    }
}

/// Collect envelopes until the terminal manifest arrives.
async fn collect_until_done(socket: &mut Socket) -> Vec<Value> {
    let mut seen = Vec::new();
    loop {
        let envelope = next_envelope(socket).await;
        let done = envelope["updateType"] == "UploadManifest" && envelope["data"]["stage"] == "done";
        seen.push(envelope);
        if done {
            return seen;
        }
    }
}

fn props(name: &str, size: i64) -> FileProps {
    FileProps {
        name: name.to_string(),
        size,
        mime_type: "text/plain".to_string(),
    }
}

#[tokio::test]
async fn upload_reports_progress_and_lands_in_store() {
    let server = start_server().await;
    let mut socket = connect(server.addr, "conv1").await;

    let frame = encode_upload_frame(&props("notes.txt", 11), b"hello world");
    socket.send(Message::Binary(frame.into())).await.unwrap();

    let seen = collect_until_done(&mut socket).await;

    // batch announcement precedes every status
    assert_eq!(seen[0]["updateType"], "UploadManifest");
    assert_eq!(seen[0]["data"]["stage"], "active");

    // stage progress is monotonic
    let progresses: Vec<i64> = seen
        .iter()
        .filter(|e| e["updateType"] == "UploadStatus")
        .filter_map(|e| e["data"]["progress"].as_i64())
        .collect();
    assert!(!progresses.is_empty());
    assert!(progresses.windows(2).all(|w| w[0] <= w[1]), "{progresses:?}");

    // terminal manifest carries the completed record
    let done = seen.last().unwrap();
    let records = done["data"]["folderRecords"]["default"].as_object().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records.values().all(|r| r["completed"] == true));

    assert_eq!(server.store.document_count(), 1);
}

#[tokio::test]
async fn malformed_frame_is_dropped_session_survives() {
    let server = start_server().await;
    let mut socket = connect(server.addr, "conv1").await;

    // garbage binary frame, then garbage text frame
    socket
        .send(Message::Binary(vec![0x00, 0x01, 0x02].into()))
        .await
        .unwrap();
    socket
        .send(Message::Text("not json".into()))
        .await
        .unwrap();

    // the session still processes a valid upload afterwards
    let frame = encode_upload_frame(&props("notes.txt", 11), b"hello world");
    socket.send(Message::Binary(frame.into())).await.unwrap();

    let seen = collect_until_done(&mut socket).await;
    assert!(!seen.is_empty());
    assert_eq!(server.store.document_count(), 1);
}

#[tokio::test]
async fn token_then_sync_ingests_remote_folder() {
    let server = start_server().await;
    server.remote.add_folder("f1", "Contracts");
    server.remote.put_item(
        "f1",
        RemoteItem {
            id: "r1".to_string(),
            parent_id: "f1".to_string(),
            name: "clause.txt".to_string(),
            size: 12,
            mime_type: "text/plain".to_string(),
            last_modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        },
        bytes::Bytes::from("request body"),
    );

    let mut socket = connect(server.addr, "conv1").await;
    socket
        .send(Message::Text(json!({ "token": CREDENTIAL }).to_string().into()))
        .await
        .unwrap();
    socket
        .send(Message::Text(
            json!({ "syncFolders": { "folders": ["f1"] } }).to_string().into(),
        ))
        .await
        .unwrap();

    let seen = collect_until_done(&mut socket).await;

    // the remote flow reported its fetch stage
    let stages: Vec<&str> = seen
        .iter()
        .filter(|e| e["updateType"] == "UploadStatus")
        .filter_map(|e| e["data"]["uploadEvent"]["stage"].as_str())
        .collect();
    assert!(stages.contains(&"Downloading"));
    assert!(stages.contains(&"Synchronizing"));

    assert_eq!(server.store.document_count(), 1);
    assert_eq!(server.store.ledger_count(), 1);
}

#[tokio::test]
async fn sync_without_token_is_rejected_with_auth_error() {
    let server = start_server().await;
    server.remote.add_folder("f1", "Contracts");

    let mut socket = connect(server.addr, "conv1").await;
    socket
        .send(Message::Text(
            json!({ "syncFolders": { "folders": ["f1"] } }).to_string().into(),
        ))
        .await
        .unwrap();

    let envelope = next_envelope(&mut socket).await;
    assert_eq!(envelope["updateType"], "AuthError");
    assert_eq!(envelope["data"]["status"], 401);
}

#[tokio::test]
async fn vss_query_returns_scored_results() {
    let server = start_server().await;
    let mut socket = connect(server.addr, "conv1").await;

    let frame = encode_upload_frame(&props("notes.txt", 11), b"hello world");
    socket.send(Message::Binary(frame.into())).await.unwrap();
    let _ = collect_until_done(&mut socket).await;

    socket
        .send(Message::Text(
            json!({
                "message": {
                    "workspaceId": "ws1",
                    "conversationId": "conv1",
                    "vssText": "hello world"
                }
            })
            .to_string()
            .into(),
        ))
        .await
        .unwrap();

    let envelope = next_envelope(&mut socket).await;
    assert_eq!(envelope["updateType"], "VssResponse");
    assert_eq!(envelope["conversationId"], "conv1");
    let loaders = envelope["data"]["loaders"].as_array().unwrap();
    assert_eq!(loaders.len(), 1);
    assert_eq!(loaders[0]["documentName"], "notes.txt");
}

#[tokio::test]
async fn analysis_query_streams_chunks_then_final_reply() {
    let server = start_server().await;
    let mut socket = connect(server.addr, "conv1").await;

    socket
        .send(Message::Text(
            json!({
                "message": {
                    "workspaceId": "ws1",
                    "conversationId": "conv1",
                    "queryText": "summarize the workspace",
                    "authorType": "Human",
                    "authorName": "Ada"
                }
            })
            .to_string()
            .into(),
        ))
        .await
        .unwrap();

    let mut streamed = String::new();
    let final_text = loop {
        let envelope = next_envelope(&mut socket).await;
        match envelope["updateType"].as_str().unwrap() {
            "AIStreamChunk" => streamed.push_str(envelope["data"].as_str().unwrap()),
            "AIResponse" => break envelope["data"]["text"].as_str().unwrap().to_string(),
            _ => {}
        }
    };
    assert!(!streamed.is_empty());
    assert_eq!(streamed, final_text);
}

#[tokio::test]
async fn workspace_wide_broadcasts_reach_sibling_conversations() {
    let server = start_server().await;
    let mut uploader = connect(server.addr, "conv1").await;
    let mut viewer = connect(server.addr, "conv2").await;

    let frame = encode_upload_frame(&props("notes.txt", 11), b"hello world");
    uploader.send(Message::Binary(frame.into())).await.unwrap();

    // upload progress is workspace-wide: the sibling conversation sees the
    // same terminal manifest
    let seen = collect_until_done(&mut viewer).await;
    let done = seen.last().unwrap();
    assert_eq!(done["data"]["stage"], "done");
    let _ = collect_until_done(&mut uploader).await;
}
