//! Quill server binary.
//!
//! Wires the hub, engine, and collaborator seams together and serves the
//! WebSocket and HTTP endpoints. This build runs the in-memory
//! collaborators (store, index, fixture remote, hash embedder); a vendor
//! deployment swaps them behind the same traits.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quill_embeddings::HashEmbedder;
use quill_engine::{Broadcaster, EchoResponder, OrchestratorDeps, QueryPath};
use quill_extract::PlainTextExtractor;
use quill_index::MemoryVectorIndex;
use quill_remote::FixtureRemote;
use quill_settings::{QuillSettings, load_settings, load_settings_from_path};
use quill_store::{MemoryDocumentStore, RecordingUsageMeter};

use quill_server::app::{AppState, router};
use quill_server::hub::Hub;
use quill_server::metrics;

/// Command-line flags; each overrides its settings-file counterpart.
#[derive(Parser, Debug)]
#[command(name = "quill-server", version, about = "Quill knowledge-base server")]
struct Args {
    /// Bind address.
    #[arg(long)]
    host: Option<String>,

    /// Listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Settings file path (otherwise `QUILL_SETTINGS` or defaults).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = match &args.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => load_settings().context("loading settings")?,
    };
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.filter.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let metrics_handle = metrics::install_recorder();

    let cancel = CancellationToken::new();
    let (hub, hub_task) = Hub::spawn(cancel.clone());

    let state = build_state(&hub, &settings, metrics_handle);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "quill server listening");

    let signal_cancel = cancel.clone();
    drop(tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        signal_cancel.cancel();
    }));

    let serve_cancel = cancel.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { serve_cancel.cancelled().await })
        .await
        .context("serving")?;

    // The hub drains its registered sessions (bounded) before exiting.
    cancel.cancel();
    let _ = hub_task.await;
    info!("quill server stopped");
    Ok(())
}

fn build_state(
    hub: &Hub,
    settings: &QuillSettings,
    metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> AppState {
    let store = Arc::new(MemoryDocumentStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let remote = Arc::new(FixtureRemote::new(
        &std::env::var("QUILL_REMOTE_TOKEN").unwrap_or_default(),
    ));
    let embedder = Arc::new(HashEmbedder::new(1536));
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(hub.clone());

    let deps = OrchestratorDeps {
        store: store.clone(),
        index: index.clone(),
        remote,
        extractor: Arc::new(PlainTextExtractor::new()),
        embedder: embedder.clone(),
        meter: Arc::new(RecordingUsageMeter::new()),
        broadcaster: broadcaster.clone(),
    };
    let query = Arc::new(QueryPath::new(
        store,
        index,
        embedder,
        Arc::new(EchoResponder::new(24)),
        broadcaster,
        settings.search.clone(),
    ));

    AppState {
        hub: hub.clone(),
        deps,
        query,
        settings: Arc::new(settings.clone()),
        metrics: Some(metrics_handle),
    }
}
