//! Axum router and application state.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use quill_engine::{OrchestratorDeps, QueryPath};
use quill_settings::QuillSettings;

use crate::hub::Hub;
use crate::session::{self, SessionParams};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The session hub.
    pub hub: Hub,
    /// Collaborator handles for per-session orchestrators.
    pub deps: OrchestratorDeps,
    /// The retrieval flows.
    pub query: Arc<QueryPath>,
    /// Service configuration.
    pub settings: Arc<QuillSettings>,
    /// Prometheus render handle, when metrics are installed.
    pub metrics: Option<PrometheusHandle>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route(
            "/ws/{org_id}/{workspace_id}/{conversation_id}",
            get(ws_upgrade),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn greeting() -> &'static str {
    concat!("quill ", env!("CARGO_PKG_VERSION"))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Path((org_id, workspace_id, conversation_id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Response {
    let params = SessionParams {
        org_id,
        workspace_id,
        conversation_id,
    };
    ws.on_upgrade(move |socket| session::run(socket, state, params))
}
