//! `gitdbd` — the HTTP front-end for the gitdb engine (§6).
//!
//! Wires a `gitdb_engine::Engine` rooted at `--root` (backed by a real
//! `GitHistoryStore`) to a single `POST /sql` route on `--port`.

mod error;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use gitdb_engine::Engine;
use gitdb_storage::GitHistoryStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::error::ApiError;

#[derive(Parser)]
#[command(name = "gitdbd")]
#[command(author = "gitdb contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "gitdb HTTP daemon", long_about = None)]
struct Cli {
    /// Global root directory for databases.
    #[arg(long, default_value = ".gitdb")]
    root: PathBuf,

    /// TCP port for the HTTP endpoint.
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines.
    #[arg(long)]
    json: bool,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

#[derive(Deserialize)]
struct SqlRequest {
    sql: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    gitdb_core::telemetry::init_tracing(cli.json, level);

    let engine = Arc::new(Engine::new(cli.root.clone(), Arc::new(GitHistoryStore::default())));
    let state = AppState { engine };

    let app = Router::new()
        .route("/sql", post(handle_sql))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!(event = "server.start", root = %cli.root.display(), %addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_sql(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SqlRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session_id = headers
        .get("Session-ID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("default")
        .to_string();

    let output = state.engine.execute(&session_id, &request.sql).await?;
    Ok(Json(
        serde_json::to_value(output).expect("ExecuteOutput always serializes"),
    ))
}
