//! Serves the public backend parameters the hub fetches once at startup.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use services::BackendConfig;
use services::config::backend_from_lookup;
use tokio::{
    net::TcpListener,
    signal::{self, ctrl_c},
};
use tracing::{info, warn};

pub const CONFIG_ROUTE: &str = "/api/config";

const MISSING_CONFIG: &str = "Supabase configuration not found";

pub struct ConfigState {
    backend: Option<BackendConfig>,
}

impl ConfigState {
    /// Read backend parameters through `lookup`. Missing values are served
    /// as an error rather than refusing to start.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Arc<Self> {
        let backend = backend_from_lookup(lookup)
            .map_err(|err| warn!(error = %err, "backend configuration incomplete"))
            .ok();
        Arc::new(Self { backend })
    }
}

pub async fn config_handler(State(state): State<Arc<ConfigState>>) -> Response {
    match &state.backend {
        Some(backend) => (
            StatusCode::OK,
            [(CACHE_CONTROL, "public, max-age=0, must-revalidate")],
            Json(backend.clone()),
        )
            .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": MISSING_CONFIG })),
        )
            .into_response(),
    }
}

pub fn router(state: Arc<ConfigState>) -> Router {
    Router::new()
        .route(CONFIG_ROUTE, get(config_handler))
        .with_state(state)
}

pub async fn serve(addr: &str, state: Arc<ConfigState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Config endpoint running on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Config endpoint shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!(error = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
