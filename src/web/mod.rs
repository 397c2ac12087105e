//! Local browser chat backend.
//!
//! JSON endpoints over `axum`; the page itself is whatever front end the
//! user points at `127.0.0.1:<web_port>`.

mod browser;
mod handlers;


use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::DaemonClient;
use crate::core::local_models::OllamaCli;
use crate::core::sessions::SessionStore;

pub use browser::open_browser;
pub use handlers::SESSION_HEADER;

/// Uploads are buffered whole before the turn is composed.
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Everything a handler needs, shared across requests.
#[derive(Clone)]
pub struct WebState {
    inner: Arc<WebInner>,
}

struct WebInner {
    client: DaemonClient,
    inventory: OllamaCli,
    config_path: PathBuf,
    sessions: SessionStore,
}

impl WebState {
    pub fn new(client: DaemonClient, inventory: OllamaCli, config_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(WebInner {
                client,
                inventory,
                config_path,
                sessions: SessionStore::new(),
            }),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/set-model", post(handlers::set_model))
        .route("/chat", post(handlers::chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Binds `127.0.0.1:port`, optionally opens a browser, and serves until the
/// process is stopped.
pub async fn serve(state: WebState, port: u16, open: bool) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let url = format!("http://localhost:{port}");
    info!(%url, "Chat backend listening");
    println!("Chat started at {url}");

    if open {
        if let Err(err) = open_browser(&url).await {
            warn!(%url, error = %err, "Could not open a browser");
            eprintln!("⚠️  Could not open a browser: {err}. Visit {url} manually.");
        }
    }

    axum::serve(listener, router(state)).await?;
    Ok(())
}
