//! Process wiring: opens the stores, runs the evictor and serves a small
//! status endpoint until Ctrl+C / SIGTERM.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::queue::{BufferPool, FileQueue};
use crate::store::{DbStore, StoreStats, run_evictor};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DbStore>,
    pub queue: Arc<FileQueue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub store: StoreStats,
    pub queue: QueueStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub committed: usize,
    pub current_index: u64,
}

impl AppState {
    /// Open the store and queue described by `config`
    pub fn open(config: &Config) -> Result<Self, AnyError> {
        if !BufferPool::init_global(config.queue.buffer_size.as_usize()) {
            warn!("Buffer pool already initialized, keeping existing buffer size");
        }
        let store = DbStore::open(&config.storage.directory, config.storage.ttl())?;
        let queue = FileQueue::open(&config.queue.directory)?;
        Ok(Self {
            store: Arc::new(store),
            queue: Arc::new(queue),
        })
    }

    pub fn status(&self) -> StatusResponse {
        let committed = self.queue.len().unwrap_or_else(|err| {
            warn!(%err, "Failed to count queue entries");
            0
        });
        StatusResponse {
            store: self.store.stats(),
            queue: QueueStatus {
                committed,
                current_index: self.queue.current_index(),
            },
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let state = AppState::open(&config)?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let evictor = tokio::spawn(run_evictor(
        state.store.clone(),
        config.eviction.interval(),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let address = config.server.bind_addr;
    let listener = TcpListener::bind(address).await?;
    info!(%address, "signalspool status endpoint listening");

    axum::serve(listener, router(state.clone()).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(());
    evictor.await?;
    state.store.persist()?;
    info!("Stores flushed, exiting");

    Ok(())
}

/// Open everything once and report its status
pub fn inspect(config: &Config) -> Result<StatusResponse, AnyError> {
    let state = AppState::open(config)?;
    Ok(state.status())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::task::spawn_blocking(move || state.status()).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => {
            error!(%err, "Stats task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(%err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
