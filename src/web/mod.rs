//! Web layer module
//!
//! HTTP interface for the relay. Handlers stay thin and delegate to the
//! services; every failure is rendered by `responses::handle_error`.
//!
//! # Routes
//!
//! - `GET /stream` and `GET /radio-stream`: live transcoded audio
//! - `GET /search` and `GET /related`: media lists
//! - `GET /health`: liveness and tool availability
//! - `GET /api/v1/active-streams`: registry snapshot

use anyhow::Result;
use axum::{Router, middleware as axum_middleware, routing::get};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::services::{
    ActiveStreams, ProcessRunner, SearchAggregator, SourceResolver, ToolReport, TranscodeRelay,
};

pub mod api;
pub mod handlers;
pub mod middleware;
pub mod responses;

pub use responses::{ErrorBody, handle_error};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: SourceResolver,
    pub search: SearchAggregator,
    pub relay: TranscodeRelay,
    pub active_streams: Arc<ActiveStreams>,
    pub tools: Arc<ToolReport>,
    pub started_at: Instant,
    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire every service to one process runner
    pub fn new(config: Config, runner: Arc<dyn ProcessRunner>, tools: ToolReport) -> AppResult<Self> {
        config.validate().map_err(|e| AppError::Configuration {
            message: e.to_string(),
        })?;

        let shutdown = CancellationToken::new();
        let resolver = SourceResolver::new(runner.clone(), &config.resolver)?;
        let search = SearchAggregator::new(runner.clone(), &config.search);
        let relay = TranscodeRelay::new(
            runner,
            config.transcoder.clone(),
            config.relay.clone(),
            shutdown.clone(),
        );
        let active_streams = Arc::new(ActiveStreams::new(
            config.relay.max_concurrent_streams,
            config.relay.max_concurrent_lookups,
        ));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            search,
            relay,
            active_streams,
            tools: Arc::new(tools),
            started_at: Instant::now(),
            shutdown,
        })
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stream", get(handlers::stream::stream_audio))
        .route("/radio-stream", get(handlers::stream::stream_radio))
        .route("/search", get(handlers::search::search))
        .route("/related", get(handlers::search::related))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api::routes())
        .layer(axum_middleware::from_fn(middleware::request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        let shutdown = state.shutdown.clone();
        Ok(Self {
            app: create_router(state),
            addr,
            shutdown,
        })
    }

    /// Serve until SIGINT/SIGTERM, then shut down gracefully
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.addr, e))?;
        info!("Listening on http://{}", self.addr);

        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves.
    ///
    /// The signal cancels the shutdown token first, which ends every open
    /// audio body and kills its transcoder, so the graceful drain cannot be
    /// held open by a live stream.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                signal.await;
                info!("Ending open streams");
                shutdown.cancel();
            })
            .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
                }
            }
            _ => {
                warn!("Failed to install signal handlers, falling back to Ctrl+C");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
