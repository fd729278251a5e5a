//! Event Dispatch Server
//!
//! Owns the listening socket and the router. Serving and shutting down are
//! driven from different tasks:
//!
//! ```text
//!   task A: listen_and_serve(exited) ──▶ bind ──▶ serve … ──▶ exited.send(())
//!                                                   ▲
//!   task B: shutdown(deadline) ─── stop signal ─────┘  then wait ≤ deadline
//!                                                      for serving to end
//! ```
//!
//! The server never cleans up the [`Frontend`]; the launcher does that once
//! the server has stopped.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use panel_core::{Frontend, ServerConfig};

use crate::handlers;
use crate::middleware::MiddlewareChain;

/// Failure of the HTTP server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind
        addr: SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },

    /// The transport failed while serving
    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),

    /// In-flight requests did not finish before the deadline
    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimedOut(Duration),
}

/// HTTP front door for panel events
pub struct Server {
    config: ServerConfig,
    frontend: Arc<Frontend>,
    middleware: MiddlewareChain,
    started: AtomicBool,
    stop: watch::Sender<bool>,
    finished: watch::Sender<bool>,
    local_addr: watch::Sender<Option<SocketAddr>>,
}

impl Server {
    /// Create a server with the standard middleware chain
    pub fn new(config: ServerConfig, frontend: Arc<Frontend>) -> Self {
        Self {
            config,
            frontend,
            middleware: MiddlewareChain::standard(),
            started: AtomicBool::new(false),
            stop: watch::channel(false).0,
            finished: watch::channel(false).0,
            local_addr: watch::channel(None).0,
        }
    }

    /// Replace the middleware chain
    #[must_use]
    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = middleware;
        self
    }

    /// The fully layered router
    pub fn router(&self) -> Router {
        self.middleware
            .apply(handlers::router(Arc::clone(&self.frontend)))
    }

    /// Address the server is bound to, once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.borrow()
    }

    /// Wait until the server is listening, or has given up
    pub async fn listening(&self) -> Option<SocketAddr> {
        let mut addr = self.local_addr.subscribe();
        let mut finished = self.finished.subscribe();
        tokio::select! {
            bound = addr.wait_for(Option::is_some) => bound.ok().and_then(|a| *a),
            _ = finished.wait_for(|done| *done) => self.local_addr(),
        }
    }

    /// Bind and serve until shutdown is requested or the transport fails
    ///
    /// `exited` is signalled when serving ends, on every path, including a
    /// failed bind.
    pub async fn listen_and_serve(&self, exited: oneshot::Sender<()>) -> Result<(), ServerError> {
        self.started.store(true, Ordering::SeqCst);

        let result = self.serve().await;
        match &result {
            Ok(()) => info!("Server stopped"),
            Err(e) => warn!(error = %e, "Server stopped with error"),
        }

        self.finished.send_replace(true);
        if exited.send(()).is_err() {
            debug!("Exit notification receiver already dropped");
        }
        result
    }

    async fn serve(&self) -> Result<(), ServerError> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let bound = listener.local_addr().map_err(ServerError::Serve)?;
        self.local_addr.send_replace(Some(bound));
        info!(addr = %bound, "Listening for panel events");

        let mut stop = self.stop.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|requested| *requested).await;
            })
            .await
            .map_err(ServerError::Serve)
    }

    /// Stop accepting requests and wait for in-flight ones to drain
    ///
    /// Returns immediately when the server was never started.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ServerError> {
        self.stop.send_replace(true);
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        info!(?deadline, "Shutting down server");
        let mut finished = self.finished.subscribe();
        let drained = tokio::time::timeout(deadline, finished.wait_for(|done| *done))
            .await
            .is_ok();
        if drained {
            Ok(())
        } else {
            Err(ServerError::ShutdownTimedOut(deadline))
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("frontend", &self.frontend)
            .field("middleware", &self.middleware)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}
