//! Middleware Chain
//!
//! Request-wide behavior layered around the route handlers. Layers are
//! registered in order and applied so that the **last registered runs
//! first**:
//!
//! ```text
//!   registered: error logging, panic recovery, request id
//!
//!   request ──▶ request id ──▶ panic recovery ──▶ error logging ──▶ handler
//! ```
//!
//! With the default chain every log line, including the error log and the
//! panic report, is emitted inside the `request` span.

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};

use axum::extract::Request;
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, warn};

use crate::error::{ApiError, ErrorDetail};
use crate::request_id::assign_request_id;

type Handler = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// One named layer of the chain
#[derive(Clone)]
pub struct Middleware {
    name: &'static str,
    handler: Handler,
}

impl Middleware {
    /// Wrap an `async fn(Request, Next) -> Response`
    pub fn new<F, Fut>(name: &'static str, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            name,
            handler: Arc::new(move |req, next| f(req, next).boxed()),
        }
    }

    /// Layer name, for diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Logs every 4xx and 5xx response
    #[must_use]
    pub fn error_logging() -> Self {
        Self::new("error_logging", log_errors)
    }

    /// Turns handler panics into 500 responses
    #[must_use]
    pub fn panic_recovery() -> Self {
        Self::new("panic_recovery", recover_panics)
    }

    /// Assigns a request identifier and opens the request span
    #[must_use]
    pub fn request_id() -> Self {
        Self::new("request_id", assign_request_id)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}

/// Ordered collection of middleware
#[derive(Clone, Debug, Default)]
pub struct MiddlewareChain {
    layers: Vec<Middleware>,
}

impl MiddlewareChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Error logging, panic recovery and request ids, in that order
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(Middleware::error_logging())
            .with(Middleware::panic_recovery())
            .with(Middleware::request_id())
    }

    /// Register a layer; it runs before every layer registered earlier
    #[must_use]
    pub fn with(mut self, middleware: Middleware) -> Self {
        self.layers.push(middleware);
        self
    }

    /// Layer names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(Middleware::name).collect()
    }

    /// Wrap a router with every registered layer
    pub fn apply(&self, router: Router) -> Router {
        self.layers.iter().fold(router, |router, middleware| {
            let handler = Arc::clone(&middleware.handler);
            router.layer(from_fn(move |req: Request, next: Next| {
                let handler = Arc::clone(&handler);
                async move { handler(req, next).await }
            }))
        })
    }
}

// =============================================================================
// Error Logging
// =============================================================================

async fn log_errors(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (component, chain) = match response.extensions().get::<ErrorDetail>() {
        Some(detail) => (
            detail.component.map(|c| c.label()).unwrap_or("-"),
            detail.chain.as_str(),
        ),
        None => ("-", ""),
    };

    if status.is_server_error() {
        error!(status = status.as_u16(), %method, path, component, error = chain, "Request failed");
    } else {
        warn!(status = status.as_u16(), %method, path, error = chain, "Request rejected");
    }
    response
}

// =============================================================================
// Panic Recovery
// =============================================================================

thread_local! {
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Record a backtrace at every panic site, then defer to the previous hook
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_panic_trace() -> Option<String> {
    PANIC_TRACE.with(|slot| slot.borrow_mut().take())
}

fn panic_cause(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

async fn recover_panics(req: Request, next: Next) -> Response {
    install_panic_hook();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let cause = panic_cause(payload.as_ref());
            let stack = take_panic_trace().unwrap_or_else(|| "<unavailable>".to_string());
            error!(cause, stack, "Recovered from panic while handling request");
            ApiError::Panic.into_response()
        }
    }
}
