//! Panel Daemon - HTTP Surface for panel-relay
//!
//! Accepts panel events over HTTP and dispatches them to a shared
//! [`panel_core::Frontend`].
//!
//! # Request Path
//!
//! ```text
//! TCP ──▶ request id ──▶ panic recovery ──▶ error logging ──▶ handler
//!                                                               │
//!                                            StrictJson<Event> ─┤
//!                                                               ▼
//!                                                       Arc<Frontend>
//! ```
//!
//! # Module Overview
//!
//! - [`server`]: Binding, serving and graceful shutdown
//! - [`handlers`]: Routes and strict body decoding
//! - [`middleware`]: The ordered middleware chain
//! - [`request_id`]: Per-request identifiers
//! - [`error`]: Mapping failures onto HTTP responses

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request_id;
pub mod server;

pub use error::{ApiError, ErrorDetail};
pub use handlers::{router, StrictJson};
pub use middleware::{Middleware, MiddlewareChain};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
pub use server::{Server, ServerError};
