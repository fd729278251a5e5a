//! HTTP Error Responses
//!
//! Every failure a handler can report, and how each maps onto a status
//! code and a fixed, client-facing message. The full error chain never
//! reaches the client; it travels in an [`ErrorDetail`] response extension
//! so the error-logging middleware can record it.

use std::error::Error as _;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use panel_core::{ComponentKind, FrontendError};

/// Internal description of a failed request, attached to the response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Component the failure is attributed to
    pub component: Option<ComponentKind>,
    /// Full error chain, outermost first
    pub chain: String,
}

/// Failure of a request handler
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body is not valid JSON or does not match the event schema
    #[error("JSON is invalid or violates schema.")]
    InvalidBody(String),

    /// The audio player failed
    #[error("Failed to play sound.")]
    Sound(#[source] FrontendError),

    /// The alerter failed
    #[error("Failed to present alert to user.")]
    Alert(#[source] FrontendError),

    /// The power manager failed
    #[error("Failed to perform requested power action.")]
    Power(#[source] FrontendError),

    /// The display manager failed
    #[error("Failed to perform requested brightness action.")]
    Brightness(#[source] FrontendError),

    /// A handler panicked
    #[error("Internal server error.")]
    Panic,
}

impl ApiError {
    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Sound(_) | Self::Alert(_) | Self::Power(_) | Self::Brightness(_) | Self::Panic => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Internal description for logging
    #[must_use]
    pub fn detail(&self) -> ErrorDetail {
        let component = match self {
            Self::Sound(e) | Self::Alert(e) | Self::Power(e) | Self::Brightness(e) => e.component(),
            Self::InvalidBody(_) | Self::Panic => None,
        };

        let mut chain = self.to_string();
        if let Self::InvalidBody(reason) = self {
            chain.push_str(": ");
            chain.push_str(reason);
        }
        let mut source = self.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }

        ErrorDetail { component, chain }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.detail();
        let mut response = (self.status(), self.to_string()).into_response();
        response.extensions_mut().insert(detail);
        response
    }
}
