//! Route Handlers
//!
//! One POST route per panel event. Each handler decodes the body strictly,
//! hands the event to the shared [`Frontend`] and translates the outcome:
//!
//! ```text
//!   POST /alert       AlertEvent       ──▶ play_sound (if any) ──▶ show_alert
//!   POST /sound       SoundEvent       ──▶ play_sound (skipped when empty)
//!   POST /power       PowerEvent       ──▶ do_power_action
//!   POST /brightness  BrightnessEvent  ──▶ set_brightness
//! ```
//!
//! Decoding happens before any capability is touched, so a malformed body
//! never has side effects.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use panel_core::{AlertEvent, BrightnessEvent, Frontend, PowerEvent, SoundEvent};

use crate::error::ApiError;

/// Shared handler state
pub type SharedFrontend = Arc<Frontend>;

/// JSON body extractor that ignores Content-Type
///
/// The whole body is read and decoded with `serde_json`; unknown fields,
/// missing required fields and type mismatches all reject with 400.
#[derive(Debug)]
pub struct StrictJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidBody(e.to_string()))?;
        serde_json::from_slice(&body)
            .map(StrictJson)
            .map_err(|e| ApiError::InvalidBody(e.to_string()))
    }
}

/// Build the event routes (without middleware)
pub fn router(frontend: SharedFrontend) -> Router {
    Router::new()
        .route("/alert", post(handle_alert))
        .route("/sound", post(handle_sound))
        .route("/power", post(handle_power))
        .route("/brightness", post(handle_brightness))
        .with_state(frontend)
}

async fn handle_alert(
    State(frontend): State<SharedFrontend>,
    StrictJson(event): StrictJson<AlertEvent>,
) -> Result<StatusCode, ApiError> {
    info!(perpetual = event.perpetual, "Handling alert event.");

    if !event.sound.is_empty() {
        frontend.play_sound(&event.sound).await.map_err(ApiError::Sound)?;
    }
    frontend.show_alert(&event).await.map_err(ApiError::Alert)?;
    Ok(StatusCode::OK)
}

async fn handle_sound(
    State(frontend): State<SharedFrontend>,
    StrictJson(event): StrictJson<SoundEvent>,
) -> Result<StatusCode, ApiError> {
    info!(sound = %event.sound, "Handling sound event.");

    if event.is_empty() {
        debug!("Empty sound; nothing to play");
        return Ok(StatusCode::OK);
    }
    frontend.play_sound(&event).await.map_err(ApiError::Sound)?;
    Ok(StatusCode::OK)
}

async fn handle_power(
    State(frontend): State<SharedFrontend>,
    StrictJson(event): StrictJson<PowerEvent>,
) -> Result<StatusCode, ApiError> {
    info!(action = ?event.action, "Handling power event.");

    frontend.do_power_action(&event).await.map_err(ApiError::Power)?;
    Ok(StatusCode::OK)
}

async fn handle_brightness(
    State(frontend): State<SharedFrontend>,
    StrictJson(event): StrictJson<BrightnessEvent>,
) -> Result<StatusCode, ApiError> {
    info!(level = event.level, "Handling brightness event.");

    frontend
        .set_brightness(&event)
        .await
        .map_err(ApiError::Brightness)?;
    Ok(StatusCode::OK)
}
