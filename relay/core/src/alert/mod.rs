//! Alert Lifecycle
//!
//! Tracks every alert window from the moment a request asks for it until
//! it is swept away, and hands all window work to a single UI thread.
//!
//! # Threading
//!
//! [`AlertManager::show`] may be called from any task. It records the
//! window, enqueues its realization and returns immediately. Everything
//! that touches the renderer or changes a window's state runs on the
//! [`UiLoop`] thread, in the order it was enqueued.

mod render;
mod ui_loop;
mod window;

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub use render::{LogRenderer, RenderError, Renderer, RendererFactory, WindowSpec, WindowStyle};
pub use ui_loop::{IdleCallback, SharedWindows, UiContext, UiLoop, UiLoopConfig};
pub use window::{
    humanize_age, progress_fraction, AlertId, AlertWindow, Countdown, InactiveReason,
    WindowCollection, WindowState,
};

use crate::events::AlertEvent;

/// Icon used when neither the event nor the configuration names one
pub const DEFAULT_ICON: &str = "dialog-information";

/// Timeout used when neither the event nor the configuration sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Errors
// =============================================================================

/// Failure handing work to the UI thread
#[derive(Debug, Error)]
pub enum AlertError {
    /// The UI loop has stopped
    #[error("UI loop is not running")]
    LoopStopped,

    /// Too many callbacks are pending
    #[error("UI work queue is full ({capacity} pending callbacks)")]
    QueueFull {
        /// Queue capacity
        capacity: usize,
    },

    /// The renderer could not be created
    #[error("failed to start renderer: {0}")]
    Renderer(#[from] RenderError),

    /// The UI thread could not be started
    #[error("failed to spawn UI thread: {0}")]
    Spawn(std::io::Error),

    /// The UI thread died unexpectedly
    #[error("UI thread panicked")]
    ThreadPanicked,

    /// The UI thread did not exit before the deadline
    #[error("UI thread did not stop within {0:?}")]
    ShutdownTimedOut(Duration),
}

// =============================================================================
// Normalization
// =============================================================================

/// Rules applied to every incoming alert before it is displayed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Timeout for events that do not set one
    pub default_timeout: Duration,
    /// Icon for events that do not name one
    pub default_icon: String,
    /// Shortest allowed timeout
    pub min_timeout: Option<Duration>,
    /// Longest allowed timeout
    pub max_timeout: Option<Duration>,
    /// Treat perpetual requests as timed ones
    pub forbid_perpetual: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            default_icon: DEFAULT_ICON.to_string(),
            min_timeout: None,
            max_timeout: None,
            forbid_perpetual: false,
        }
    }
}

impl AlertPolicy {
    /// Resolve the countdown and icon for an event
    #[must_use]
    pub fn normalize(&self, event: &AlertEvent) -> (Countdown, String) {
        let icon = if event.icon.is_empty() {
            self.default_icon.clone()
        } else {
            event.icon.clone()
        };

        if event.perpetual && !self.forbid_perpetual {
            return (Countdown::Perpetual, icon);
        }

        let mut timeout = if event.timeout.is_zero() {
            self.default_timeout
        } else {
            event.timeout
        };
        if let Some(min) = self.min_timeout {
            timeout = timeout.max(min);
        }
        if let Some(max) = self.max_timeout {
            timeout = timeout.min(max);
        }

        (Countdown::Timed(timeout), icon)
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Everything needed to start an [`AlertManager`]
#[derive(Clone, Debug, Default)]
pub struct AlertManagerConfig {
    /// Normalization rules
    pub policy: AlertPolicy,
    /// Window dimensions
    pub style: WindowStyle,
    /// UI loop settings
    pub ui: UiLoopConfig,
}

/// Owns the window collection and the UI thread
pub struct AlertManager {
    windows: SharedWindows,
    ui: UiLoop,
    policy: AlertPolicy,
    style: WindowStyle,
    shutdown_timeout: Duration,
}

impl AlertManager {
    /// Start the UI thread and return a manager for it
    pub fn start(config: AlertManagerConfig, factory: RendererFactory) -> Result<Self, AlertError> {
        let windows = SharedWindows::default();
        let shutdown_timeout = config.ui.shutdown_timeout;
        let ui = UiLoop::spawn(config.ui, SharedWindows::clone(&windows), factory)?;
        info!("Alert manager started");

        Ok(Self {
            windows,
            ui,
            policy: config.policy,
            style: config.style,
            shutdown_timeout,
        })
    }

    /// Normalization rules in effect
    #[must_use]
    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Queue an alert for display
    ///
    /// Returns as soon as the realization is enqueued. If the UI thread
    /// cannot accept it, or has begun shutting down, the window is
    /// forgotten and an error returned.
    pub fn show(&self, event: &AlertEvent) -> Result<AlertId, AlertError> {
        let (countdown, icon) = self.policy.normalize(event);
        let id = AlertId::next();

        let spec = WindowSpec {
            id,
            message: event.message.clone(),
            icon: icon.clone(),
            perpetual: countdown == Countdown::Perpetual,
            style: self.style,
        };

        let window = AlertWindow::new(id, event.message.clone(), icon, countdown);
        if self.windows.lock().insert(window).is_err() {
            return Err(AlertError::LoopStopped);
        }

        if let Err(e) = self.ui.invoke(move |ctx| ctx.realize(&spec)) {
            self.windows.lock().retain(|w| w.id != id);
            return Err(e);
        }

        debug!(alert = %id, ?countdown, "Alert queued");
        Ok(id)
    }

    /// Ask the UI thread to close a window
    pub fn dismiss(&self, id: AlertId) -> Result<(), AlertError> {
        self.ui.invoke(move |ctx| {
            ctx.deactivate(id, InactiveReason::Dismissed);
        })
    }

    /// Copy of the tracked windows, oldest first
    #[must_use]
    pub fn windows(&self) -> Vec<AlertWindow> {
        self.windows.lock().to_vec()
    }

    /// Copy of one tracked window
    #[must_use]
    pub fn window(&self, id: AlertId) -> Option<AlertWindow> {
        self.windows.lock().iter().find(|w| w.id == id).cloned()
    }

    /// Number of tracked windows
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.lock().len()
    }

    /// Whether no windows are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.lock().is_empty()
    }

    /// Wait until every callback enqueued before this call has run
    ///
    /// Fails with [`AlertError::LoopStopped`] if the loop exits first.
    pub async fn flush(&self) -> Result<(), AlertError> {
        let (tx, rx) = oneshot::channel();
        self.ui.invoke(move |_| {
            let _ = tx.send(());
        })?;
        rx.await.map_err(|_| AlertError::LoopStopped)
    }

    /// Close every window and stop the UI thread
    ///
    /// The loop closes its windows on the way out, after the callback it
    /// is running returns. Waits at most the configured shutdown timeout
    /// for that. Safe to call more than once; a later call does not wait
    /// again.
    pub async fn shutdown(&self) -> Result<(), AlertError> {
        let Some(handle) = self.ui.stop() else {
            return Ok(());
        };

        let join = tokio::task::spawn_blocking(move || handle.join());
        match tokio::time::timeout(self.shutdown_timeout, join).await {
            Ok(Ok(Ok(()))) => {}
            Ok(_) => return Err(AlertError::ThreadPanicked),
            Err(_) => {
                warn!(timeout = ?self.shutdown_timeout, "UI thread did not stop in time");
                return Err(AlertError::ShutdownTimedOut(self.shutdown_timeout));
            }
        }

        info!("Alert manager stopped");
        Ok(())
    }
}
