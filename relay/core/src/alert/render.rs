//! Renderer Boundary
//!
//! The drawing surface for alert windows. A renderer is owned by the UI
//! thread and only ever called from there, so implementations may hold
//! non-`Send` toolkit handles.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info};

use super::window::AlertId;

/// Visual dimensions applied to every window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowStyle {
    /// Message font size in points
    pub font_size: u32,
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Icon edge length in pixels
    pub icon_size: u32,
}

impl Default for WindowStyle {
    fn default() -> Self {
        Self {
            font_size: 24,
            width: 480,
            height: 320,
            icon_size: 64,
        }
    }
}

/// Everything a renderer needs to open a window
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSpec {
    /// Window identifier; later calls refer to the window by this id
    pub id: AlertId,
    /// Message text
    pub message: String,
    /// Icon identifier
    pub icon: String,
    /// Whether the progress indicator pulses instead of counting down
    pub perpetual: bool,
    /// Visual dimensions
    pub style: WindowStyle,
}

/// Failure inside a renderer
#[derive(Debug, Error)]
#[error("renderer error: {0}")]
pub struct RenderError(pub String);

/// Drawing surface for alert windows
pub trait Renderer {
    /// Create and show a window
    fn open(&mut self, spec: &WindowSpec) -> Result<(), RenderError>;

    /// Set the countdown indicator of a timed window
    fn set_fraction(&mut self, id: AlertId, fraction: f64);

    /// Advance the activity indicator of a perpetual window
    fn pulse(&mut self, id: AlertId);

    /// Replace the subtitle line (the window's age)
    fn set_subtitle(&mut self, id: AlertId, subtitle: &str);

    /// Destroy a window
    fn close(&mut self, id: AlertId);

    /// Windows the user closed since the last call
    fn take_dismissed(&mut self) -> Vec<AlertId> {
        Vec::new()
    }
}

/// Builds the renderer on the UI thread
pub type RendererFactory = Box<dyn FnOnce() -> Result<Box<dyn Renderer>, RenderError> + Send>;

/// Headless renderer that records windows in the log
#[derive(Debug, Default)]
pub struct LogRenderer {
    open: HashSet<AlertId>,
}

impl LogRenderer {
    /// Create a renderer with no open windows
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory suitable for [`super::UiLoop::spawn`]
    #[must_use]
    pub fn factory() -> RendererFactory {
        Box::new(|| Ok(Box::new(Self::new()) as Box<dyn Renderer>))
    }
}

impl Renderer for LogRenderer {
    fn open(&mut self, spec: &WindowSpec) -> Result<(), RenderError> {
        info!(
            alert = %spec.id,
            icon = %spec.icon,
            perpetual = spec.perpetual,
            "ALERT: {}",
            spec.message
        );
        self.open.insert(spec.id);
        Ok(())
    }

    fn set_fraction(&mut self, _id: AlertId, _fraction: f64) {}

    fn pulse(&mut self, _id: AlertId) {}

    fn set_subtitle(&mut self, id: AlertId, subtitle: &str) {
        if self.open.contains(&id) {
            debug!(alert = %id, subtitle, "Alert age");
        }
    }

    fn close(&mut self, id: AlertId) {
        if self.open.remove(&id) {
            debug!(alert = %id, "Alert window closed");
        }
    }
}
