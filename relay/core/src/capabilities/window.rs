//! Window Alerters
//!
//! [`WindowAlerter`] shows each alert as a window with a countdown bar,
//! driven by an [`AlertManager`]. [`WindowSpeechAlerter`] pairs it with a
//! [`SpeechAlerter`] so alerts are shown and read out loud.
//!
//! # Example Configuration
//!
//! ```toml
//! [frontend.alerter]
//! kind = "window"
//!
//! [frontend.alerter.config]
//! font_size = 24
//! window_size = { width = 480, height = 320 }
//! icon_size = 64
//! defaults = { timeout_ms = 5000, icon = "dialog-information" }
//! timeout_range = { min_ms = 1000, max_ms = 60000 }
//! forbid_perpetual = false
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{decode_config, Alerter, CapabilityError, Component, SpeechAlerter};
use crate::alert::{
    AlertManager, AlertManagerConfig, AlertPolicy, LogRenderer, RenderError, Renderer,
    RendererFactory, UiLoopConfig, WindowStyle, DEFAULT_ICON, DEFAULT_TIMEOUT,
};
use crate::events::AlertEvent;

const MIN_WINDOW_EDGE: u32 = 250;
const MIN_ICON_SIZE: u32 = 8;

// =============================================================================
// Configuration
// =============================================================================

fn default_font_size() -> u32 {
    WindowStyle::default().font_size
}

fn default_icon_size() -> u32 {
    WindowStyle::default().icon_size
}

fn default_queue_capacity() -> usize {
    UiLoopConfig::default().queue_capacity
}

/// Window dimensions in pixels
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        let style = WindowStyle::default();
        Self {
            width: style.width,
            height: style.height,
        }
    }
}

/// Values substituted for unset event fields
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertDefaults {
    /// Timeout in milliseconds; also accepted as `timeout`
    #[serde(default = "AlertDefaults::default_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,
    /// Icon identifier
    #[serde(default = "AlertDefaults::default_icon")]
    pub icon: String,
}

impl AlertDefaults {
    fn default_timeout_ms() -> u64 {
        u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
    }

    fn default_icon() -> String {
        DEFAULT_ICON.to_string()
    }
}

impl Default for AlertDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            icon: Self::default_icon(),
        }
    }
}

/// Accepted timeout bounds; zero or absent leaves a bound unchecked
///
/// The bounds are also accepted under the older keys `min` and `max`,
/// read as milliseconds.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutRange {
    /// Lower bound in milliseconds
    #[serde(default, alias = "min")]
    pub min_ms: Option<u64>,
    /// Upper bound in milliseconds
    #[serde(default, alias = "max")]
    pub max_ms: Option<u64>,
}

impl TimeoutRange {
    fn min(&self) -> Option<Duration> {
        self.min_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    fn max(&self) -> Option<Duration> {
        self.max_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

/// Configuration for [`WindowAlerter`]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowAlerterConfig {
    /// Message font size in points
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Window dimensions
    #[serde(default)]
    pub window_size: WindowSize,
    /// Icon edge length in pixels
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,
    /// Replacements for unset event fields
    #[serde(default)]
    pub defaults: AlertDefaults,
    /// Accepted timeout bounds
    #[serde(default)]
    pub timeout_range: TimeoutRange,
    /// Ignore the perpetual flag of incoming alerts
    #[serde(default)]
    pub forbid_perpetual: bool,
    /// Maximum alerts waiting for the UI thread
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WindowAlerterConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            window_size: WindowSize::default(),
            icon_size: default_icon_size(),
            defaults: AlertDefaults::default(),
            timeout_range: TimeoutRange::default(),
            forbid_perpetual: false,
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl WindowAlerterConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), CapabilityError> {
        let invalid = |msg: &str| -> Result<(), CapabilityError> {
            Err(CapabilityError::InvalidConfig(msg.to_string()))
        };

        if self.font_size < 1 {
            return invalid("font size must be greater than zero");
        }
        if self.defaults.icon.is_empty() {
            return invalid("default icon must be set");
        }
        if self.defaults.timeout_ms < 1 {
            return invalid("default timeout must be greater than zero");
        }
        if let (Some(min), Some(max)) = (self.timeout_range.min(), self.timeout_range.max()) {
            if min > max {
                return invalid("min timeout cannot be greater than max timeout");
            }
        }
        let default_timeout = Duration::from_millis(self.defaults.timeout_ms);
        if self.timeout_range.min().is_some_and(|min| default_timeout < min)
            || self.timeout_range.max().is_some_and(|max| default_timeout > max)
        {
            return invalid("default timeout must lie within the timeout range");
        }
        if self.window_size.width < MIN_WINDOW_EDGE {
            return invalid("window cannot be less than 250 pixels wide");
        }
        if self.window_size.height < MIN_WINDOW_EDGE {
            return invalid("window cannot be less than 250 pixels high");
        }
        if self.icon_size < MIN_ICON_SIZE {
            return invalid("icon size cannot be smaller than 8 pixels");
        }
        if self.queue_capacity < 1 {
            return invalid("queue capacity must be greater than zero");
        }
        Ok(())
    }

    fn manager_config(&self) -> AlertManagerConfig {
        AlertManagerConfig {
            policy: AlertPolicy {
                default_timeout: Duration::from_millis(self.defaults.timeout_ms),
                default_icon: self.defaults.icon.clone(),
                min_timeout: self.timeout_range.min(),
                max_timeout: self.timeout_range.max(),
                forbid_perpetual: self.forbid_perpetual,
            },
            style: WindowStyle {
                font_size: self.font_size,
                width: self.window_size.width,
                height: self.window_size.height,
                icon_size: self.icon_size,
            },
            ui: UiLoopConfig {
                queue_capacity: self.queue_capacity,
                ..UiLoopConfig::default()
            },
        }
    }
}

// =============================================================================
// Window Alerter
// =============================================================================

type MakeRenderer = dyn Fn() -> Result<Box<dyn Renderer>, RenderError> + Send + Sync;

/// Presents alerts as windows with a countdown
pub struct WindowAlerter {
    make_renderer: Arc<MakeRenderer>,
    manager: Option<AlertManager>,
}

impl WindowAlerter {
    /// Create an alerter whose windows are drawn by `make_renderer`
    ///
    /// The closure runs on the UI thread when the alerter is initialized.
    pub fn new<F>(make_renderer: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Renderer>, RenderError> + Send + Sync + 'static,
    {
        Self {
            make_renderer: Arc::new(make_renderer),
            manager: None,
        }
    }

    /// Create an alerter that records windows in the log
    #[must_use]
    pub fn headless() -> Self {
        Self::new(|| Ok(Box::new(LogRenderer::new()) as Box<dyn Renderer>))
    }

    /// The running alert manager, once initialized
    #[must_use]
    pub fn manager(&self) -> Option<&AlertManager> {
        self.manager.as_ref()
    }

    fn running(&self) -> Result<&AlertManager, CapabilityError> {
        self.manager
            .as_ref()
            .ok_or_else(|| CapabilityError::Unavailable("window alerter not initialized".to_string()))
    }
}

impl std::fmt::Debug for WindowAlerter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowAlerter")
            .field("initialized", &self.manager.is_some())
            .finish()
    }
}

#[async_trait]
impl Component for WindowAlerter {
    fn name(&self) -> &str {
        "window"
    }

    async fn init(&mut self, config: &serde_json::Value) -> Result<(), CapabilityError> {
        let config: WindowAlerterConfig = decode_config(config)?;
        config.validate()?;

        if self.manager.is_some() {
            return Err(CapabilityError::Unavailable(
                "window alerter already initialized".to_string(),
            ));
        }

        let make_renderer = Arc::clone(&self.make_renderer);
        let factory: RendererFactory = Box::new(move || make_renderer());
        let manager_config = config.manager_config();

        // Starting the UI thread waits for the renderer to come up
        let manager =
            tokio::task::spawn_blocking(move || AlertManager::start(manager_config, factory))
                .await
                .map_err(|e| CapabilityError::Unavailable(format!("UI startup task failed: {e}")))??;

        info!(
            queue_capacity = config.queue_capacity,
            forbid_perpetual = config.forbid_perpetual,
            "Window alerter ready"
        );
        self.manager = Some(manager);
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        if let Some(manager) = &self.manager {
            manager.shutdown().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Alerter for WindowAlerter {
    async fn show_alert(&self, event: &AlertEvent) -> Result<(), CapabilityError> {
        let id = self.running()?.show(event)?;
        debug!(alert = %id, "Displaying alert window to user");
        Ok(())
    }
}

// =============================================================================
// Window + Speech Alerter
// =============================================================================

/// Configuration for [`WindowSpeechAlerter`]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSpeechConfig {
    /// Configuration passed to the window alerter
    #[serde(default)]
    pub window: serde_json::Value,
    /// Configuration passed to the speech alerter
    #[serde(default)]
    pub speech: serde_json::Value,
    /// Messages starting with this prefix are shown (without the prefix)
    /// but not read out loud
    #[serde(default)]
    pub no_tts_prefix: Option<String>,
}

/// Shows alerts on screen and reads them out loud
#[derive(Debug)]
pub struct WindowSpeechAlerter {
    window: WindowAlerter,
    speech: SpeechAlerter,
    no_tts_prefix: Option<String>,
}

impl WindowSpeechAlerter {
    /// Pair a window alerter with a speech alerter
    #[must_use]
    pub fn new(window: WindowAlerter) -> Self {
        Self {
            window,
            speech: SpeechAlerter::new(),
            no_tts_prefix: None,
        }
    }

    /// The window half of this alerter
    #[must_use]
    pub fn window(&self) -> &WindowAlerter {
        &self.window
    }

    /// Remove the no-TTS prefix, reporting whether it was present
    fn strip_prefix<'a>(&self, message: &'a str) -> (&'a str, bool) {
        match self.no_tts_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => match message.strip_prefix(prefix) {
                Some(rest) => (rest, true),
                None => (message, false),
            },
            _ => (message, false),
        }
    }
}

#[async_trait]
impl Component for WindowSpeechAlerter {
    fn name(&self) -> &str {
        "window+speech"
    }

    async fn init(&mut self, config: &serde_json::Value) -> Result<(), CapabilityError> {
        let config: WindowSpeechConfig = decode_config(config)?;
        self.no_tts_prefix = config.no_tts_prefix.filter(|p| !p.is_empty());

        self.window.init(&config.window).await?;
        if let Err(e) = self.speech.init(&config.speech).await {
            // Do not leave the UI thread running behind a failed init
            if let Err(cleanup) = self.window.cleanup().await {
                warn!(error = %cleanup, "Failed to stop window alerter after speech init failure");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        let mut failures = Vec::new();
        if let Err(e) = self.window.cleanup().await {
            failures.push(format!("window: {e}"));
        }
        if let Err(e) = self.speech.cleanup().await {
            failures.push(format!("speech: {e}"));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CapabilityError::Cleanup(failures.join("; ")))
        }
    }
}

#[async_trait]
impl Alerter for WindowSpeechAlerter {
    async fn show_alert(&self, event: &AlertEvent) -> Result<(), CapabilityError> {
        let (message, silenced) = self.strip_prefix(&event.message);
        if silenced {
            debug!("Detected no-TTS prefix; skipping alert read-out");
        }

        let shown = AlertEvent {
            message: message.to_string(),
            ..event.clone()
        };
        self.window.show_alert(&shown).await?;

        if !silenced {
            self.speech.speak_detached(&shown.message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::WindowState;
    use serde_json::json;

    #[test]
    fn test_default_config_is_valid() {
        WindowAlerterConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let cases = [
            json!({"font_size": 0}),
            json!({"window_size": {"width": 100, "height": 400}}),
            json!({"window_size": {"width": 400, "height": 249}}),
            json!({"icon_size": 4}),
            json!({"defaults": {"timeout_ms": 0}}),
            json!({"defaults": {"icon": ""}}),
            json!({"timeout_range": {"min_ms": 5000, "max_ms": 1000}}),
            json!({"defaults": {"timeout_ms": 500}, "timeout_range": {"min_ms": 1000}}),
        ];
        for case in cases {
            let config: WindowAlerterConfig = decode_config(&case).unwrap();
            assert!(config.validate().is_err(), "{case} should be rejected");
        }
    }

    #[test]
    fn test_zero_bounds_are_unchecked() {
        let config: WindowAlerterConfig =
            decode_config(&json!({"timeout_range": {"min_ms": 0, "max_ms": 0}})).unwrap();
        config.validate().unwrap();
        let policy = config.manager_config().policy;
        assert_eq!(policy.min_timeout, None);
        assert_eq!(policy.max_timeout, None);
    }

    #[test]
    fn test_older_key_names_are_accepted() {
        let config: WindowAlerterConfig = decode_config(&json!({
            "defaults": {"timeout": 3000, "icon": "dialog-warning"},
            "timeout_range": {"min": 1000, "max": 10000}
        }))
        .unwrap();
        config.validate().unwrap();

        let policy = config.manager_config().policy;
        assert_eq!(policy.default_timeout, Duration::from_secs(3));
        assert_eq!(policy.min_timeout, Some(Duration::from_secs(1)));
        assert_eq!(policy.max_timeout, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_show_before_init_is_unavailable() {
        let alerter = WindowAlerter::headless();
        let err = alerter.show_alert(&AlertEvent::new("hi")).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_window_alerter_lifecycle() {
        let mut alerter = WindowAlerter::headless();
        alerter.init(&serde_json::Value::Null).await.unwrap();

        alerter.show_alert(&AlertEvent::new("hello")).await.unwrap();
        let manager = alerter.manager().unwrap();
        manager.flush().await.unwrap();
        assert_eq!(manager.windows()[0].state, WindowState::Active);

        alerter.cleanup().await.unwrap();
        assert!(alerter.manager().unwrap().is_empty());
        let err = alerter.show_alert(&AlertEvent::new("late")).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Alert(_)));
    }

    #[tokio::test]
    async fn test_renderer_failure_fails_init() {
        let mut alerter = WindowAlerter::new(|| Err(RenderError("no display".to_string())));
        let err = alerter.init(&serde_json::Value::Null).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Alert(_)));
    }

    #[tokio::test]
    async fn test_prefix_is_stripped_before_display() {
        let mut alerter = WindowSpeechAlerter::new(WindowAlerter::headless());
        alerter
            .init(&json!({
                "speech": {"command": ["true"]},
                "no_tts_prefix": "[quiet] ",
            }))
            .await
            .unwrap();

        alerter
            .show_alert(&AlertEvent::new("[quiet] build finished"))
            .await
            .unwrap();

        let manager = alerter.window().manager().unwrap();
        manager.flush().await.unwrap();
        assert_eq!(manager.windows()[0].message, "build finished");

        alerter.cleanup().await.unwrap();
    }
}
