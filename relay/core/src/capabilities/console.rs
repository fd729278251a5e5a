//! Console Capabilities
//!
//! Log-only implementations of every capability. They accept any event and
//! describe it through `tracing`, which makes them useful for headless
//! installs and for exercising the dispatch path without hardware.

use async_trait::async_trait;
use tracing::info;

use super::{
    Alerter, AudioPlayer, CapabilityError, Component, DisplayManager, PowerManager,
};
use crate::events::{AlertEvent, BrightnessEvent, PowerAction, PowerEvent, SoundEvent};

/// Writes alert details to the log
#[derive(Debug, Default)]
pub struct LogAlerter;

#[async_trait]
impl Component for LogAlerter {
    fn name(&self) -> &str {
        "log"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl Alerter for LogAlerter {
    async fn show_alert(&self, event: &AlertEvent) -> Result<(), CapabilityError> {
        info!(
            message = %event.message,
            timeout_ms = u64::try_from(event.timeout.as_millis()).unwrap_or(u64::MAX),
            perpetual = event.perpetual,
            icon = %event.icon,
            "Alert received"
        );
        Ok(())
    }
}

/// Writes sound requests to the log
#[derive(Debug, Default)]
pub struct LogAudioPlayer;

#[async_trait]
impl Component for LogAudioPlayer {
    fn name(&self) -> &str {
        "log"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl AudioPlayer for LogAudioPlayer {
    async fn play_sound(&self, event: &SoundEvent) -> Result<(), CapabilityError> {
        info!(sound = %event.sound, "Sound requested");
        Ok(())
    }
}

/// Writes power actions to the log instead of performing them
///
/// Unrecognized actions are still rejected so the console frontend reports
/// the same failures as a real power manager.
#[derive(Debug, Default)]
pub struct LogPowerManager;

#[async_trait]
impl Component for LogPowerManager {
    fn name(&self) -> &str {
        "log"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl PowerManager for LogPowerManager {
    async fn do_power_action(&self, event: &PowerEvent) -> Result<(), CapabilityError> {
        if let PowerAction::Unrecognized(action) = &event.action {
            return Err(CapabilityError::Rejected(format!(
                "'{action}' is not a known power action"
            )));
        }
        info!(action = %event.action, "Power action requested");
        Ok(())
    }
}

/// Writes brightness changes to the log
#[derive(Debug, Default)]
pub struct LogDisplayManager;

#[async_trait]
impl Component for LogDisplayManager {
    fn name(&self) -> &str {
        "log"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl DisplayManager for LogDisplayManager {
    async fn set_brightness(&self, event: &BrightnessEvent) -> Result<(), CapabilityError> {
        info!(level = event.level, "Brightness change requested");
        Ok(())
    }
}
