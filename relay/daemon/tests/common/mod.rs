//! Fake capabilities shared by the daemon integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use tokio::sync::Notify;

use panel_core::{
    Alerter, AlertEvent, AudioPlayer, BrightnessEvent, CapabilityError, Component, DisplayManager,
    PowerEvent, PowerManager, SoundEvent,
};

/// Shared, ordered record of capability calls
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// Configurable behavior of a fake capability
#[derive(Clone, Default)]
pub struct Behavior {
    pub fail_calls: bool,
    pub fail_cleanup: bool,
}

impl Behavior {
    pub fn failing() -> Self {
        Self {
            fail_calls: true,
            ..Self::default()
        }
    }

    pub fn failing_cleanup() -> Self {
        Self {
            fail_cleanup: true,
            ..Self::default()
        }
    }
}

/// Alerter that records calls, panics on "boom", lingers on "brief" and
/// stalls on "slow"
pub struct FakeAlerter {
    pub calls: Calls,
    pub behavior: Behavior,
    pub entered: Arc<Notify>,
}

impl FakeAlerter {
    pub fn new(calls: &Calls) -> Self {
        Self {
            calls: calls.clone(),
            behavior: Behavior::default(),
            entered: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl Component for FakeAlerter {
    fn name(&self) -> &str {
        "fake"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        self.calls.push("cleanup:alerter");
        if self.behavior.fail_cleanup {
            return Err(CapabilityError::Unavailable("alerter".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Alerter for FakeAlerter {
    async fn show_alert(&self, event: &AlertEvent) -> Result<(), CapabilityError> {
        self.calls.push(format!("alert:{}", event.message));
        match event.message.as_str() {
            "boom" => panic!("alerter exploded"),
            "slow" => {
                self.entered.notify_one();
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            "brief" => {
                self.entered.notify_one();
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            _ => {}
        }
        if self.behavior.fail_calls {
            return Err(CapabilityError::Rejected(event.message.clone()));
        }
        Ok(())
    }
}

/// Audio player that records calls
pub struct FakeAudioPlayer {
    pub calls: Calls,
    pub behavior: Behavior,
}

#[async_trait]
impl Component for FakeAudioPlayer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        self.calls.push("cleanup:audio_player");
        if self.behavior.fail_cleanup {
            return Err(CapabilityError::Unavailable("audio".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AudioPlayer for FakeAudioPlayer {
    async fn play_sound(&self, event: &SoundEvent) -> Result<(), CapabilityError> {
        self.calls.push(format!("sound:{}", event.sound));
        if self.behavior.fail_calls {
            return Err(CapabilityError::Rejected(event.sound.clone()));
        }
        Ok(())
    }
}

/// Power manager that records calls
pub struct FakePowerManager {
    pub calls: Calls,
    pub behavior: Behavior,
}

#[async_trait]
impl Component for FakePowerManager {
    fn name(&self) -> &str {
        "fake"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        self.calls.push("cleanup:power_manager");
        if self.behavior.fail_cleanup {
            return Err(CapabilityError::Unavailable("power".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PowerManager for FakePowerManager {
    async fn do_power_action(&self, event: &PowerEvent) -> Result<(), CapabilityError> {
        self.calls.push(format!("power:{}", event.action));
        if self.behavior.fail_calls {
            return Err(CapabilityError::Rejected(event.action.to_string()));
        }
        Ok(())
    }
}

/// Display manager that records calls
pub struct FakeDisplayManager {
    pub calls: Calls,
    pub behavior: Behavior,
}

#[async_trait]
impl Component for FakeDisplayManager {
    fn name(&self) -> &str {
        "fake"
    }

    async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        self.calls.push("cleanup:display_manager");
        if self.behavior.fail_cleanup {
            return Err(CapabilityError::Unavailable("display".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DisplayManager for FakeDisplayManager {
    async fn set_brightness(&self, event: &BrightnessEvent) -> Result<(), CapabilityError> {
        self.calls.push(format!("brightness:{}", event.level));
        if self.behavior.fail_calls {
            return Err(CapabilityError::Rejected(event.level.to_string()));
        }
        Ok(())
    }
}

/// Build a POST request with a raw body
pub fn post(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .body(Body::from(body.to_string()))
        .unwrap()
}
