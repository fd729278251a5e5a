//! Backlight Display Manager
//!
//! Sets panel brightness by writing the level into a sysfs backlight
//! register. The default register belongs to the Raspberry Pi official 7"
//! touchscreen, which blanks below level 10.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{decode_config, CapabilityError, Component, DisplayManager};
use crate::events::BrightnessEvent;

const DEFAULT_BRIGHTNESS_FILE: &str = "/sys/class/backlight/rpi_backlight/brightness";
const DEFAULT_MIN_LEVEL: u8 = 10;

fn default_brightness_file() -> PathBuf {
    PathBuf::from(DEFAULT_BRIGHTNESS_FILE)
}

fn default_min_level() -> u8 {
    DEFAULT_MIN_LEVEL
}

/// Configuration for [`BacklightDisplayManager`]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacklightConfig {
    /// Brightness register file
    #[serde(default = "default_brightness_file")]
    pub brightness_file: PathBuf,
    /// Lowest level the device accepts without blanking
    #[serde(default = "default_min_level")]
    pub min_level: u8,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            brightness_file: default_brightness_file(),
            min_level: default_min_level(),
        }
    }
}

/// Writes brightness levels to a backlight register
#[derive(Debug, Default)]
pub struct BacklightDisplayManager {
    config: BacklightConfig,
}

impl BacklightDisplayManager {
    /// Create a manager targeting the default register
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Component for BacklightDisplayManager {
    fn name(&self) -> &str {
        "backlight"
    }

    async fn init(&mut self, config: &serde_json::Value) -> Result<(), CapabilityError> {
        let config: BacklightConfig = decode_config(config)?;
        if config.brightness_file.as_os_str().is_empty() {
            return Err(CapabilityError::InvalidConfig(
                "brightness file cannot be empty".to_string(),
            ));
        }
        self.config = config;
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl DisplayManager for BacklightDisplayManager {
    async fn set_brightness(&self, event: &BrightnessEvent) -> Result<(), CapabilityError> {
        if event.level < self.config.min_level {
            return Err(CapabilityError::Rejected(format!(
                "device does not support brightness values < {}",
                self.config.min_level
            )));
        }

        let path = &self.config.brightness_file;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(|e| CapabilityError::io("could not open brightness register file", e))?;

        info!(level = event.level, "Setting backlight brightness");

        file.write_all(event.level.to_string().as_bytes())
            .await
            .map_err(|e| CapabilityError::io("could not write to brightness register file", e))?;
        file.flush()
            .await
            .map_err(|e| CapabilityError::io("failed to flush brightness register file", e))?;

        Ok(())
    }
}
