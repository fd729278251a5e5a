//! Command Power Manager
//!
//! Carries out power actions by running a configured command line for each
//! action. The defaults target systemd hosts running an X display server.
//!
//! # Example Configuration
//!
//! ```toml
//! [frontend.power_manager]
//! kind = "command"
//!
//! [frontend.power_manager.config]
//! shutdown = ["sudo", "shutdown", "now"]
//! reboot = ["sudo", "reboot", "now"]
//! display_off = ["xset", "dpms", "force", "off"]
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{info, warn};

use super::{decode_config, CapabilityError, Component, PowerManager};
use crate::events::{PowerAction, PowerEvent};

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}

fn default_shutdown() -> Vec<String> {
    argv(&["sudo", "shutdown", "now"])
}

fn default_reboot() -> Vec<String> {
    argv(&["sudo", "reboot", "now"])
}

fn default_display_off() -> Vec<String> {
    argv(&["xset", "dpms", "force", "off"])
}

/// Command lines run for each power action
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandPowerConfig {
    /// Command for [`PowerAction::Shutdown`]
    #[serde(default = "default_shutdown")]
    pub shutdown: Vec<String>,
    /// Command for [`PowerAction::Reboot`]
    #[serde(default = "default_reboot")]
    pub reboot: Vec<String>,
    /// Command for [`PowerAction::DisplayOff`]
    #[serde(default = "default_display_off")]
    pub display_off: Vec<String>,
}

impl Default for CommandPowerConfig {
    fn default() -> Self {
        Self {
            shutdown: default_shutdown(),
            reboot: default_reboot(),
            display_off: default_display_off(),
        }
    }
}

impl CommandPowerConfig {
    fn validate(&self) -> Result<(), CapabilityError> {
        for (action, command) in [
            ("shutdown", &self.shutdown),
            ("reboot", &self.reboot),
            ("display_off", &self.display_off),
        ] {
            if command.first().map_or(true, String::is_empty) {
                return Err(CapabilityError::InvalidConfig(format!(
                    "command for '{action}' cannot be empty"
                )));
            }
        }
        Ok(())
    }

    /// Command line for an action, or `None` for unrecognized actions
    fn command_for(&self, action: &PowerAction) -> Option<&[String]> {
        match action {
            PowerAction::Shutdown => Some(&self.shutdown),
            PowerAction::Reboot => Some(&self.reboot),
            PowerAction::DisplayOff => Some(&self.display_off),
            PowerAction::Unrecognized(_) => None,
        }
    }
}

/// Runs an external command per power action
#[derive(Debug, Default)]
pub struct CommandPowerManager {
    config: CommandPowerConfig,
}

impl CommandPowerManager {
    /// Create a manager with the default command set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Component for CommandPowerManager {
    fn name(&self) -> &str {
        "command"
    }

    async fn init(&mut self, config: &serde_json::Value) -> Result<(), CapabilityError> {
        let config: CommandPowerConfig = decode_config(config)?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl PowerManager for CommandPowerManager {
    async fn do_power_action(&self, event: &PowerEvent) -> Result<(), CapabilityError> {
        let Some(command) = self.config.command_for(&event.action) else {
            warn!(action = %event.action, "Unrecognized power action");
            return Err(CapabilityError::Rejected(format!(
                "command '{}' is not a known power action",
                event.action
            )));
        };
        let Some((program, args)) = command.split_first() else {
            return Err(CapabilityError::Unavailable(format!(
                "no command configured for '{}'",
                event.action
            )));
        };

        info!(action = %event.action, program = %program, "Performing power action");
        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|e| CapabilityError::io(format!("failed to run {program}"), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(CapabilityError::CommandFailed {
                command: program.clone(),
                status: status.to_string(),
            })
        }
    }
}
