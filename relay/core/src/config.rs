//! Configuration File Support
//!
//! Loads the relay configuration from a TOML or JSON file, by default
//! `$XDG_CONFIG_HOME/panel-relay/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the daemon)
//! 2. Environment variables (`PANEL_RELAY_PORT`)
//! 3. Configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! port = 1035
//! shutdown_timeout_ms = 5000
//!
//! [frontend.alerter]
//! kind = "window+speech"
//! config = { no_tts_prefix = "[quiet]", speech = { language = "en" } }
//!
//! [frontend.audio_player]
//! kind = "library"
//! config = { library_path = "/usr/share/panel-relay/sounds" }
//!
//! [frontend.power_manager]
//! kind = "command"
//!
//! [frontend.display_manager]
//! kind = "backlight"
//! ```
//!
//! Each slot's `config` table is handed to the chosen implementation
//! untouched. A `[frontend]` section that omits a slot leaves that
//! capability unavailable; omitting `[frontend]` entirely selects the
//! log-only console frontend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::registry;
use crate::capabilities::ComponentKind;

/// Port used when neither the file nor the environment sets one
pub const DEFAULT_PORT: u16 = 1035;

/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "PANEL_RELAY_PORT";

/// Default time allowed for in-flight requests at shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse JSON
    #[error("Failed to parse JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// An environment variable holds an unusable value
    #[error("Invalid value {value:?} for {var}")]
    EnvError {
        /// Variable name
        var: &'static str,
        /// The rejected value
        value: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// File Structures
// =============================================================================

/// Server section of the configuration file
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerFile {
    /// Listen port
    pub port: Option<u16>,
    /// Shutdown drain deadline in milliseconds
    pub shutdown_timeout_ms: Option<u64>,
}

/// Implementation choice for one capability slot
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    /// Implementation name (see [`registry`])
    pub kind: String,
    /// Opaque configuration passed to the implementation's `init`
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ComponentConfig {
    /// Select an implementation with no configuration
    pub fn named(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: serde_json::Value::Null,
        }
    }

    /// Attach a configuration fragment
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

/// Capability selection for the frontend
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendConfig {
    /// Alerter slot
    pub alerter: Option<ComponentConfig>,
    /// Audio player slot
    pub audio_player: Option<ComponentConfig>,
    /// Power manager slot
    pub power_manager: Option<ComponentConfig>,
    /// Display manager slot
    pub display_manager: Option<ComponentConfig>,
}

impl FrontendConfig {
    /// Log-only implementations in every slot
    #[must_use]
    pub fn console() -> Self {
        Self {
            alerter: Some(ComponentConfig::named("log")),
            audio_player: Some(ComponentConfig::named("log")),
            power_manager: Some(ComponentConfig::named("log")),
            display_manager: Some(ComponentConfig::named("log")),
        }
    }

    /// Configuration for one slot
    #[must_use]
    pub fn slot(&self, kind: ComponentKind) -> Option<&ComponentConfig> {
        match kind {
            ComponentKind::Alerter => self.alerter.as_ref(),
            ComponentKind::AudioPlayer => self.audio_player.as_ref(),
            ComponentKind::PowerManager => self.power_manager.as_ref(),
            ComponentKind::DisplayManager => self.display_manager.as_ref(),
        }
    }

    /// Opaque configuration fragment for a slot, `Null` if unset
    #[must_use]
    pub fn fragment(&self, kind: ComponentKind) -> &serde_json::Value {
        static NULL: serde_json::Value = serde_json::Value::Null;
        self.slot(kind).map_or(&NULL, |slot| &slot.config)
    }

    /// Check every configured slot names a known implementation
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ComponentKind::ALL {
            let Some(slot) = self.slot(kind) else {
                continue;
            };
            let accepted = registry::kinds_for(kind);
            if !accepted.contains(&slot.kind.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown {kind} implementation '{}' (expected one of: {})",
                    slot.kind,
                    accepted.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Top-level configuration file structure
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayFile {
    /// Server section
    pub server: ServerFile,
    /// Frontend section; absent selects the console frontend
    pub frontend: Option<FrontendConfig>,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// HTTP server settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen port; 0 picks a free port
    pub port: u16,
    /// Time allowed for in-flight requests at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Fully resolved relay configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Server settings
    pub server: ServerConfig,
    /// Capability selection
    pub frontend: FrontendConfig,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            frontend: FrontendConfig::console(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl RelayConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Override the port from a command-line flag
    pub fn apply_cli_port(&mut self, port: u16) {
        self.server.port = port;
        self.source = ConfigSource::Cli;
    }

    /// Swap in the log-only frontend from a command-line flag
    pub fn apply_cli_console(&mut self) {
        self.frontend = FrontendConfig::console();
        self.source = ConfigSource::Cli;
    }

    /// Override the port from a raw environment value
    pub fn apply_port_override(&mut self, raw: &str) -> Result<(), ConfigError> {
        let port = raw.trim().parse::<u16>().map_err(|_| ConfigError::EnvError {
            var: PORT_ENV,
            value: raw.to_string(),
        })?;
        self.server.port = port;
        self.source = ConfigSource::Env;
        Ok(())
    }

    fn apply_file(&mut self, file: RelayFile) {
        if let Some(port) = file.server.port {
            self.server.port = port;
        }
        if let Some(ms) = file.server.shutdown_timeout_ms {
            self.server.shutdown_timeout = Duration::from_millis(ms);
        }
        if let Some(frontend) = file.frontend {
            self.frontend = frontend;
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/panel-relay/config.toml` or
/// `~/.config/panel-relay/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("panel-relay").join("config.toml"))
}

/// Parse configuration text, choosing the format from the file extension
pub fn parse_config(path: &Path, content: &str) -> Result<RelayFile, ConfigError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(toml::from_str(content)?)
    }
}

/// Load configuration from the default location
///
/// A missing default file is not an error (defaults are used).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed, or if
/// `PANEL_RELAY_PORT` is not a valid port.
pub fn load_config() -> Result<RelayConfig, ConfigError> {
    let mut config = match default_config_path() {
        Some(path) if path.exists() => load_file(&path)?,
        Some(path) => {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            RelayConfig::default()
        }
        None => RelayConfig::default(),
    };
    apply_env_config(&mut config)?;
    Ok(config)
}

/// Load configuration from an explicitly named file
///
/// # Errors
///
/// Unlike [`load_config`], a missing file is an error.
pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    let mut config = load_file(path)?;
    apply_env_config(&mut config)?;
    Ok(config)
}

fn load_file(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let file = parse_config(path, &content)?;
    let mut config = RelayConfig::default();
    config.apply_file(file);
    config.frontend.validate()?;
    config.config_file_path = Some(path.to_path_buf());
    config.source = ConfigSource::File;

    tracing::info!(path = %path.display(), "Loaded configuration from file");
    Ok(config)
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut RelayConfig) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(PORT_ENV) {
        config.apply_port_override(&raw)?;
    }
    Ok(())
}
