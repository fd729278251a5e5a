//! Output Capabilities
//!
//! The four independent output behaviors a panel may support, and the
//! implementations that ship with panel-relay.
//!
//! # Design Philosophy
//!
//! Every capability shares the [`Component`] lifecycle: it receives its own
//! opaque configuration document at `init`, validates it, and releases its
//! resources at `cleanup`. Each capability then adds exactly one action.
//! The dispatch path only sees these traits, so output behavior can be
//! swapped from the configuration file without touching the server.
//!
//! ```text
//!             Component (init / cleanup)
//!                        │
//!      ┌────────────┬────┴───────┬────────────────┐
//!      │            │            │                │
//!   Alerter    AudioPlayer  PowerManager   DisplayManager
//!  show_alert   play_sound  do_power_action set_brightness
//! ```

mod backlight;
mod command_power;
mod console;
mod library;
pub mod registry;
mod speech;
mod window;

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::alert::AlertError;
use crate::events::{AlertEvent, BrightnessEvent, PowerEvent, SoundEvent};

pub use backlight::{BacklightConfig, BacklightDisplayManager};
pub use command_power::{CommandPowerConfig, CommandPowerManager};
pub use console::{LogAlerter, LogAudioPlayer, LogDisplayManager, LogPowerManager};
pub use library::{validate_sound_name, LibraryPlayer, LibraryPlayerConfig};
pub use speech::{SpeechAlerter, SpeechConfig};
pub use window::{
    AlertDefaults, TimeoutRange, WindowAlerter, WindowAlerterConfig, WindowSize,
    WindowSpeechAlerter, WindowSpeechConfig,
};

// =============================================================================
// Errors
// =============================================================================

/// Failure reported by a capability implementation
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The configuration document could not be decoded
    #[error("malformed configuration: {0}")]
    MalformedConfig(#[from] serde_json::Error),

    /// The configuration decoded but holds invalid values
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The event was well-formed but cannot be carried out
    #[error("rejected event: {0}")]
    Rejected(String),

    /// An I/O operation failed
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted
        context: String,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully
    #[error("command `{command}` failed: {status}")]
    CommandFailed {
        /// The program that was run
        command: String,
        /// Exit status description
        status: String,
    },

    /// The capability is not ready to accept work
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The alert manager refused the work
    #[error(transparent)]
    Alert(#[from] AlertError),

    /// One or more parts of a compound capability failed to clean up
    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

impl CapabilityError {
    /// Wrap an IO error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// =============================================================================
// Component Kinds
// =============================================================================

/// The four capability slots of a frontend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Visual (or spoken) alerts
    Alerter,
    /// Sound playback
    AudioPlayer,
    /// System power control
    PowerManager,
    /// Backlight control
    DisplayManager,
}

impl ComponentKind {
    /// All kinds in initialization order
    pub const ALL: [Self; 4] = [
        Self::Alerter,
        Self::AudioPlayer,
        Self::PowerManager,
        Self::DisplayManager,
    ];

    /// Human-readable name
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Alerter => "Alerter",
            Self::AudioPlayer => "AudioPlayer",
            Self::PowerManager => "PowerManager",
            Self::DisplayManager => "DisplayManager",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Lifecycle shared by every capability
#[async_trait]
pub trait Component: Send + Sync {
    /// Implementation name (e.g., "window", "library")
    fn name(&self) -> &str;

    /// Prepare the component for use.
    ///
    /// `config` is the raw configuration fragment for this component,
    /// passed through unmodified from the configuration file. `Null` means
    /// the fragment was omitted.
    async fn init(&mut self, config: &serde_json::Value) -> Result<(), CapabilityError>;

    /// Release everything acquired by `init`
    async fn cleanup(&self) -> Result<(), CapabilityError>;
}

/// Presents alert messages to the user
#[async_trait]
pub trait Alerter: Component {
    /// Present an alert
    async fn show_alert(&self, event: &AlertEvent) -> Result<(), CapabilityError>;
}

/// Plays audio clips stored on the system
#[async_trait]
pub trait AudioPlayer: Component {
    /// Play the requested sound
    async fn play_sound(&self, event: &SoundEvent) -> Result<(), CapabilityError>;
}

/// Controls system power functions
#[async_trait]
pub trait PowerManager: Component {
    /// Perform the requested power action
    async fn do_power_action(&self, event: &PowerEvent) -> Result<(), CapabilityError>;
}

/// Controls properties of the display
#[async_trait]
pub trait DisplayManager: Component {
    /// Change the panel brightness
    async fn set_brightness(&self, event: &BrightnessEvent) -> Result<(), CapabilityError>;
}

/// Decode a component configuration fragment.
///
/// A missing fragment (`Null`) decodes as an empty object, so components
/// whose fields all have defaults need no configuration at all. Unknown
/// fields are rejected by the target types.
pub fn decode_config<T: DeserializeOwned>(config: &serde_json::Value) -> Result<T, CapabilityError> {
    let value = if config.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        config.clone()
    };
    Ok(serde_json::from_value(value)?)
}
