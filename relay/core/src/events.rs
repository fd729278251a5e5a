//! Panel Events
//!
//! The four event kinds a panel accepts. Each is decoded from a strict JSON
//! body: unknown fields are rejected, and required fields must be present.
//!
//! # Wire Formats
//!
//! ```text
//! POST /alert       {"message": "...", "timeout": 1000, "perpetual": false, "icon": "...", "sound": "..."}
//! POST /sound       {"sound": "chime"}
//! POST /power       {"action": "shutdown" | "reboot" | "displayOff"}
//! POST /brightness  {"level": 0..=255}
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Alert
// =============================================================================

/// A request to present an alert to the user.
///
/// `timeout` is decoded from integer milliseconds. A zero or negative value
/// decodes to [`Duration::ZERO`], which the alert manager replaces with its
/// configured default. When `perpetual` is set the timeout is ignored.
///
/// Every field except `message` may be `null`, which reads the same as
/// leaving it out.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertEvent {
    /// Text content of the alert
    pub message: String,
    /// Time until the alert dismisses itself
    #[serde(default, deserialize_with = "timeout_from_millis")]
    pub timeout: Duration,
    /// Whether the alert stays until dismissed
    #[serde(default, deserialize_with = "null_as_default")]
    pub perpetual: bool,
    /// Icon identifier; empty selects the configured default
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
    /// Sound to play before the alert is presented
    #[serde(default, deserialize_with = "sound_from_name")]
    pub sound: SoundEvent,
}

impl AlertEvent {
    /// Create an alert with the given message and no other options set
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: Duration::ZERO,
            perpetual: false,
            icon: String::new(),
            sound: SoundEvent::none(),
        }
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mark the alert as perpetual
    #[must_use]
    pub fn perpetual(mut self) -> Self {
        self.perpetual = true;
        self
    }

    /// Set the icon identifier
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Set the sound to play alongside the alert
    #[must_use]
    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = SoundEvent::new(sound);
        self
    }
}

fn timeout_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = Option::<i64>::deserialize(deserializer)?.unwrap_or(0);
    Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
}

fn sound_from_name<'de, D>(deserializer: D) -> Result<SoundEvent, D::Error>
where
    D: Deserializer<'de>,
{
    null_as_default::<D, String>(deserializer).map(SoundEvent::new)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Sound
// =============================================================================

/// A request to play a named sound.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoundEvent {
    /// Sound identifier; empty means "no sound"
    pub sound: String,
}

impl SoundEvent {
    /// Create a sound event
    pub fn new(sound: impl Into<String>) -> Self {
        Self {
            sound: sound.into(),
        }
    }

    /// The empty sound event
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this event asks for no sound at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sound.is_empty()
    }
}

// =============================================================================
// Power
// =============================================================================

/// A system power action.
///
/// Any string decodes; strings outside the known set become
/// [`PowerAction::Unrecognized`] and are rejected by the power manager rather
/// than by the decoder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PowerAction {
    /// Shut the system down
    Shutdown,
    /// Reboot the system
    Reboot,
    /// Blank the display
    DisplayOff,
    /// An action the panel does not know about
    Unrecognized(String),
}

impl PowerAction {
    /// Wire name of this action
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Reboot => "reboot",
            Self::DisplayOff => "displayOff",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<String> for PowerAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "shutdown" => Self::Shutdown,
            "reboot" => Self::Reboot,
            "displayOff" => Self::DisplayOff,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<PowerAction> for String {
    fn from(action: PowerAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to perform a system power action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PowerEvent {
    /// The action to perform
    pub action: PowerAction,
}

// =============================================================================
// Brightness
// =============================================================================

/// A request to change the panel brightness.
///
/// `level` is a `u8`, so values outside `[0, 255]` fail to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrightnessEvent {
    /// Target brightness level
    pub level: u8,
}
