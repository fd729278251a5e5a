//! Implementation Registry
//!
//! Maps the implementation names used in configuration files to fresh,
//! uninitialized capability instances.
//!
//! | Slot | Names |
//! |---|---|
//! | Alerter | `log`, `window`, `speech`, `window+speech` |
//! | AudioPlayer | `log`, `library` |
//! | PowerManager | `log`, `command` |
//! | DisplayManager | `log`, `backlight` |

use thiserror::Error;

use super::{
    Alerter, AudioPlayer, BacklightDisplayManager, CommandPowerManager, ComponentKind,
    DisplayManager, LibraryPlayer, LogAlerter, LogAudioPlayer, LogDisplayManager,
    LogPowerManager, PowerManager, SpeechAlerter, WindowAlerter, WindowSpeechAlerter,
};

/// Implementation names accepted for the alerter slot
pub const ALERTER_KINDS: &[&str] = &["log", "window", "speech", "window+speech"];
/// Implementation names accepted for the audio player slot
pub const AUDIO_PLAYER_KINDS: &[&str] = &["log", "library"];
/// Implementation names accepted for the power manager slot
pub const POWER_MANAGER_KINDS: &[&str] = &["log", "command"];
/// Implementation names accepted for the display manager slot
pub const DISPLAY_MANAGER_KINDS: &[&str] = &["log", "backlight"];

/// An implementation name that no slot recognizes
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {component} implementation '{name}' (expected one of: {expected})")]
pub struct UnknownImplementation {
    /// Slot the name was configured for
    pub component: ComponentKind,
    /// The unrecognized name
    pub name: String,
    /// Accepted names, comma separated
    pub expected: String,
}

impl UnknownImplementation {
    fn new(component: ComponentKind, name: &str, accepted: &[&str]) -> Self {
        Self {
            component,
            name: name.to_string(),
            expected: accepted.join(", "),
        }
    }
}

/// Accepted names for a slot
#[must_use]
pub fn kinds_for(component: ComponentKind) -> &'static [&'static str] {
    match component {
        ComponentKind::Alerter => ALERTER_KINDS,
        ComponentKind::AudioPlayer => AUDIO_PLAYER_KINDS,
        ComponentKind::PowerManager => POWER_MANAGER_KINDS,
        ComponentKind::DisplayManager => DISPLAY_MANAGER_KINDS,
    }
}

/// Build an alerter by name
pub fn build_alerter(name: &str) -> Result<Box<dyn Alerter>, UnknownImplementation> {
    match name {
        "log" => Ok(Box::new(LogAlerter)),
        "window" => Ok(Box::new(WindowAlerter::headless())),
        "speech" => Ok(Box::new(SpeechAlerter::new())),
        "window+speech" => Ok(Box::new(WindowSpeechAlerter::new(WindowAlerter::headless()))),
        other => Err(UnknownImplementation::new(
            ComponentKind::Alerter,
            other,
            ALERTER_KINDS,
        )),
    }
}

/// Build an audio player by name
pub fn build_audio_player(name: &str) -> Result<Box<dyn AudioPlayer>, UnknownImplementation> {
    match name {
        "log" => Ok(Box::new(LogAudioPlayer)),
        "library" => Ok(Box::new(LibraryPlayer::new())),
        other => Err(UnknownImplementation::new(
            ComponentKind::AudioPlayer,
            other,
            AUDIO_PLAYER_KINDS,
        )),
    }
}

/// Build a power manager by name
pub fn build_power_manager(name: &str) -> Result<Box<dyn PowerManager>, UnknownImplementation> {
    match name {
        "log" => Ok(Box::new(LogPowerManager)),
        "command" => Ok(Box::new(CommandPowerManager::new())),
        other => Err(UnknownImplementation::new(
            ComponentKind::PowerManager,
            other,
            POWER_MANAGER_KINDS,
        )),
    }
}

/// Build a display manager by name
pub fn build_display_manager(
    name: &str,
) -> Result<Box<dyn DisplayManager>, UnknownImplementation> {
    match name {
        "log" => Ok(Box::new(LogDisplayManager)),
        "backlight" => Ok(Box::new(BacklightDisplayManager::new())),
        other => Err(UnknownImplementation::new(
            ComponentKind::DisplayManager,
            other,
            DISPLAY_MANAGER_KINDS,
        )),
    }
}
