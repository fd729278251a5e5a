//! Frontend Composite
//!
//! A frontend bundles at most one implementation of each capability. It is
//! built and initialized once at startup, then shared read-only with every
//! request handler.
//!
//! # Lifecycle
//!
//! ```text
//! from_config ──▶ init (&mut self) ──▶ Arc<Frontend> ──▶ dispatch … ──▶ cleanup
//!                 fixed order,                              attempts every
//!                 stops at first error                      slot, aggregates
//! ```

use std::fmt;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::capabilities::registry::{self, UnknownImplementation};
use crate::capabilities::{
    Alerter, AudioPlayer, CapabilityError, ComponentKind, DisplayManager,
    LogAlerter, LogAudioPlayer, LogDisplayManager, LogPowerManager, PowerManager,
};
use crate::config::FrontendConfig;
use crate::events::{AlertEvent, BrightnessEvent, PowerEvent, SoundEvent};

// =============================================================================
// Errors
// =============================================================================

/// One component's failure during cleanup
#[derive(Debug)]
pub struct ComponentFailure {
    /// Slot of the failed component
    pub component: ComponentKind,
    /// What went wrong
    pub source: CapabilityError,
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.source)
    }
}

/// Failure of a frontend operation, tagged with the component involved
#[derive(Debug, Error)]
pub enum FrontendError {
    /// A slot names an implementation that does not exist
    #[error(transparent)]
    UnknownImplementation(#[from] UnknownImplementation),

    /// A component failed to initialize
    #[error("failed to initialize {component}: {source}")]
    Init {
        /// Slot of the failed component
        component: ComponentKind,
        /// What went wrong
        source: CapabilityError,
    },

    /// A capability call failed
    #[error("{component} failed: {source}")]
    Capability {
        /// Slot of the failed component
        component: ComponentKind,
        /// What went wrong
        source: CapabilityError,
    },

    /// One or more components failed to clean up
    #[error("failed to clean up {}", describe_failures(.0))]
    Cleanup(Vec<ComponentFailure>),
}

fn describe_failures(failures: &[ComponentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FrontendError {
    /// Component the error is attributed to, if exactly one
    #[must_use]
    pub fn component(&self) -> Option<ComponentKind> {
        match self {
            Self::UnknownImplementation(e) => Some(e.component),
            Self::Init { component, .. } | Self::Capability { component, .. } => Some(*component),
            Self::Cleanup(_) => None,
        }
    }
}

// =============================================================================
// Frontend
// =============================================================================

/// The set of capabilities available to the server
#[derive(Default)]
pub struct Frontend {
    /// Alerter slot
    pub alerter: Option<Box<dyn Alerter>>,
    /// Audio player slot
    pub audio_player: Option<Box<dyn AudioPlayer>>,
    /// Power manager slot
    pub power_manager: Option<Box<dyn PowerManager>>,
    /// Display manager slot
    pub display_manager: Option<Box<dyn DisplayManager>>,
}

impl fmt::Debug for Frontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frontend")
            .field("alerter", &self.alerter.as_ref().map(|c| c.name().to_string()))
            .field("audio_player", &self.audio_player.as_ref().map(|c| c.name().to_string()))
            .field("power_manager", &self.power_manager.as_ref().map(|c| c.name().to_string()))
            .field(
                "display_manager",
                &self.display_manager.as_ref().map(|c| c.name().to_string()),
            )
            .finish()
    }
}

impl Frontend {
    /// Create a frontend with every slot empty
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log-only implementations in every slot
    #[must_use]
    pub fn console() -> Self {
        Self {
            alerter: Some(Box::new(LogAlerter)),
            audio_player: Some(Box::new(LogAudioPlayer)),
            power_manager: Some(Box::new(LogPowerManager)),
            display_manager: Some(Box::new(LogDisplayManager)),
        }
    }

    /// Build uninitialized components for every configured slot
    pub fn from_config(config: &FrontendConfig) -> Result<Self, FrontendError> {
        Ok(Self {
            alerter: config
                .alerter
                .as_ref()
                .map(|slot| registry::build_alerter(&slot.kind))
                .transpose()?,
            audio_player: config
                .audio_player
                .as_ref()
                .map(|slot| registry::build_audio_player(&slot.kind))
                .transpose()?,
            power_manager: config
                .power_manager
                .as_ref()
                .map(|slot| registry::build_power_manager(&slot.kind))
                .transpose()?,
            display_manager: config
                .display_manager
                .as_ref()
                .map(|slot| registry::build_display_manager(&slot.kind))
                .transpose()?,
        })
    }

    /// Set the alerter
    #[must_use]
    pub fn with_alerter(mut self, alerter: impl Alerter + 'static) -> Self {
        self.alerter = Some(Box::new(alerter));
        self
    }

    /// Set the audio player
    #[must_use]
    pub fn with_audio_player(mut self, player: impl AudioPlayer + 'static) -> Self {
        self.audio_player = Some(Box::new(player));
        self
    }

    /// Set the power manager
    #[must_use]
    pub fn with_power_manager(mut self, manager: impl PowerManager + 'static) -> Self {
        self.power_manager = Some(Box::new(manager));
        self
    }

    /// Set the display manager
    #[must_use]
    pub fn with_display_manager(mut self, manager: impl DisplayManager + 'static) -> Self {
        self.display_manager = Some(Box::new(manager));
        self
    }

    /// Implementation names of the present components, in slot order
    #[must_use]
    pub fn implementations(&self) -> Vec<(ComponentKind, &str)> {
        let mut present = Vec::with_capacity(4);
        if let Some(c) = &self.alerter {
            present.push((ComponentKind::Alerter, c.name()));
        }
        if let Some(c) = &self.audio_player {
            present.push((ComponentKind::AudioPlayer, c.name()));
        }
        if let Some(c) = &self.power_manager {
            present.push((ComponentKind::PowerManager, c.name()));
        }
        if let Some(c) = &self.display_manager {
            present.push((ComponentKind::DisplayManager, c.name()));
        }
        present
    }

    /// Initialize every present component in slot order
    ///
    /// Stops at the first failure. Components initialized before the
    /// failure are left running; callers treat this error as fatal.
    pub async fn init(&mut self, config: &FrontendConfig) -> Result<(), FrontendError> {
        let wrap = |component: ComponentKind| {
            move |source: CapabilityError| FrontendError::Init { component, source }
        };

        if let Some(c) = self.alerter.as_mut() {
            c.init(config.fragment(ComponentKind::Alerter))
                .await
                .map_err(wrap(ComponentKind::Alerter))?;
        }
        if let Some(c) = self.audio_player.as_mut() {
            c.init(config.fragment(ComponentKind::AudioPlayer))
                .await
                .map_err(wrap(ComponentKind::AudioPlayer))?;
        }
        if let Some(c) = self.power_manager.as_mut() {
            c.init(config.fragment(ComponentKind::PowerManager))
                .await
                .map_err(wrap(ComponentKind::PowerManager))?;
        }
        if let Some(c) = self.display_manager.as_mut() {
            c.init(config.fragment(ComponentKind::DisplayManager))
                .await
                .map_err(wrap(ComponentKind::DisplayManager))?;
        }

        for (kind, name) in self.implementations() {
            info!(component = %kind, implementation = name, "Component initialized");
        }
        Ok(())
    }

    /// Clean up every present component
    ///
    /// A failing component does not stop the others from being cleaned up;
    /// all failures are reported together.
    pub async fn cleanup(&self) -> Result<(), FrontendError> {
        let mut failures = Vec::new();

        if let Some(c) = &self.alerter {
            record_cleanup(ComponentKind::Alerter, c.cleanup().await, &mut failures);
        }
        if let Some(c) = &self.audio_player {
            record_cleanup(ComponentKind::AudioPlayer, c.cleanup().await, &mut failures);
        }
        if let Some(c) = &self.power_manager {
            record_cleanup(ComponentKind::PowerManager, c.cleanup().await, &mut failures);
        }
        if let Some(c) = &self.display_manager {
            record_cleanup(ComponentKind::DisplayManager, c.cleanup().await, &mut failures);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FrontendError::Cleanup(failures))
        }
    }

    /// Present an alert; a no-op without an alerter
    pub async fn show_alert(&self, event: &AlertEvent) -> Result<(), FrontendError> {
        let Some(alerter) = &self.alerter else {
            debug!("No alerter configured; dropping alert");
            return Ok(());
        };
        alerter
            .show_alert(event)
            .await
            .map_err(|source| FrontendError::Capability {
                component: ComponentKind::Alerter,
                source,
            })
    }

    /// Play a sound; a no-op without an audio player
    pub async fn play_sound(&self, event: &SoundEvent) -> Result<(), FrontendError> {
        let Some(player) = &self.audio_player else {
            debug!("No audio player configured; dropping sound");
            return Ok(());
        };
        player
            .play_sound(event)
            .await
            .map_err(|source| FrontendError::Capability {
                component: ComponentKind::AudioPlayer,
                source,
            })
    }

    /// Perform a power action; a no-op without a power manager
    pub async fn do_power_action(&self, event: &PowerEvent) -> Result<(), FrontendError> {
        let Some(manager) = &self.power_manager else {
            debug!("No power manager configured; dropping power action");
            return Ok(());
        };
        manager
            .do_power_action(event)
            .await
            .map_err(|source| FrontendError::Capability {
                component: ComponentKind::PowerManager,
                source,
            })
    }

    /// Change brightness; a no-op without a display manager
    pub async fn set_brightness(&self, event: &BrightnessEvent) -> Result<(), FrontendError> {
        let Some(manager) = &self.display_manager else {
            debug!("No display manager configured; dropping brightness change");
            return Ok(());
        };
        manager
            .set_brightness(event)
            .await
            .map_err(|source| FrontendError::Capability {
                component: ComponentKind::DisplayManager,
                source,
            })
    }
}

fn record_cleanup(
    component: ComponentKind,
    result: Result<(), CapabilityError>,
    failures: &mut Vec<ComponentFailure>,
) {
    match result {
        Ok(()) => debug!(%component, "Component cleaned up"),
        Err(source) => {
            error!(%component, error = %source, "Component cleanup failed");
            failures.push(ComponentFailure { component, source });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Component;
    use crate::config::ComponentConfig;
    use crate::events::PowerAction;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    /// Component that logs its `init` calls and can refuse to start
    struct Recording {
        slot: &'static str,
        inits: Arc<Mutex<Vec<&'static str>>>,
        fail_init: bool,
    }

    #[async_trait]
    impl Component for Recording {
        fn name(&self) -> &str {
            self.slot
        }

        async fn init(&mut self, _config: &serde_json::Value) -> Result<(), CapabilityError> {
            self.inits.lock().push(self.slot);
            if self.fail_init {
                return Err(CapabilityError::Unavailable(self.slot.to_string()));
            }
            Ok(())
        }

        async fn cleanup(&self) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Alerter for Recording {
        async fn show_alert(&self, _event: &AlertEvent) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    #[async_trait]
    impl AudioPlayer for Recording {
        async fn play_sound(&self, _event: &SoundEvent) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    #[async_trait]
    impl PowerManager for Recording {
        async fn do_power_action(&self, _event: &PowerEvent) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    #[async_trait]
    impl DisplayManager for Recording {
        async fn set_brightness(&self, _event: &BrightnessEvent) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    /// Fully populated frontend whose `failing` slot refuses to initialize
    fn recording_frontend(failing: &str) -> (Frontend, Arc<Mutex<Vec<&'static str>>>) {
        let inits = Arc::new(Mutex::new(Vec::new()));
        let slot = |name: &'static str| Recording {
            slot: name,
            inits: Arc::clone(&inits),
            fail_init: name == failing,
        };
        let frontend = Frontend::new()
            .with_alerter(slot("alerter"))
            .with_audio_player(slot("audio_player"))
            .with_power_manager(slot("power_manager"))
            .with_display_manager(slot("display_manager"));
        (frontend, inits)
    }

    #[tokio::test]
    async fn test_empty_frontend_accepts_everything() {
        let frontend = Frontend::new();
        assert_ok!(frontend.show_alert(&AlertEvent::new("hi")).await);
        assert_ok!(frontend.play_sound(&SoundEvent::new("chime")).await);
        assert_ok!(
            frontend
                .do_power_action(&PowerEvent {
                    action: PowerAction::Unrecognized("hibernate".to_string()),
                })
                .await
        );
        assert_ok!(frontend.set_brightness(&BrightnessEvent { level: 0 }).await);
        assert_ok!(frontend.cleanup().await);
    }

    #[tokio::test]
    async fn test_capability_errors_carry_component() {
        let frontend = Frontend::console();
        let err = assert_err!(
            frontend
                .do_power_action(&PowerEvent {
                    action: PowerAction::Unrecognized("hibernate".to_string()),
                })
                .await
        );
        assert_eq!(err.component(), Some(ComponentKind::PowerManager));
    }

    #[test]
    fn test_from_config_rejects_unknown_kind() {
        let config = FrontendConfig {
            display_manager: Some(ComponentConfig::named("hdmi")),
            ..FrontendConfig::default()
        };
        let err = Frontend::from_config(&config).unwrap_err();
        assert_eq!(err.component(), Some(ComponentKind::DisplayManager));
    }

    #[tokio::test]
    async fn test_init_failure_names_component() {
        let config = FrontendConfig {
            audio_player: Some(
                ComponentConfig::named("library")
                    .with_config(serde_json::json!({"library_path": "/definitely/not/here"})),
            ),
            ..FrontendConfig::console()
        };
        let mut frontend = Frontend::from_config(&config).unwrap();
        let err = frontend.init(&config).await.unwrap_err();
        assert!(matches!(
            err,
            FrontendError::Init {
                component: ComponentKind::AudioPlayer,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_init_runs_in_slot_order() {
        let (mut frontend, inits) = recording_frontend("none");
        assert_ok!(frontend.init(&FrontendConfig::default()).await);
        assert_eq!(
            *inits.lock(),
            vec!["alerter", "audio_player", "power_manager", "display_manager"]
        );
    }

    #[tokio::test]
    async fn test_init_stops_at_first_failure() {
        let (mut frontend, inits) = recording_frontend("alerter");
        let err = assert_err!(frontend.init(&FrontendConfig::default()).await);
        assert_eq!(err.component(), Some(ComponentKind::Alerter));
        assert_eq!(*inits.lock(), vec!["alerter"]);

        let (mut frontend, inits) = recording_frontend("audio_player");
        let err = assert_err!(frontend.init(&FrontendConfig::default()).await);
        assert_eq!(err.component(), Some(ComponentKind::AudioPlayer));
        assert_eq!(*inits.lock(), vec!["alerter", "audio_player"]);
    }
}
