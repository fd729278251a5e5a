//! Speech Alerter
//!
//! Reads alert messages out loud through an external text-to-speech
//! command. Speech runs as a detached background task: the alert request
//! returns as soon as the task is spawned, and any failure is only visible
//! in the log.
//!
//! At most `max_concurrent` speech processes run at once. A message that
//! arrives while every slot is taken is shown but not read out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn, Instrument};

use super::{decode_config, Alerter, CapabilityError, Component};
use crate::events::AlertEvent;

const LANGUAGE_PLACEHOLDER: &str = "{language}";
const MESSAGE_PLACEHOLDER: &str = "{message}";

fn default_command() -> Vec<String> {
    ["espeak-ng", "-v", LANGUAGE_PLACEHOLDER, MESSAGE_PLACEHOLDER]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_concurrent() -> usize {
    2
}

/// Configuration for [`SpeechAlerter`]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechConfig {
    /// Speech command line. `{language}` and `{message}` are substituted;
    /// without a `{message}` placeholder the message is appended.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    /// Voice language passed to the command
    #[serde(default = "default_language")]
    pub language: String,
    /// Messages starting with this prefix are not read out loud
    #[serde(default)]
    pub no_tts_prefix: Option<String>,
    /// Speech processes allowed to run at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            language: default_language(),
            no_tts_prefix: None,
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl SpeechConfig {
    /// Build the argument vector for a message
    fn render(&self, message: &str) -> Vec<String> {
        let mut saw_message = false;
        let mut argv: Vec<String> = self
            .command
            .iter()
            .map(|part| {
                if part.contains(MESSAGE_PLACEHOLDER) {
                    saw_message = true;
                }
                part.replace(LANGUAGE_PLACEHOLDER, &self.language)
                    .replace(MESSAGE_PLACEHOLDER, message)
            })
            .collect();
        if !saw_message {
            argv.push(message.to_string());
        }
        argv
    }

    /// Whether this message opted out of speech
    fn is_silenced(&self, message: &str) -> bool {
        self.no_tts_prefix
            .as_deref()
            .is_some_and(|prefix| !prefix.is_empty() && message.starts_with(prefix))
    }
}

/// Reads alerts aloud via text-to-speech
#[derive(Debug)]
pub struct SpeechAlerter {
    config: SpeechConfig,
    slots: Arc<Semaphore>,
}

impl Default for SpeechAlerter {
    fn default() -> Self {
        let config = SpeechConfig::default();
        let slots = Arc::new(Semaphore::new(config.max_concurrent));
        Self { config, slots }
    }
}

impl SpeechAlerter {
    /// Create an alerter with the default speech command
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn speech for a message without waiting for it to finish
    ///
    /// Returns `false` when every speech slot is busy and the message was
    /// skipped.
    pub(crate) fn speak_detached(&self, message: &str) -> bool {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            warn!(
                max_concurrent = self.config.max_concurrent,
                "Speech slots busy; skipping read-out"
            );
            return false;
        };
        let argv = self.config.render(message);
        let span = tracing::info_span!("speech");

        tokio::spawn(
            async move {
                let _permit = permit;
                let Some((program, args)) = argv.split_first() else {
                    return;
                };
                match Command::new(program).args(args).status().await {
                    Ok(status) if status.success() => {
                        info!("Alert message read out loud to user");
                    }
                    Ok(status) => {
                        warn!(program = %program, %status, "Speech command failed");
                    }
                    Err(e) => {
                        warn!(program = %program, error = %e, "Problem reading alert message");
                    }
                }
            }
            .instrument(span),
        );
        true
    }
}

#[async_trait]
impl Component for SpeechAlerter {
    fn name(&self) -> &str {
        "speech"
    }

    async fn init(&mut self, config: &serde_json::Value) -> Result<(), CapabilityError> {
        let config: SpeechConfig = decode_config(config)?;
        if config.command.first().map_or(true, String::is_empty) {
            return Err(CapabilityError::InvalidConfig(
                "speech command cannot be empty".to_string(),
            ));
        }
        if config.language.is_empty() {
            return Err(CapabilityError::InvalidConfig(
                "language cannot be empty".to_string(),
            ));
        }
        if config.max_concurrent == 0 {
            return Err(CapabilityError::InvalidConfig(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        self.slots = Arc::new(Semaphore::new(config.max_concurrent));
        self.config = config;
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl Alerter for SpeechAlerter {
    async fn show_alert(&self, event: &AlertEvent) -> Result<(), CapabilityError> {
        if self.config.is_silenced(&event.message) {
            debug!("Message carries the no-TTS prefix; skipping read-out");
            return Ok(());
        }
        self.speak_detached(&event.message);
        Ok(())
    }
}
