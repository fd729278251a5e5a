//! Sound Library Player
//!
//! Plays WAV clips from a configured library directory. Sound events name a
//! clip without its extension; `chime` resolves to `<library>/chime.wav`.
//! Decoding and output are delegated to an external player command
//! (`aplay -q` by default), and the request waits for playback to finish.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use super::{decode_config, AudioPlayer, CapabilityError, Component};
use crate::events::SoundEvent;

const CLIP_EXTENSION: &str = "wav";

fn default_player() -> Vec<String> {
    vec!["aplay".to_string(), "-q".to_string()]
}

/// Configuration for [`LibraryPlayer`]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryPlayerConfig {
    /// Directory holding the audio clips
    pub library_path: PathBuf,
    /// Player program and leading arguments; the clip path is appended
    #[serde(default = "default_player")]
    pub player: Vec<String>,
}

/// Reject sound names that could escape the library directory.
///
/// Names may not contain path separators or any period, which rules out
/// parent-directory tokens and caller-supplied extensions alike.
pub fn validate_sound_name(name: &str) -> Result<(), CapabilityError> {
    if name.is_empty() {
        return Err(CapabilityError::Rejected("sound name is empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(CapabilityError::Rejected(format!(
            "illegal sound name '{name}' contains a path separator"
        )));
    }
    if name.contains('.') {
        return Err(CapabilityError::Rejected(format!(
            "illegal sound name '{name}' contains periods"
        )));
    }
    Ok(())
}

/// Plays clips from a sound library directory
#[derive(Debug, Default)]
pub struct LibraryPlayer {
    config: Option<LibraryPlayerConfig>,
}

impl LibraryPlayer {
    /// Create an uninitialized player
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a validated sound name to its clip path
    fn clip_path(library: &Path, name: &str) -> PathBuf {
        library.join(format!("{name}.{CLIP_EXTENSION}"))
    }
}

#[async_trait]
impl Component for LibraryPlayer {
    fn name(&self) -> &str {
        "library"
    }

    async fn init(&mut self, config: &serde_json::Value) -> Result<(), CapabilityError> {
        let config: LibraryPlayerConfig = decode_config(config)?;

        if config.library_path.as_os_str().is_empty() {
            return Err(CapabilityError::InvalidConfig(
                "must define an audio library path".to_string(),
            ));
        }
        if config.player.is_empty() {
            return Err(CapabilityError::InvalidConfig(
                "player command cannot be empty".to_string(),
            ));
        }

        let metadata = tokio::fs::metadata(&config.library_path)
            .await
            .map_err(|e| {
                CapabilityError::io(
                    format!("cannot open library {}", config.library_path.display()),
                    e,
                )
            })?;
        if !metadata.is_dir() {
            return Err(CapabilityError::InvalidConfig(format!(
                "library path {} is not a directory",
                config.library_path.display()
            )));
        }

        info!(library = ?config.library_path, "Sound library ready");
        self.config = Some(config);
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

#[async_trait]
impl AudioPlayer for LibraryPlayer {
    async fn play_sound(&self, event: &SoundEvent) -> Result<(), CapabilityError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| CapabilityError::Unavailable("player not initialized".to_string()))?;

        validate_sound_name(&event.sound)?;

        let path = Self::clip_path(&config.library_path, &event.sound);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(CapabilityError::Rejected(format!(
                "no clip named '{}' in the library",
                event.sound
            )));
        }

        let (program, args) = config
            .player
            .split_first()
            .ok_or_else(|| CapabilityError::Unavailable("player command missing".to_string()))?;

        debug!(path = ?path, "Playing sound");
        let status = Command::new(program)
            .args(args)
            .arg(&path)
            .status()
            .await
            .map_err(|e| CapabilityError::io(format!("failed to run {program}"), e))?;

        if !status.success() {
            return Err(CapabilityError::CommandFailed {
                command: program.clone(),
                status: status.to_string(),
            });
        }

        info!(sound = %event.sound, "Played sound");
        Ok(())
    }
}
