//! Panel Core - Event Model and Output Capabilities for panel-relay
//!
//! This crate holds everything behind the HTTP surface of panel-relay: the
//! panel events, the capability traits a frontend is composed of, the
//! implementations that ship with the relay, and the alert lifecycle
//! manager that drives alert windows from a dedicated UI thread.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     HTTP server (panel-daemon)                   │
//! │      /alert         /sound         /power        /brightness     │
//! └────────┬──────────────┬──────────────┬──────────────┬────────────┘
//!          │              │              │              │
//! ┌────────┴──────────────┴──────────────┴──────────────┴────────────┐
//! │                         Frontend                                  │
//! │  ┌───────────┐  ┌─────────────┐  ┌──────────────┐  ┌───────────┐ │
//! │  │  Alerter  │  │ AudioPlayer │  │ PowerManager │  │  Display  │ │
//! │  │           │  │             │  │              │  │  Manager  │ │
//! │  └─────┬─────┘  └─────────────┘  └──────────────┘  └───────────┘ │
//! └────────┼─────────────────────────────────────────────────────────┘
//!          │ idle callbacks
//! ┌────────┴─────────────────────┐
//! │ AlertManager ──▶ UI thread   │──▶ Renderer
//! └──────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Frontend`]: One optional implementation per capability
//! - [`AlertManager`]: Window lifecycle and the UI event loop
//! - [`AlertEvent`], [`SoundEvent`], [`PowerEvent`], [`BrightnessEvent`]:
//!   decoded request bodies
//! - [`RelayConfig`]: Resolved configuration
//!
//! # Module Overview
//!
//! - [`alert`]: Alert windows, the UI loop and the renderer boundary
//! - [`capabilities`]: Capability traits, implementations and the registry
//! - [`config`]: Configuration file loading
//! - [`events`]: Panel event types
//! - [`frontend`]: The capability composite

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alert;
pub mod capabilities;
pub mod config;
pub mod events;
pub mod frontend;

// Re-exports for convenience
pub use alert::{
    AlertError, AlertId, AlertManager, AlertManagerConfig, AlertPolicy, AlertWindow, Countdown,
    InactiveReason, LogRenderer, RenderError, Renderer, WindowSpec, WindowState, WindowStyle,
};
pub use capabilities::{
    Alerter, AudioPlayer, CapabilityError, Component, ComponentKind, DisplayManager, PowerManager,
};
pub use events::{AlertEvent, BrightnessEvent, PowerAction, PowerEvent, SoundEvent};
pub use frontend::{ComponentFailure, Frontend, FrontendError};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ComponentConfig, ConfigError,
    ConfigSource, FrontendConfig, RelayConfig, ServerConfig,
};
