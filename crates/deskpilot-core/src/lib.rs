//! # Deskpilot Core
//!
//! Request orchestration and command execution.
//!
//! ## Architecture
//!
//! ```text
//! caller ──Request──▶ dispatcher ──▶ worker ──▶ TaskOrchestrator
//!   ▲                    │ (Stop)                 │
//!   │                    ▼                        ├─ ScreenCapture
//!   │              stop flag ◀─── checked ────────┤
//!   │                                             ├─ ModelGateway
//!   │                                             ├─ validate()
//!   │                                             └─ ActionExecutor
//!   └────────────── status lines (bounded, lossy) ◀┘
//! ```

pub mod channel;
pub mod config;
pub mod executor;
pub mod orchestrator;
pub mod settings;
pub mod validator;

pub use channel::{status_channel, Request, StatusReceiver, StatusSender};
pub use config::{OrchestratorConfig, PilotConfig};
pub use executor::{ActionError, ActionExecutor, InputActionExecutor};
pub use orchestrator::{OrchestratorHandle, TaskOrchestrator};
pub use settings::{KeyboardShortcuts, Settings, SettingsError};
pub use validator::{validate, Action, ValidationError};

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Provider error: {0}")]
    ProviderError(#[from] deskpilot_providers::ProviderError),

    #[error("Settings error: {0}")]
    SettingsError(#[from] SettingsError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Orchestrator is no longer accepting requests")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, CoreError>;
