//! # Provider Traits
//!
//! The seams between the orchestrator and the model integrations.

use crate::{InstructionSet, PromptStyle, ProviderId, Result};
use async_trait::async_trait;
use deskpilot_vision::ScreenSnapshot;

/// Result of asking a model for instructions.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome {
    /// Usable instructions (commands, a completion message, or both)
    Success(InstructionSet),
    /// No usable instructions after the retry ceiling
    Empty,
    /// The request cannot succeed with this provider
    Fatal(String),
}

/// A provider as seen by the orchestrator.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Which provider this is.
    fn id(&self) -> ProviderId;

    /// Ask the model for instructions for a goal given the current screen.
    async fn obtain_instructions(&self, goal: &str, snapshot: &ScreenSnapshot) -> GatewayOutcome;

    /// Release per-request resources. Idempotent.
    async fn cleanup(&self);
}

/// Transport to one backing model.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Prompt flavour this model does best with.
    fn prompt_style(&self) -> PromptStyle {
        PromptStyle::Compact
    }

    /// Send the prompt and screenshot, returning the raw model text.
    async fn complete(&self, prompt: &str, snapshot: &ScreenSnapshot) -> Result<String>;

    /// Drop anything held for the last request.
    async fn release(&self) {}
}

/// Single point of provider instantiation.
pub trait GatewayFactory: Send + Sync {
    /// Build a gateway. Fails fast when a required credential is missing.
    fn create(&self, id: ProviderId) -> Result<Box<dyn ModelGateway>>;
}
