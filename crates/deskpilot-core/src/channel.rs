//! Request and status channels between the caller and the orchestrator.
//!
//! Status delivery is best-effort: the channel is bounded and a status
//! line that does not fit is dropped instead of blocking the run.

use deskpilot_providers::ProviderId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// A request from the caller.
///
/// On the wire: `{"kind": "request", "model": "gemini", "text": "..."}` or
/// `{"kind": "stop"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Request {
    #[serde(rename = "request")]
    Execute {
        #[serde(rename = "text")]
        goal: String,
        #[serde(rename = "model")]
        provider: ProviderId,
    },
    Stop,
}

impl Request {
    pub fn execute(goal: impl Into<String>, provider: ProviderId) -> Self {
        Self::Execute {
            goal: goal.into(),
            provider,
        }
    }
}

pub type StatusReceiver = mpsc::Receiver<String>;

/// Producer side of the status stream.
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: mpsc::Sender<String>,
}

impl StatusSender {
    /// Emit a status line without waiting. Dropped if the channel is full.
    pub fn emit(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(status = %message, "status");
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!("Status channel full, dropping: {}", message);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Status receiver gone");
            }
        }
    }
}

/// Create a bounded status channel.
pub fn status_channel(capacity: usize) -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StatusSender { tx }, rx)
}
