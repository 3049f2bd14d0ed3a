//! # Vision Gateway
//!
//! Wraps a [`VisionBackend`] with prompt construction, the retry loop,
//! response extraction and bounds checking.

use crate::{
    build_prompt, parse_instructions, GatewayOutcome, ModelGateway, ProviderError, ProviderId,
    RetryPolicy, VisionBackend,
};
use async_trait::async_trait;
use deskpilot_vision::ScreenSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub struct VisionGateway<B> {
    backend: B,
    retry: RetryPolicy,
    /// Set once per-request resources have been released
    released: AtomicBool,
}

impl<B: VisionBackend> VisionGateway<B> {
    pub fn new(backend: B, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            released: AtomicBool::new(true),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: VisionBackend> ModelGateway for VisionGateway<B> {
    fn id(&self) -> ProviderId {
        self.backend.id()
    }

    async fn obtain_instructions(&self, goal: &str, snapshot: &ScreenSnapshot) -> GatewayOutcome {
        self.released.store(false, Ordering::SeqCst);

        let prompt = build_prompt(self.backend.prompt_style(), goal, snapshot);
        let mut attempt = 1;

        loop {
            match self.backend.complete(&prompt, snapshot).await {
                Ok(raw) => {
                    debug!("Raw {} response: {}", self.id(), raw);
                    let parsed = match parse_instructions(&raw) {
                        Some(set) => set,
                        None if self.retry.has_next(attempt) => {
                            warn!(
                                "Unreadable {} response, retrying (attempt {}/{})",
                                self.id(),
                                attempt,
                                self.retry.max_attempts
                            );
                            attempt += 1;
                            continue;
                        }
                        None => return GatewayOutcome::Empty,
                    };
                    return match parsed.within(snapshot.bounds()) {
                        Some(set) => {
                            info!(
                                commands = set.commands.len(),
                                done = set.done.is_some(),
                                "Received instructions"
                            );
                            GatewayOutcome::Success(set)
                        }
                        None => GatewayOutcome::Empty,
                    };
                }
                Err(e) if e.is_fatal() => {
                    warn!("{} failed: {}", self.id(), e);
                    return GatewayOutcome::Fatal(e.to_string());
                }
                Err(e) => {
                    if !self.retry.has_next(attempt) {
                        warn!(
                            "{} failed after {} attempts: {}",
                            self.id(),
                            attempt,
                            e
                        );
                        return GatewayOutcome::Empty;
                    }
                    if let ProviderError::RateLimited { .. } = e {
                        let delay = self.retry.delay_for(attempt);
                        warn!(
                            "Rate limited by {}, retrying in {:?} (attempt {}/{})",
                            self.id(),
                            delay,
                            attempt,
                            self.retry.max_attempts
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            "{} request failed, retrying (attempt {}/{}): {}",
                            self.id(),
                            attempt,
                            self.retry.max_attempts,
                            e
                        );
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn cleanup(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Releasing {} resources", self.id());
        self.backend.release().await;
    }
}
