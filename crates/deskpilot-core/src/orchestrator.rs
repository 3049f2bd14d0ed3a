//! # Task Orchestrator
//!
//! Runs one goal end to end: capture the screen, ask the model, then
//! validate and execute each command in order while honoring Stop.
//!
//! ## Concurrency
//!
//! [`TaskOrchestrator::start`] spawns two tasks:
//!
//! - a **dispatcher** that drains the caller's request channel. It handles
//!   `Stop` on arrival (advances the stop epoch, reports, releases an idle
//!   provider) and forwards `Execute` requests to the worker in order,
//!   each stamped with the epoch current at dispatch.
//! - a **worker** that runs `Execute` requests one at a time.
//!
//! A run whose stamp is older than the current epoch was followed by a
//! Stop, so it performs nothing further. The execution state is held under
//! one mutex for the length of a run. The epoch is a separate atomic so
//! Stop never waits on that mutex.
//! A panic inside a run is caught and reported; the worker keeps serving.

use crate::channel::{Request, StatusSender};
use crate::config::OrchestratorConfig;
use crate::executor::ActionExecutor;
use crate::validator::validate;
use crate::{CoreError, Result};
use deskpilot_providers::{
    GatewayFactory, GatewayOutcome, ModelGateway, ProviderError, ProviderId,
};
use deskpilot_vision::ScreenCapture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const INTERRUPTED: &str = "Task interrupted by user";
pub const ALL_COMPLETED: &str = "🎉 All tasks completed successfully!";

/// Per-request state shared between runs.
#[derive(Default)]
struct ExecutionState {
    active_provider: Option<Box<dyn ModelGateway>>,
}

/// How a run ended, deciding how much of the provider to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunEnd {
    Completed,
    /// Aborted for a reason unrelated to the provider
    Aborted,
    Interrupted,
    /// Provider or executor failure; drop the provider
    Failed,
}

pub struct TaskOrchestrator {
    state: Mutex<ExecutionState>,
    stop_epoch: AtomicU64,
    factory: Arc<dyn GatewayFactory>,
    capture: Arc<dyn ScreenCapture>,
    executor: Arc<dyn ActionExecutor>,
    status: StatusSender,
    config: OrchestratorConfig,
}

impl TaskOrchestrator {
    pub fn new(
        factory: Arc<dyn GatewayFactory>,
        capture: Arc<dyn ScreenCapture>,
        executor: Arc<dyn ActionExecutor>,
        status: StatusSender,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            state: Mutex::new(ExecutionState::default()),
            stop_epoch: AtomicU64::new(0),
            factory,
            capture,
            executor,
            status,
            config,
        }
    }

    /// Spawn the dispatcher and worker tasks.
    pub fn start(self) -> OrchestratorHandle {
        let orchestrator = Arc::new(self);
        let (request_tx, mut request_rx) =
            mpsc::channel::<Request>(orchestrator.config.request_queue.max(1));
        let (work_tx, mut work_rx) = mpsc::unbounded_channel::<(String, ProviderId, u64)>();

        let dispatcher = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                while let Some(request) = request_rx.recv().await {
                    match request {
                        Request::Stop => orchestrator.stop().await,
                        Request::Execute { goal, provider } => {
                            let epoch = orchestrator.stop_epoch.load(Ordering::SeqCst);
                            if work_tx.send((goal, provider, epoch)).is_err() {
                                break;
                            }
                        }
                    }
                }
                debug!("Request channel closed");
            })
        };

        let worker = tokio::spawn(async move {
            while let Some((goal, provider, epoch)) = work_rx.recv().await {
                orchestrator.run_stamped(&goal, provider, epoch).await;
            }
            debug!("Worker finished");
        });

        OrchestratorHandle {
            requests: request_tx,
            dispatcher,
            worker,
        }
    }

    /// Handle a Stop request.
    ///
    /// Advances the stop epoch, which cancels the running goal between
    /// commands and every goal dispatched before this call. A provider is
    /// released right away only if no run holds the state; otherwise the
    /// run releases it when it observes the new epoch.
    pub async fn stop(&self) {
        self.stop_epoch.fetch_add(1, Ordering::SeqCst);
        info!("Stop requested");
        self.status.emit(INTERRUPTED);

        if let Ok(mut state) = self.state.try_lock() {
            if let Some(provider) = state.active_provider.take() {
                provider.cleanup().await;
                info!("Released {} provider", provider.id());
            }
        }
    }

    /// Run one Execute request to completion. Never panics.
    ///
    /// Only a Stop issued after this call starts interrupts it.
    pub async fn execute(&self, goal: &str, provider: ProviderId) {
        let epoch = self.stop_epoch.load(Ordering::SeqCst);
        self.run_stamped(goal, provider, epoch).await;
    }

    fn stopped_since(&self, epoch: u64) -> bool {
        self.stop_epoch.load(Ordering::SeqCst) != epoch
    }

    async fn run_stamped(&self, goal: &str, provider: ProviderId, epoch: u64) {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, %provider, goal);

        let run = AssertUnwindSafe(self.run(goal, provider, epoch).instrument(span.clone()));
        if let Err(panic) = run.catch_unwind().await {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unexpected failure".to_string());
            self.recover(reason).instrument(span).await;
        }
    }

    async fn recover(&self, reason: String) {
        error!("Run panicked: {}", reason);
        self.status.emit(format!("❌ Error: {}", reason));

        let mut state = self.state.lock().await;
        if let Some(provider) = state.active_provider.take() {
            provider.cleanup().await;
        }
    }

    async fn run(&self, goal: &str, provider_id: ProviderId, epoch: u64) {
        let mut state = self.state.lock().await;
        let end = if self.stopped_since(epoch) {
            info!("Skipping run cancelled by Stop");
            RunEnd::Interrupted
        } else {
            info!("Starting run");
            self.pipeline(&mut state, goal, provider_id, epoch).await
        };
        info!(?end, "Run finished");

        if let Some(provider) = &state.active_provider {
            provider.cleanup().await;
        }
        if matches!(end, RunEnd::Interrupted | RunEnd::Failed) {
            if let Some(provider) = state.active_provider.take() {
                info!("Released {} provider", provider.id());
            }
        }
    }

    async fn pipeline(
        &self,
        state: &mut ExecutionState,
        goal: &str,
        provider_id: ProviderId,
        epoch: u64,
    ) -> RunEnd {
        let provider = match self.resolve_provider(state, provider_id).await {
            Ok(provider) => provider,
            Err(e) => {
                self.status.emit(format!("❌ Error: {}", e));
                return RunEnd::Failed;
            }
        };

        if self.stopped_since(epoch) {
            return RunEnd::Interrupted;
        }

        self.status.emit("📸 Capturing screen...");
        let snapshot = match self.capture.capture().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Capture failed: {}", e);
                self.status.emit(format!("❌ Failed to capture screen: {}", e));
                return RunEnd::Aborted;
            }
        };

        self.status
            .emit("🤖 Analyzing screen and processing request...");
        let instructions = match provider.obtain_instructions(goal, &snapshot).await {
            GatewayOutcome::Success(set) => set,
            GatewayOutcome::Empty => {
                self.status.emit("❌ No instructions received from model");
                return RunEnd::Aborted;
            }
            GatewayOutcome::Fatal(reason) => {
                self.status.emit(format!("❌ Error: {}", reason));
                return RunEnd::Failed;
            }
        };

        if let Some(done) = &instructions.done {
            self.status.emit(format!("✅ {}", done));
            return RunEnd::Completed;
        }

        if instructions.commands.is_empty() {
            self.status.emit("❌ No commands to execute");
            return RunEnd::Aborted;
        }

        let bounds = snapshot.bounds();
        let total = instructions.commands.len();

        for (index, command) in instructions.commands.iter().enumerate() {
            let step = index + 1;
            if self.stopped_since(epoch) {
                info!(step, "Stopping before step");
                return RunEnd::Interrupted;
            }

            let label = command.label();
            self.status
                .emit(format!("🔄 Step {}/{}: {}", step, total, label));

            let action = match validate(command, bounds) {
                Ok(action) => action,
                Err(reason) => {
                    warn!(step, "Skipping invalid command: {}", reason);
                    self.status.emit(format!("❌ Step {}: {}", step, reason));
                    continue;
                }
            };

            if let Err(e) = self.executor.perform(&action).await {
                warn!(step, "Command failed: {}", e);
                self.status
                    .emit(format!("❌ Step {} failed: {} ({})", step, label, e));
                return RunEnd::Failed;
            }

            self.status
                .emit(format!("✅ Step {} completed: {}", step, label));

            if step < total && !self.config.command_delay.is_zero() {
                tokio::time::sleep(self.config.command_delay).await;
            }
        }

        self.status.emit(ALL_COMPLETED);
        RunEnd::Completed
    }

    /// Reuse the active provider if it matches, otherwise swap it.
    async fn resolve_provider<'a>(
        &self,
        state: &'a mut ExecutionState,
        id: ProviderId,
    ) -> std::result::Result<&'a dyn ModelGateway, ProviderError> {
        let reusable = state
            .active_provider
            .as_ref()
            .is_some_and(|p| p.id() == id);

        if !reusable {
            if let Some(old) = state.active_provider.take() {
                info!("Switching provider from {} to {}", old.id(), id);
                old.cleanup().await;
            }
            state.active_provider = Some(self.factory.create(id)?);
        }

        state
            .active_provider
            .as_deref()
            .ok_or_else(|| ProviderError::ConfigError(format!("{} provider unavailable", id)))
    }
}

/// Caller-side handle to a running orchestrator.
pub struct OrchestratorHandle {
    requests: mpsc::Sender<Request>,
    dispatcher: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Submit a request. Waits only if the request channel is full.
    pub async fn submit(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| CoreError::ChannelClosed)
    }

    /// A cloneable sender for callers that submit from several places.
    pub fn sender(&self) -> mpsc::Sender<Request> {
        self.requests.clone()
    }

    /// Stop accepting requests and wait for queued work to finish.
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.dispatcher.await {
            error!("Dispatcher task failed: {}", e);
        }
        if let Err(e) = self.worker.await {
            error!("Worker task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::status_channel;
    use crate::Action;
    use crate::ActionError;
    use async_trait::async_trait;
    use deskpilot_providers::{Command, InstructionSet};
    use deskpilot_vision::capture::mock::MockCapture;
    use deskpilot_vision::ScreenSnapshot;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    struct FixedGateway {
        id: ProviderId,
        outcome: GatewayOutcome,
        cleanups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ModelGateway for FixedGateway {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn obtain_instructions(&self, _goal: &str, _s: &ScreenSnapshot) -> GatewayOutcome {
            self.outcome.clone()
        }

        async fn cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FixedFactory {
        outcome: GatewayOutcome,
        created: Arc<AtomicUsize>,
        cleanups: Arc<AtomicUsize>,
    }

    impl FixedFactory {
        fn new(outcome: GatewayOutcome) -> Self {
            Self {
                outcome,
                created: Arc::new(AtomicUsize::new(0)),
                cleanups: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl GatewayFactory for FixedFactory {
        fn create(&self, id: ProviderId) -> deskpilot_providers::Result<Box<dyn ModelGateway>> {
            if id == ProviderId::Groq {
                return Err(ProviderError::MissingCredential("no key".into()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FixedGateway {
                id,
                outcome: self.outcome.clone(),
                cleanups: self.cleanups.clone(),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        actions: StdMutex<Vec<Action>>,
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        async fn perform(&self, action: &Action) -> std::result::Result<(), ActionError> {
            self.actions.lock().unwrap().push(action.clone());
            Ok(())
        }
    }

    fn orchestrator(
        factory: Arc<FixedFactory>,
        capture: MockCapture,
    ) -> (TaskOrchestrator, crate::StatusReceiver, Arc<RecordingExecutor>) {
        let (tx, rx) = status_channel(64);
        let executor = Arc::new(RecordingExecutor::default());
        let config = OrchestratorConfig {
            command_delay: std::time::Duration::ZERO,
            ..Default::default()
        };
        let orch = TaskOrchestrator::new(factory, Arc::new(capture), executor.clone(), tx, config);
        (orch, rx, executor)
    }

    fn drain(rx: &mut crate::StatusReceiver) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_provider_reused_across_runs() {
        let set = InstructionSet::new(vec![Command::press("enter", "go")]);
        let factory = Arc::new(FixedFactory::new(GatewayOutcome::Success(set)));
        let (orch, _rx, _exec) = orchestrator(factory.clone(), MockCapture::new(100, 100));

        orch.execute("one", ProviderId::Gemini).await;
        orch.execute("two", ProviderId::Gemini).await;

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        // Per-request cleanup after each run
        assert_eq!(factory.cleanups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_credential_reports_once() {
        let factory = Arc::new(FixedFactory::new(GatewayOutcome::Empty));
        let (orch, mut rx, exec) = orchestrator(factory, MockCapture::new(100, 100));

        orch.execute("goal", ProviderId::Groq).await;

        let lines = drain(&mut rx);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("❌ Error: Missing credential"));
        assert!(exec.actions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capture_failure_aborts_without_model_call() {
        let factory = Arc::new(FixedFactory::new(GatewayOutcome::Empty));
        let (orch, mut rx, _exec) = orchestrator(factory, MockCapture::unavailable());

        orch.execute("goal", ProviderId::Gemini).await;

        let lines = drain(&mut rx);
        assert_eq!(lines[0], "📸 Capturing screen...");
        assert!(lines[1].starts_with("❌ Failed to capture screen"));
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_outcome_drops_provider() {
        let factory = Arc::new(FixedFactory::new(GatewayOutcome::Fatal("bad key".into())));
        let (orch, mut rx, _exec) = orchestrator(factory.clone(), MockCapture::new(10, 10));

        orch.execute("goal", ProviderId::Gemini).await;
        orch.execute("goal", ProviderId::Gemini).await;

        assert!(drain(&mut rx).contains(&"❌ Error: bad key".to_string()));
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_idle_stop_releases_provider() {
        let set = InstructionSet::completed("nothing to do");
        let factory = Arc::new(FixedFactory::new(GatewayOutcome::Success(set)));
        let (orch, mut rx, _exec) = orchestrator(factory.clone(), MockCapture::new(10, 10));

        orch.execute("goal", ProviderId::Gemini).await;
        orch.stop().await;
        orch.execute("goal", ProviderId::Gemini).await;

        let lines = drain(&mut rx);
        assert!(lines.contains(&INTERRUPTED.to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("✅ nothing to do"));
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }
}
