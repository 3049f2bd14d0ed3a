//! Wiring from settings to a running orchestrator.

use crate::cli::Cli;
use anyhow::Context;
use colored::Colorize;
use deskpilot_core::orchestrator::{ALL_COMPLETED, INTERRUPTED};
use deskpilot_core::{
    status_channel, InputActionExecutor, OrchestratorHandle, PilotConfig, Request, Settings,
    StatusReceiver, TaskOrchestrator,
};
use deskpilot_providers::{ProviderId, ProviderRegistry};
use deskpilot_vision::capture::{create_screen_capture, mock::MockCapture};
use deskpilot_vision::input::{create_input_simulator, mock::MockSimulator};
use deskpilot_vision::{InputSimulator, ScreenCapture, VisionError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Display size used when a dry run has no real screen to capture.
const DRY_RUN_SCREEN: (u32, u32) = (1920, 1080);

/// A started orchestrator plus what the caller needs to drive it.
pub struct Session {
    pub handle: OrchestratorHandle,
    pub status: StatusReceiver,
    pub provider: ProviderId,
    pub play_sound: bool,
}

pub fn settings_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.settings {
        Some(path) => Ok(path.clone()),
        None => Ok(Settings::default_path()?),
    }
}

/// Load settings with environment overrides applied.
pub fn load_settings(cli: &Cli, create: bool) -> anyhow::Result<Settings> {
    let path = settings_path(cli)?;
    let settings = if create {
        Settings::load_or_create(&path)
    } else {
        Settings::load_from(&path)
    }
    .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    Ok(settings.apply_env_overrides())
}

/// The provider named on the command line, or the configured default.
pub fn selected_provider(cli: &Cli, config: &PilotConfig) -> anyhow::Result<ProviderId> {
    match &cli.model {
        Some(name) => Ok(name.parse()?),
        None => Ok(config.default_provider),
    }
}

pub fn start(cli: &Cli) -> anyhow::Result<Session> {
    let settings = load_settings(cli, true)?;
    let mut config = PilotConfig::from_settings(&settings)?;
    let provider = selected_provider(cli, &config)?;

    if cli.dry_run {
        config = config.with_instant_timing();
    }

    let (input, capture) = build_platform(&config, cli.dry_run).context(
        "No desktop backend available; build with the gui-automation feature or pass --dry-run",
    )?;

    let executor = Arc::new(
        InputActionExecutor::new(input, config.timing.clone()).with_capture(capture.clone()),
    );
    let factory = Arc::new(ProviderRegistry::new(config.providers.clone()));
    let (status_tx, status_rx) = status_channel(config.orchestrator.status_queue);

    let handle = TaskOrchestrator::new(
        factory,
        capture,
        executor,
        status_tx,
        config.orchestrator.clone(),
    )
    .start();

    info!("Orchestrator started with {} provider", provider);
    Ok(Session {
        handle,
        status: status_rx,
        provider,
        play_sound: config.play_sound_on_completion,
    })
}

fn build_platform(
    config: &PilotConfig,
    dry_run: bool,
) -> Result<(Arc<dyn InputSimulator>, Arc<dyn ScreenCapture>), VisionError> {
    if !dry_run {
        let input: Arc<dyn InputSimulator> = Arc::new(create_input_simulator()?);
        let capture: Arc<dyn ScreenCapture> =
            Arc::new(create_screen_capture(config.capture.clone(), input.clone()));
        return Ok((input, capture));
    }

    info!("Dry run: input is recorded, not injected");
    let input: Arc<dyn InputSimulator> = Arc::new(MockSimulator::new());
    let capture: Arc<dyn ScreenCapture> =
        Arc::new(create_screen_capture(config.capture.clone(), input.clone()));
    if capture.is_available() {
        return Ok((input, capture));
    }

    warn!(
        "Screen capture unavailable, using a blank {}x{} screen",
        DRY_RUN_SCREEN.0, DRY_RUN_SCREEN.1
    );
    let (width, height) = DRY_RUN_SCREEN;
    let blank: Arc<dyn ScreenCapture> = Arc::new(MockCapture::new(width, height));
    Ok((input, blank))
}

/// Print status lines until the orchestrator goes away.
pub fn spawn_printer(mut status: StatusReceiver, play_sound: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = status.recv().await {
            print_status(&line, play_sound);
        }
    })
}

fn print_status(line: &str, play_sound: bool) {
    let styled = if line.starts_with('❌') {
        line.red()
    } else if line.starts_with('✅') || line == ALL_COMPLETED {
        line.green()
    } else if line == INTERRUPTED {
        line.yellow()
    } else {
        line.normal()
    };
    println!("{}", styled);

    if play_sound && line == ALL_COMPLETED {
        print!("\x07");
        let _ = std::io::stdout().flush();
    }
}

/// Turn Ctrl-C into a Stop request for as long as the orchestrator runs.
///
/// Holds only a weak sender so it never keeps the request channel open.
pub fn spawn_interrupt_forwarder(handle: &OrchestratorHandle) -> JoinHandle<()> {
    let requests = handle.sender().downgrade();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            let Some(tx) = requests.upgrade() else {
                break;
            };
            if tx.send(Request::Stop).await.is_err() {
                break;
            }
        }
    })
}
