//! # Run Command
//!
//! Execute one goal and exit when its status stream closes.

use crate::cli::Cli;
use crate::runtime::{self, Session};
use deskpilot_core::Request;

/// Run the run command
pub async fn run(goal: String, cli: &Cli) -> anyhow::Result<()> {
    let goal = goal.trim().to_string();
    if goal.is_empty() {
        anyhow::bail!("Goal must not be empty");
    }

    let Session {
        handle,
        status,
        provider,
        play_sound,
    } = runtime::start(cli)?;

    let printer = runtime::spawn_printer(status, play_sound);
    let interrupts = runtime::spawn_interrupt_forwarder(&handle);

    handle.submit(Request::execute(goal, provider)).await?;
    handle.shutdown().await;

    interrupts.abort();
    printer.await?;
    Ok(())
}
