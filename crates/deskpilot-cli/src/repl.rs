//! # Interactive Loop
//!
//! Each line is a goal. `stop` interrupts the running goal, `quit` or
//! `exit` (or end of input) waits for queued goals and exits.

use crate::cli::Cli;
use crate::runtime::{self, Session};
use colored::Colorize;
use deskpilot_core::Request;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    Quit,
    Stop,
    Goal(String),
}

pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => ReplInput::Empty,
        "quit" | "exit" => ReplInput::Quit,
        "stop" => ReplInput::Stop,
        _ => ReplInput::Goal(line.to_string()),
    }
}

pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let Session {
        handle,
        status,
        provider,
        play_sound,
    } = runtime::start(cli)?;

    println!("{} {}", "Deskpilot".bright_cyan().bold(), format!("({})", provider).dimmed());
    println!(
        "{}",
        "Type a goal and press Enter. 'stop' interrupts, 'quit' exits.".dimmed()
    );

    let printer = runtime::spawn_printer(status, play_sound);
    let interrupts = runtime::spawn_interrupt_forwarder(&handle);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ReplInput::Empty => continue,
            ReplInput::Quit => break,
            ReplInput::Stop => handle.submit(Request::Stop).await?,
            ReplInput::Goal(goal) => {
                debug!("Submitting goal: {}", goal);
                handle.submit(Request::execute(goal, provider)).await?;
            }
        }
    }

    handle.shutdown().await;
    interrupts.abort();
    printer.await?;
    Ok(())
}
