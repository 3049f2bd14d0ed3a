//! # Providers Command
//!
//! List the vision providers and whether each one can be used.

use crate::cli::Cli;
use crate::runtime;
use colored::Colorize;
use deskpilot_core::PilotConfig;
use deskpilot_providers::ProviderId;

/// Run the providers command
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = runtime::load_settings(cli, false)?;
    let config = PilotConfig::from_settings(&settings)?;
    let selected = runtime::selected_provider(cli, &config)?;

    println!("{}", "Providers".bright_cyan().bold());
    println!();

    for id in ProviderId::ALL {
        let marker = if id == selected { "*" } else { " " };
        let status = if config.providers.is_configured(id) {
            "ready".green()
        } else {
            "missing API key".yellow()
        };
        println!(" {} {:<8} {}", marker, id.as_str(), status);
    }

    if !ProviderId::ALL
        .iter()
        .all(|id| config.providers.is_configured(*id))
    {
        println!();
        println!("Set API keys with:");
        println!("  deskpilot settings {} <key>", "gemini_api_key".cyan());
        println!("  deskpilot settings {} <key>", "groq_api_key".cyan());
        println!(
            "or the {} / {} environment variables.",
            "GEMINI_API_KEY".cyan(),
            "GROQ_API_KEY".cyan()
        );
    }

    Ok(())
}
