//! # CLI Arguments
//!
//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deskpilot - drive the desktop from a natural-language goal
#[derive(Parser, Debug)]
#[command(name = "deskpilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provider to use: gemini, groq, ollama (overrides settings)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long, env = "DESKPILOT_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Record input instead of moving the real pointer and keyboard
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single goal and exit when it finishes
    Run {
        /// What to do, e.g. "open the calculator"
        #[arg(required = true, num_args = 1..)]
        goal: Vec<String>,
    },

    /// View or set settings
    Settings {
        /// Settings key
        key: Option<String>,
        /// Value to set (parsed as JSON, otherwise taken as a string)
        value: Option<String>,
    },

    /// List providers and whether they are configured
    Providers,
}
