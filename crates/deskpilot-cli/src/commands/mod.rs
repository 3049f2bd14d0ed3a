//! # CLI Commands
//!
//! Subcommand implementations for the Deskpilot CLI.

pub mod providers;
pub mod run;
pub mod settings;
