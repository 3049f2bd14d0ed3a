//! # Settings Command
//!
//! View or set values in the settings file.

use crate::cli::Cli;
use crate::runtime;
use colored::Colorize;
use deskpilot_core::Settings;
use serde_json::Value;

const MASK: &str = "********";

/// Run the settings command
pub fn run(key: Option<String>, value: Option<String>, cli: &Cli) -> anyhow::Result<()> {
    let path = runtime::settings_path(cli)?;

    match (key, value) {
        (None, None) => {
            let settings = Settings::load_from(&path)?;
            println!("{}", "Current Settings".bright_cyan().bold());
            println!("{}", path.display().to_string().dimmed());
            println!();

            let mut document = serde_json::to_value(&settings)?;
            redact_secrets(&mut document);
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        (Some(key), None) => {
            let settings = Settings::load_from(&path)?;
            match settings.get(&key) {
                Some(value) => println!("{}", display_value(&value)),
                None => anyhow::bail!("Unknown setting '{}'", key),
            }
        }
        (Some(key), Some(value)) => {
            let mut settings = Settings::load_or_create(&path)?;
            settings.set(&key, &value)?;
            settings.save_to(&path)?;
            println!("Set {} = {}", key.bright_yellow(), value.bright_green());
        }
        (None, Some(_)) => anyhow::bail!("Must specify a key to set a value"),
    }

    Ok(())
}

/// Strings print bare; everything else prints as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Mask API keys when printing the whole document.
fn redact_secrets(document: &mut Value) {
    if let Value::Object(map) = document {
        for (key, value) in map.iter_mut() {
            if key.ends_with("_api_key") && value.is_string() {
                *value = Value::from(MASK);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_secrets() {
        let mut doc = json!({
            "gemini_api_key": "secret",
            "groq_api_key": null,
            "default_model": "gemini"
        });
        redact_secrets(&mut doc);
        assert_eq!(doc["gemini_api_key"], MASK);
        assert_eq!(doc["groq_api_key"], Value::Null);
        assert_eq!(doc["default_model"], "gemini");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("ollama")), "ollama");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(
            display_value(&json!({"stop_request": "Escape"})),
            r#"{"stop_request":"Escape"}"#
        );
    }
}
