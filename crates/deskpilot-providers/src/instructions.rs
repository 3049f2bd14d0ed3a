//! # Instruction Sets
//!
//! The wire shape of a model response and the extraction of that shape
//! from free-form model output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Kind of a command as named by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Move,
    Click,
    Drag,
    Scroll,
    Type,
    Press,
    Hotkey,
    /// Anything else; rejected by validation
    #[default]
    #[serde(other)]
    Unknown,
}

impl CommandKind {
    /// Kinds that carry screen coordinates.
    pub fn is_positional(&self) -> bool {
        matches!(self, Self::Move | Self::Click | Self::Drag)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Move => "move",
            Self::Click => "click",
            Self::Drag => "drag",
            Self::Scroll => "scroll",
            Self::Type => "type",
            Self::Press => "press",
            Self::Hotkey => "hotkey",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One command as returned by a model, before validation.
///
/// Fields stay loosely typed so that a badly typed field rejects one
/// command during validation instead of the whole response during parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Command {
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Command {
    fn new(kind: CommandKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: Some(description.into()),
            ..Default::default()
        }
    }

    fn at(kind: CommandKind, x: i64, y: i64, description: impl Into<String>) -> Self {
        Self {
            x: Some(Value::from(x)),
            y: Some(Value::from(y)),
            ..Self::new(kind, description)
        }
    }

    fn with_value(kind: CommandKind, value: Value, description: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            ..Self::new(kind, description)
        }
    }

    pub fn click(x: i64, y: i64, description: impl Into<String>) -> Self {
        Self::at(CommandKind::Click, x, y, description)
    }

    pub fn move_to(x: i64, y: i64, description: impl Into<String>) -> Self {
        Self::at(CommandKind::Move, x, y, description)
    }

    pub fn drag(x: i64, y: i64, description: impl Into<String>) -> Self {
        Self::at(CommandKind::Drag, x, y, description)
    }

    pub fn scroll(amount: i64, description: impl Into<String>) -> Self {
        Self::with_value(CommandKind::Scroll, Value::from(amount), description)
    }

    pub fn type_text(text: &str, description: impl Into<String>) -> Self {
        Self::with_value(CommandKind::Type, Value::from(text), description)
    }

    pub fn press(key: &str, description: impl Into<String>) -> Self {
        Self::with_value(CommandKind::Press, Value::from(key), description)
    }

    pub fn hotkey(combo: &str, description: impl Into<String>) -> Self {
        Self::with_value(CommandKind::Hotkey, Value::from(combo), description)
    }

    /// Numeric coordinates, if both are present and numeric.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let x = self.x.as_ref()?.as_f64()?;
        let y = self.y.as_ref()?.as_f64()?;
        Some((x, y))
    }

    /// The value as a string, if it is one.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref()?.as_str()
    }

    /// Human-readable label used in status lines.
    pub fn label(&self) -> String {
        match &self.description {
            Some(d) if !d.trim().is_empty() => d.clone(),
            _ => format!("{} command", self.kind),
        }
    }

    /// Models sometimes send a hotkey as an array of key names.
    fn normalize(&mut self) {
        if self.kind != CommandKind::Hotkey {
            return;
        }
        if let Some(Value::Array(keys)) = &self.value {
            let names: Option<Vec<&str>> = keys.iter().map(Value::as_str).collect();
            if let Some(names) = names {
                self.value = Some(Value::from(names.join("+")));
            }
        }
    }
}

/// The action plan returned by a model for one goal/snapshot pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "RawInstructionSet")]
pub struct InstructionSet {
    pub commands: Vec<Command>,
    /// Completion message; when set, no commands run
    pub done: Option<String>,
    pub feedback: Option<String>,
}

impl InstructionSet {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            ..Default::default()
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            done: Some(message.into()),
            ..Default::default()
        }
    }

    /// Neither commands nor a completion message.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.done.is_none()
    }

    /// Index of the first positional command outside `[0, w] x [0, h]`.
    pub fn first_out_of_bounds(&self, bounds: (u32, u32)) -> Option<usize> {
        let (w, h) = (bounds.0 as f64, bounds.1 as f64);
        self.commands.iter().position(|c| {
            c.kind.is_positional()
                && c.coordinates()
                    .is_some_and(|(x, y)| !(0.0..=w).contains(&x) || !(0.0..=h).contains(&y))
        })
    }
}

/// Accepts both `commands` and `steps`, and `done` as string, bool or null.
#[derive(Deserialize)]
struct RawInstructionSet {
    #[serde(default)]
    commands: Option<Vec<Command>>,
    #[serde(default)]
    steps: Option<Vec<Command>>,
    #[serde(default)]
    done: Value,
    #[serde(default)]
    feedback: Option<String>,
}

impl From<RawInstructionSet> for InstructionSet {
    fn from(raw: RawInstructionSet) -> Self {
        let mut commands = raw.commands.or(raw.steps).unwrap_or_default();
        commands.iter_mut().for_each(Command::normalize);

        let done = match raw.done {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Bool(true) => Some("Task completed".to_string()),
            _ => None,
        };

        Self {
            commands,
            done,
            feedback: raw.feedback.filter(|f| !f.trim().is_empty()),
        }
    }
}

/// Extract an instruction set from raw model output.
///
/// Returns `None` when nothing parses, when the result is empty, or when
/// any positional command lies outside `bounds`.
pub fn extract_instructions(raw: &str, bounds: (u32, u32)) -> Option<InstructionSet> {
    parse_instructions(raw)?.within(bounds)
}

/// Parse the text between the first `{` and the last `}`, which skips
/// surrounding prose and code fences.
pub fn parse_instructions(raw: &str) -> Option<InstructionSet> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let json = &raw[start..=end];
    debug!("Extracted JSON: {}", json);

    match serde_json::from_str(json) {
        Ok(set) => Some(set),
        Err(e) => {
            warn!("Failed to parse model response: {}", e);
            None
        }
    }
}

impl InstructionSet {
    /// Keep a parsed set only if it says something and every positional
    /// command fits on a screen of `bounds`.
    pub fn within(self, bounds: (u32, u32)) -> Option<Self> {
        if self.is_empty() {
            debug!("Model response contained no commands");
            return None;
        }

        if let Some(index) = self.first_out_of_bounds(bounds) {
            warn!(
                "Discarding response: command {} is outside {}x{}",
                index + 1,
                bounds.0,
                bounds.1
            );
            return None;
        }

        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: (u32, u32) = (1920, 1080);

    #[test]
    fn test_extract_from_fenced_block() {
        let raw = "Sure! Here is the plan:\n```json\n{\"steps\": [{\"type\": \"press\", \"value\": \"enter\", \"description\": \"confirm\"}], \"done\": null}\n```\nGood luck.";
        let set = extract_instructions(raw, BOUNDS).unwrap();
        assert_eq!(set.commands, vec![Command::press("enter", "confirm")]);
        assert!(set.done.is_none());
    }

    #[test]
    fn test_commands_key_is_accepted() {
        let raw = r#"{"commands": [{"type": "scroll", "value": -3}], "feedback": "scrolling"}"#;
        let set = extract_instructions(raw, BOUNDS).unwrap();
        assert_eq!(set.commands.len(), 1);
        assert_eq!(set.commands[0].kind, CommandKind::Scroll);
        assert_eq!(set.feedback.as_deref(), Some("scrolling"));
    }

    #[test]
    fn test_done_variants() {
        let set = extract_instructions(r#"{"steps": [], "done": "Task already complete"}"#, BOUNDS)
            .unwrap();
        assert_eq!(set.done.as_deref(), Some("Task already complete"));

        let set = extract_instructions(r#"{"steps": [], "done": true}"#, BOUNDS).unwrap();
        assert!(set.done.is_some());

        assert!(extract_instructions(r#"{"steps": [], "done": false}"#, BOUNDS).is_none());
    }

    #[test]
    fn test_no_structure_is_none() {
        assert!(extract_instructions("I cannot help with that.", BOUNDS).is_none());
        assert!(extract_instructions("} backwards {", BOUNDS).is_none());
        assert!(extract_instructions("{ not json }", BOUNDS).is_none());
        assert!(parse_instructions("{ not json }").is_none());
    }

    #[test]
    fn test_out_of_bounds_discards_whole_response() {
        let raw = r#"{"steps": [
            {"type": "press", "value": "enter"},
            {"type": "click", "x": 2000, "y": 10},
            {"type": "type", "value": "hello"}
        ]}"#;
        assert!(extract_instructions(raw, BOUNDS).is_none());

        let raw = r#"{"steps": [{"type": "move", "x": 10, "y": -1}]}"#;
        assert!(extract_instructions(raw, BOUNDS).is_none());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let raw = r#"{"steps": [{"type": "drag", "x": 1920, "y": 1080}, {"type": "click", "x": 0, "y": 0}]}"#;
        let set = extract_instructions(raw, BOUNDS).unwrap();
        assert_eq!(set.commands.len(), 2);
    }

    #[test]
    fn test_hotkey_array_is_joined() {
        let raw = r#"{"steps": [{"type": "hotkey", "value": ["command", "space"]}]}"#;
        let set = extract_instructions(raw, BOUNDS).unwrap();
        assert_eq!(set.commands[0].value_str(), Some("command+space"));
    }

    #[test]
    fn test_unknown_type_survives_parsing() {
        let raw = r#"{"steps": [{"type": "wiggle", "description": "wiggle"}, {"value": "x"}]}"#;
        let set = extract_instructions(raw, BOUNDS).unwrap();
        assert_eq!(set.commands[0].kind, CommandKind::Unknown);
        assert_eq!(set.commands[1].kind, CommandKind::Unknown);
        assert_eq!(set.commands[1].label(), "unknown command");
    }
}
