//! # Prompts
//!
//! Both styles tell the model the screen size and pointer position so it
//! can emit in-bounds coordinates, and ask for the instruction-set schema.

use deskpilot_vision::ScreenSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Long keyboard-first guide with every command shape spelled out
    Detailed,
    /// Short guide for smaller models
    Compact,
}

const DETAILED_GUIDE: &str = r#"You control a computer by looking at a screenshot and returning the input commands that move it toward the user's goal.

Prefer the keyboard. Use, in order:
1. System shortcuts (command+space, command+tab)
2. Application shortcuts (command+c, command+v, command+z)
3. Navigation keys (tab, arrows, enter, escape)
4. The mouse, only when nothing above works

Command shapes:
{"type": "hotkey", "value": "command+space", "description": "..."}   keys joined with '+'
{"type": "press", "value": "enter", "description": "..."}            one key name
{"type": "type", "value": "text to type", "description": "..."}
{"type": "move", "x": 100, "y": 200, "description": "..."}
{"type": "click", "x": 100, "y": 200, "description": "..."}
{"type": "drag", "x": 100, "y": 200, "description": "..."}
{"type": "scroll", "value": 3, "description": "..."}                 positive scrolls up, negative down

Reply with exactly one JSON object:
{
  "steps": [ ...commands... ],
  "done": "message when the goal is already reached" or null,
  "feedback": "what you see and what the steps do"
}

Example, opening a browser:
{
  "steps": [
    {"type": "hotkey", "value": "command+space", "description": "Open search"},
    {"type": "type", "value": "chrome", "description": "Type the app name"},
    {"type": "press", "value": "enter", "description": "Launch it"}
  ],
  "done": null,
  "feedback": "Opening the browser from search"
}

When you use the mouse, move before clicking and read coordinates carefully off the screenshot."#;

const COMPACT_GUIDE: &str = r#"You are a computer control assistant. Look at the screenshot and give the steps that achieve the user's goal. Prefer keyboard shortcuts.

Reply with ONLY this JSON object, no markdown:
{
  "steps": [
    {"type": "hotkey|press|type|click|move|drag|scroll", "value": "keys, text or scroll amount", "x": 0, "y": 0, "description": "what this does"}
  ],
  "done": null
}"#;

/// Build the full prompt for a goal and snapshot.
pub fn build_prompt(style: PromptStyle, goal: &str, snapshot: &ScreenSnapshot) -> String {
    let guide = match style {
        PromptStyle::Detailed => DETAILED_GUIDE,
        PromptStyle::Compact => COMPACT_GUIDE,
    };
    let (width, height) = snapshot.bounds();
    let pointer = snapshot.pointer;

    format!(
        "{guide}\n\n\
         CURRENT SCREEN:\n\
         - Resolution: {width}x{height}\n\
         - Mouse position: ({px}, {py})\n\
         - Valid coordinates: (0,0) to ({width},{height})\n\n\
         User request: {goal}\n",
        px = pointer.x,
        py = pointer.y,
    )
}
