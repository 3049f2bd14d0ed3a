//! Command validation.
//!
//! Turns a loosely typed [`Command`] from a model into a typed [`Action`],
//! or explains why it cannot run. Pure: no state, no I/O.

use deskpilot_providers::{Command, CommandKind};
use serde_json::Value;
use thiserror::Error;

/// Largest scroll, in wheel clicks, passed on to the input layer.
pub const MAX_SCROLL_CLICKS: i32 = 100;

/// A validated command, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move { x: i32, y: i32 },
    Click { x: i32, y: i32 },
    Drag { x: i32, y: i32 },
    /// Positive scrolls up
    Scroll { amount: i32 },
    Type { text: String },
    Press { key: String },
    /// `+`-delimited key names
    Hotkey { combo: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{kind} command needs numeric x and y")]
    MissingCoordinates { kind: CommandKind },

    #[error("coordinates ({x}, {y}) are outside the {width}x{height} screen")]
    OutOfBounds {
        x: f64,
        y: f64,
        width: u32,
        height: u32,
    },

    #[error("scroll command needs a numeric value")]
    InvalidScrollAmount,

    #[error("{kind} command needs a non-empty text value")]
    MissingText { kind: CommandKind },

    #[error("unknown command type")]
    UnknownType,
}

/// Validate a command against the screen bounds `[0, width] x [0, height]`.
pub fn validate(command: &Command, bounds: (u32, u32)) -> Result<Action, ValidationError> {
    match command.kind {
        CommandKind::Move => point(command, bounds).map(|(x, y)| Action::Move { x, y }),
        CommandKind::Click => point(command, bounds).map(|(x, y)| Action::Click { x, y }),
        CommandKind::Drag => point(command, bounds).map(|(x, y)| Action::Drag { x, y }),
        CommandKind::Scroll => match command.value.as_ref().and_then(Value::as_f64) {
            Some(amount) => Ok(Action::Scroll {
                amount: (amount.round() as i32).clamp(-MAX_SCROLL_CLICKS, MAX_SCROLL_CLICKS),
            }),
            None => Err(ValidationError::InvalidScrollAmount),
        },
        CommandKind::Type => text(command, false).map(|text| Action::Type { text }),
        CommandKind::Press => text(command, true).map(|key| Action::Press { key }),
        CommandKind::Hotkey => text(command, true).map(|combo| Action::Hotkey { combo }),
        CommandKind::Unknown => Err(ValidationError::UnknownType),
    }
}

fn point(command: &Command, (width, height): (u32, u32)) -> Result<(i32, i32), ValidationError> {
    let (x, y) = command
        .coordinates()
        .ok_or(ValidationError::MissingCoordinates { kind: command.kind })?;

    let in_bounds = (0.0..=width as f64).contains(&x) && (0.0..=height as f64).contains(&y);
    if !in_bounds {
        return Err(ValidationError::OutOfBounds {
            x,
            y,
            width,
            height,
        });
    }

    Ok((x.round() as i32, y.round() as i32))
}

/// Key names are trimmed; typed text is kept verbatim.
fn text(command: &Command, trim: bool) -> Result<String, ValidationError> {
    let missing = ValidationError::MissingText { kind: command.kind };
    let value = command.value_str().ok_or_else(|| missing.clone())?;
    let value = if trim { value.trim() } else { value };
    if value.is_empty() {
        return Err(missing);
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCREEN: (u32, u32) = (1920, 1080);

    fn parse(value: serde_json::Value) -> Command {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_positional_commands() {
        assert_eq!(
            validate(&Command::click(100, 200, "c"), SCREEN),
            Ok(Action::Click { x: 100, y: 200 })
        );
        assert_eq!(
            validate(&Command::move_to(0, 0, "m"), SCREEN),
            Ok(Action::Move { x: 0, y: 0 })
        );
        assert_eq!(
            validate(&Command::drag(1920, 1080, "d"), SCREEN),
            Ok(Action::Drag { x: 1920, y: 1080 })
        );
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        for cmd in [
            Command::click(1921, 10, "c"),
            Command::move_to(10, -1, "m"),
            Command::drag(-5, 1081, "d"),
        ] {
            assert!(matches!(
                validate(&cmd, SCREEN),
                Err(ValidationError::OutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_non_numeric_coordinates() {
        let cmd = parse(json!({"type": "click", "x": "100", "y": 200}));
        assert_eq!(
            validate(&cmd, SCREEN),
            Err(ValidationError::MissingCoordinates {
                kind: CommandKind::Click
            })
        );
        let cmd = parse(json!({"type": "move", "x": 5}));
        assert!(validate(&cmd, SCREEN).is_err());
    }

    #[test]
    fn test_fractional_coordinates_round() {
        let cmd = parse(json!({"type": "click", "x": 10.6, "y": 20.4}));
        assert_eq!(validate(&cmd, SCREEN), Ok(Action::Click { x: 11, y: 20 }));
    }

    #[test]
    fn test_scroll_requires_number() {
        assert_eq!(
            validate(&Command::scroll(-3, "s"), SCREEN),
            Ok(Action::Scroll { amount: -3 })
        );
        let cmd = parse(json!({"type": "scroll", "value": "down"}));
        assert_eq!(validate(&cmd, SCREEN), Err(ValidationError::InvalidScrollAmount));
    }

    #[test]
    fn test_scroll_amount_is_clamped() {
        let cmd = parse(json!({"type": "scroll", "value": -1e12}));
        assert_eq!(
            validate(&cmd, SCREEN),
            Ok(Action::Scroll {
                amount: -MAX_SCROLL_CLICKS
            })
        );
        let cmd = parse(json!({"type": "scroll", "value": 250}));
        assert_eq!(
            validate(&cmd, SCREEN),
            Ok(Action::Scroll {
                amount: MAX_SCROLL_CLICKS
            })
        );
    }

    #[test]
    fn test_text_commands_require_non_empty_string() {
        assert_eq!(
            validate(&Command::type_text("hello world", "t"), SCREEN),
            Ok(Action::Type {
                text: "hello world".into()
            })
        );
        assert_eq!(
            validate(&Command::press(" enter ", "p"), SCREEN),
            Ok(Action::Press { key: "enter".into() })
        );
        assert!(validate(&Command::type_text("", "t"), SCREEN).is_err());
        assert!(validate(&Command::hotkey("  ", "h"), SCREEN).is_err());
        let cmd = parse(json!({"type": "press", "value": 13}));
        assert!(matches!(
            validate(&cmd, SCREEN),
            Err(ValidationError::MissingText { .. })
        ));
    }

    #[test]
    fn test_unknown_type() {
        let cmd = parse(json!({"type": "wiggle"}));
        assert_eq!(validate(&cmd, SCREEN), Err(ValidationError::UnknownType));
    }

    #[test]
    fn test_reason_is_readable() {
        let err = validate(&Command::click(5000, 10, "c"), SCREEN).unwrap_err();
        assert_eq!(
            err.to_string(),
            "coordinates (5000, 10) are outside the 1920x1080 screen"
        );
    }
}
