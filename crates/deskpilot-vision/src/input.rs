//! Input simulation.
//!
//! This module provides:
//! - The `InputSimulator` capability used by the action executor
//! - Smooth pointer movement with an easing curve
//! - The key-name mapping table shared by `press` and `hotkey`
//! - An enigo-backed implementation (feature `gui-automation`)
//! - A recording mock for tests and dry runs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during input simulation.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input simulation not available on this platform")]
    NotAvailable,

    #[error("Failed to simulate input: {0}")]
    SimulationFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

// ============================================================================
// Keys
// ============================================================================

/// Named keys the model may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    // Modifiers
    Meta,
    Alt,
    Control,
    Shift,

    // Editing / navigation
    Enter,
    Escape,
    Space,
    Tab,
    Backspace,
    Delete,
    CapsLock,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

/// Key input type (character or special key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyInput {
    /// A regular character
    Char(char),
    /// A special key
    Special(Key),
}

impl KeyInput {
    /// Whether this is the enter/return key.
    pub fn is_enter(&self) -> bool {
        matches!(self, Self::Special(Key::Enter))
    }
}

impl From<char> for KeyInput {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

impl From<Key> for KeyInput {
    fn from(key: Key) -> Self {
        Self::Special(key)
    }
}

/// Map a key name from a model response to a physical key.
///
/// Names are case-insensitive. Mac-style names map onto their portable
/// equivalents: `command` is the meta key, `option` is alt, `return` and
/// `enter` are the same key. A single character maps to itself.
pub fn map_key_name(name: &str) -> InputResult<KeyInput> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeyInput::Char(c.to_ascii_lowercase()));
    }

    let key = match trimmed.to_lowercase().as_str() {
        "command" | "cmd" | "meta" | "super" | "win" | "windows" => Key::Meta,
        "option" | "alt" | "opt" => Key::Alt,
        "control" | "ctrl" => Key::Control,
        "shift" => Key::Shift,
        "return" | "enter" => Key::Enter,
        "escape" | "esc" => Key::Escape,
        "space" | "spacebar" => Key::Space,
        "tab" => Key::Tab,
        "backspace" | "back" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "capslock" | "caps_lock" => Key::CapsLock,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "page_up" | "pgup" => Key::PageUp,
        "pagedown" | "page_down" | "pgdn" => Key::PageDown,
        "up" | "uparrow" | "arrowup" => Key::Up,
        "down" | "downarrow" | "arrowdown" => Key::Down,
        "left" | "leftarrow" | "arrowleft" => Key::Left,
        "right" | "rightarrow" | "arrowright" => Key::Right,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "" => return Err(InputError::InvalidKey("empty key name".to_string())),
        _ => return Err(InputError::InvalidKey(format!("Unknown key: {}", trimmed))),
    };

    Ok(KeyInput::Special(key))
}

/// Split a `+`-delimited combination such as `command+shift+s` and map
/// every token, preserving left-to-right order.
pub fn parse_key_combination(combo: &str) -> InputResult<Vec<KeyInput>> {
    if combo.trim().is_empty() {
        return Err(InputError::InvalidKey("Empty shortcut".to_string()));
    }
    // "command++" means command and the plus key
    if let Some(prefix) = combo.strip_suffix("++") {
        let mut keys = parse_key_combination(prefix)?;
        keys.push(KeyInput::Char('+'));
        return Ok(keys);
    }
    combo.split('+').map(map_key_name).collect()
}

// ============================================================================
// Mouse
// ============================================================================

/// Mouse button types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Ease-in-out curve used for animated pointer movement.
fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

fn interpolate(start: i32, end: i32, t: f64) -> i32 {
    (start as f64 + (end - start) as f64 * ease_in_out(t)).round() as i32
}

/// Move the pointer to the target over `duration`, at roughly 60 frames
/// per second. A zero duration jumps straight to the target.
pub async fn smooth_move<S: InputSimulator + ?Sized>(
    simulator: &S,
    target_x: i32,
    target_y: i32,
    duration: Duration,
) -> InputResult<()> {
    if duration.is_zero() {
        return simulator.mouse_move(target_x, target_y).await;
    }

    let (start_x, start_y) = simulator.mouse_position().await?;

    let step_ms = 16;
    let steps = (duration.as_millis() as u64 / step_ms).max(1) as u32;

    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        simulator
            .mouse_move(interpolate(start_x, target_x, t), interpolate(start_y, target_y, t))
            .await?;
        tokio::time::sleep(Duration::from_millis(step_ms)).await;
    }

    // Ensure we end exactly at the target
    simulator.mouse_move(target_x, target_y).await
}

// ============================================================================
// InputSimulator Trait
// ============================================================================

/// OS-level input injection.
#[async_trait]
pub trait InputSimulator: Send + Sync {
    /// Check if input simulation is available.
    fn is_available(&self) -> bool;

    /// Size of the main display in pixels.
    async fn screen_size(&self) -> InputResult<(u32, u32)>;

    /// Get the current pointer position.
    async fn mouse_position(&self) -> InputResult<(i32, i32)>;

    /// Move the pointer instantly.
    async fn mouse_move(&self, x: i32, y: i32) -> InputResult<()>;

    /// Press a mouse button at the current position.
    async fn button_down(&self, button: MouseButton) -> InputResult<()>;

    /// Release a mouse button at the current position.
    async fn button_up(&self, button: MouseButton) -> InputResult<()>;

    /// Click a mouse button at the current position.
    async fn click(&self, button: MouseButton) -> InputResult<()>;

    /// Scroll the wheel. Positive values scroll up, negative values down.
    async fn scroll(&self, clicks: i32) -> InputResult<()>;

    /// Hold a key down.
    async fn key_down(&self, key: KeyInput) -> InputResult<()>;

    /// Release a key.
    async fn key_up(&self, key: KeyInput) -> InputResult<()>;

    /// Type a single character.
    async fn type_char(&self, c: char) -> InputResult<()>;

    /// Animated pointer movement.
    async fn mouse_move_smooth(&self, x: i32, y: i32, duration: Duration) -> InputResult<()> {
        smooth_move(self, x, y, duration).await
    }
}

// ============================================================================
// Platform Implementation (Enigo)
// ============================================================================

/// Platform-specific input simulation using enigo.
#[cfg(feature = "gui-automation")]
pub mod platform {
    use super::*;
    use enigo::{
        Axis, Button, Coordinate, Direction, Enigo, Key as EnigoKey, Keyboard, Mouse, Settings,
    };
    use std::sync::Mutex as StdMutex;

    /// Enigo-based input simulator.
    pub struct EnigoSimulator {
        enigo: StdMutex<Enigo>,
    }

    impl EnigoSimulator {
        /// Create a new Enigo-based simulator.
        pub fn new() -> InputResult<Self> {
            let settings = Settings::default();
            let enigo = Enigo::new(&settings).map_err(|e| {
                InputError::PermissionDenied(format!(
                    "{} (grant accessibility permissions to this terminal)",
                    e
                ))
            })?;

            Ok(Self {
                enigo: StdMutex::new(enigo),
            })
        }

        fn with_enigo<T>(
            &self,
            f: impl FnOnce(&mut Enigo) -> Result<T, enigo::InputError>,
        ) -> InputResult<T> {
            let mut enigo = self.enigo.lock().map_err(|e| {
                InputError::SimulationFailed(format!("Failed to lock enigo: {}", e))
            })?;
            f(&mut enigo).map_err(|e| InputError::SimulationFailed(e.to_string()))
        }

        fn convert_key(key: KeyInput) -> EnigoKey {
            match key {
                KeyInput::Char(c) => EnigoKey::Unicode(c),
                KeyInput::Special(special) => match special {
                    Key::Meta => EnigoKey::Meta,
                    Key::Alt => EnigoKey::Alt,
                    Key::Control => EnigoKey::Control,
                    Key::Shift => EnigoKey::Shift,
                    Key::Enter => EnigoKey::Return,
                    Key::Escape => EnigoKey::Escape,
                    Key::Space => EnigoKey::Space,
                    Key::Tab => EnigoKey::Tab,
                    Key::Backspace => EnigoKey::Backspace,
                    Key::Delete => EnigoKey::Delete,
                    Key::CapsLock => EnigoKey::CapsLock,
                    Key::Home => EnigoKey::Home,
                    Key::End => EnigoKey::End,
                    Key::PageUp => EnigoKey::PageUp,
                    Key::PageDown => EnigoKey::PageDown,
                    Key::Up => EnigoKey::UpArrow,
                    Key::Down => EnigoKey::DownArrow,
                    Key::Left => EnigoKey::LeftArrow,
                    Key::Right => EnigoKey::RightArrow,
                    Key::F1 => EnigoKey::F1,
                    Key::F2 => EnigoKey::F2,
                    Key::F3 => EnigoKey::F3,
                    Key::F4 => EnigoKey::F4,
                    Key::F5 => EnigoKey::F5,
                    Key::F6 => EnigoKey::F6,
                    Key::F7 => EnigoKey::F7,
                    Key::F8 => EnigoKey::F8,
                    Key::F9 => EnigoKey::F9,
                    Key::F10 => EnigoKey::F10,
                    Key::F11 => EnigoKey::F11,
                    Key::F12 => EnigoKey::F12,
                },
            }
        }

        fn convert_button(button: MouseButton) -> Button {
            match button {
                MouseButton::Left => Button::Left,
                MouseButton::Right => Button::Right,
                MouseButton::Middle => Button::Middle,
            }
        }
    }

    #[async_trait]
    impl InputSimulator for EnigoSimulator {
        fn is_available(&self) -> bool {
            true
        }

        async fn screen_size(&self) -> InputResult<(u32, u32)> {
            let (w, h) = self.with_enigo(|e| e.main_display())?;
            Ok((w.max(0) as u32, h.max(0) as u32))
        }

        async fn mouse_position(&self) -> InputResult<(i32, i32)> {
            self.with_enigo(|e| e.location())
        }

        async fn mouse_move(&self, x: i32, y: i32) -> InputResult<()> {
            self.with_enigo(|e| e.move_mouse(x, y, Coordinate::Abs))
        }

        async fn button_down(&self, button: MouseButton) -> InputResult<()> {
            self.with_enigo(|e| e.button(Self::convert_button(button), Direction::Press))
        }

        async fn button_up(&self, button: MouseButton) -> InputResult<()> {
            self.with_enigo(|e| e.button(Self::convert_button(button), Direction::Release))
        }

        async fn click(&self, button: MouseButton) -> InputResult<()> {
            self.with_enigo(|e| e.button(Self::convert_button(button), Direction::Click))
        }

        async fn scroll(&self, clicks: i32) -> InputResult<()> {
            // enigo scrolls down for positive lengths
            self.with_enigo(|e| e.scroll(clicks.saturating_neg(), Axis::Vertical))
        }

        async fn key_down(&self, key: KeyInput) -> InputResult<()> {
            self.with_enigo(|e| e.key(Self::convert_key(key), Direction::Press))
        }

        async fn key_up(&self, key: KeyInput) -> InputResult<()> {
            self.with_enigo(|e| e.key(Self::convert_key(key), Direction::Release))
        }

        async fn type_char(&self, c: char) -> InputResult<()> {
            let mut buf = [0u8; 4];
            let text = c.encode_utf8(&mut buf);
            self.with_enigo(|e| e.text(text))
        }
    }
}

/// Create the default input simulator for the current platform.
#[cfg(feature = "gui-automation")]
pub fn create_input_simulator() -> InputResult<platform::EnigoSimulator> {
    platform::EnigoSimulator::new()
}

/// Without `gui-automation` there is no real input backend.
#[cfg(not(feature = "gui-automation"))]
pub fn create_input_simulator() -> InputResult<mock::MockSimulator> {
    Err(InputError::NotAvailable)
}

// ============================================================================
// Mock Implementation
// ============================================================================

/// Mock input simulator for testing and dry runs.
/// Always available, even when gui-automation is enabled.
pub mod mock {
    use super::*;
    use tokio::sync::{Mutex, RwLock};

    /// One recorded input call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum InputEvent {
        MouseMove { x: i32, y: i32 },
        ButtonDown(MouseButton),
        ButtonUp(MouseButton),
        Click(MouseButton),
        Scroll(i32),
        KeyDown(KeyInput),
        KeyUp(KeyInput),
        Char(char),
    }

    /// Mock input simulator that records calls but doesn't touch the OS.
    pub struct MockSimulator {
        position: RwLock<(i32, i32)>,
        screen: (u32, u32),
        events: Mutex<Vec<InputEvent>>,
        failing: RwLock<bool>,
    }

    impl MockSimulator {
        /// Create a mock with a 1920x1080 screen and the pointer at the origin.
        pub fn new() -> Self {
            Self::with_screen(1920, 1080)
        }

        /// Create a mock with a specific screen size.
        pub fn with_screen(width: u32, height: u32) -> Self {
            Self {
                position: RwLock::new((0, 0)),
                screen: (width, height),
                events: Mutex::new(Vec::new()),
                failing: RwLock::new(false),
            }
        }

        /// Make every subsequent call fail.
        pub async fn set_failing(&self, failing: bool) {
            *self.failing.write().await = failing;
        }

        /// Every recorded call, in order.
        pub async fn events(&self) -> Vec<InputEvent> {
            self.events.lock().await.clone()
        }

        /// Recorded calls without the intermediate pointer moves.
        pub async fn events_without_moves(&self) -> Vec<InputEvent> {
            self.events
                .lock()
                .await
                .iter()
                .filter(|e| !matches!(e, InputEvent::MouseMove { .. }))
                .cloned()
                .collect()
        }

        /// Text typed so far.
        pub async fn typed_text(&self) -> String {
            self.events
                .lock()
                .await
                .iter()
                .filter_map(|e| match e {
                    InputEvent::Char(c) => Some(*c),
                    _ => None,
                })
                .collect()
        }

        /// Forget recorded calls.
        pub async fn clear(&self) {
            self.events.lock().await.clear();
        }

        async fn record(&self, event: InputEvent) -> InputResult<()> {
            if *self.failing.read().await {
                return Err(InputError::SimulationFailed("mock failure".to_string()));
            }
            tracing::debug!(?event, "mock input");
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    impl Default for MockSimulator {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl InputSimulator for MockSimulator {
        fn is_available(&self) -> bool {
            true
        }

        async fn screen_size(&self) -> InputResult<(u32, u32)> {
            Ok(self.screen)
        }

        async fn mouse_position(&self) -> InputResult<(i32, i32)> {
            Ok(*self.position.read().await)
        }

        async fn mouse_move(&self, x: i32, y: i32) -> InputResult<()> {
            self.record(InputEvent::MouseMove { x, y }).await?;
            *self.position.write().await = (x, y);
            Ok(())
        }

        async fn button_down(&self, button: MouseButton) -> InputResult<()> {
            self.record(InputEvent::ButtonDown(button)).await
        }

        async fn button_up(&self, button: MouseButton) -> InputResult<()> {
            self.record(InputEvent::ButtonUp(button)).await
        }

        async fn click(&self, button: MouseButton) -> InputResult<()> {
            self.record(InputEvent::Click(button)).await
        }

        async fn scroll(&self, clicks: i32) -> InputResult<()> {
            self.record(InputEvent::Scroll(clicks)).await
        }

        async fn key_down(&self, key: KeyInput) -> InputResult<()> {
            self.record(InputEvent::KeyDown(key)).await
        }

        async fn key_up(&self, key: KeyInput) -> InputResult<()> {
            self.record(InputEvent::KeyUp(key)).await
        }

        async fn type_char(&self, c: char) -> InputResult<()> {
            self.record(InputEvent::Char(c)).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{InputEvent, MockSimulator};
    use super::*;

    #[test]
    fn test_map_mac_names() {
        assert_eq!(map_key_name("command").unwrap(), KeyInput::Special(Key::Meta));
        assert_eq!(map_key_name("Option").unwrap(), KeyInput::Special(Key::Alt));
        assert_eq!(map_key_name("control").unwrap(), KeyInput::Special(Key::Control));
        assert_eq!(map_key_name("esc").unwrap(), KeyInput::Special(Key::Escape));
    }

    #[test]
    fn test_return_and_enter_are_the_same_key() {
        assert_eq!(map_key_name("return").unwrap(), map_key_name("enter").unwrap());
        assert!(map_key_name("ENTER").unwrap().is_enter());
    }

    #[test]
    fn test_single_characters_map_to_themselves() {
        assert_eq!(map_key_name("a").unwrap(), KeyInput::Char('a'));
        assert_eq!(map_key_name("C").unwrap(), KeyInput::Char('c'));
        assert_eq!(map_key_name("`").unwrap(), KeyInput::Char('`'));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(matches!(map_key_name("hyper"), Err(InputError::InvalidKey(_))));
        assert!(matches!(map_key_name("  "), Err(InputError::InvalidKey(_))));
    }

    #[test]
    fn test_parse_combination_keeps_order() {
        let keys = parse_key_combination("command + shift + s").unwrap();
        assert_eq!(
            keys,
            vec![
                KeyInput::Special(Key::Meta),
                KeyInput::Special(Key::Shift),
                KeyInput::Char('s'),
            ]
        );
    }

    #[test]
    fn test_parse_combination_with_plus_key() {
        let keys = parse_key_combination("command++").unwrap();
        assert_eq!(keys, vec![KeyInput::Special(Key::Meta), KeyInput::Char('+')]);
    }

    #[test]
    fn test_parse_combination_rejects_empty_token() {
        assert!(parse_key_combination("").is_err());
        assert!(parse_key_combination("command+").is_err());
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(interpolate(0, 100, 0.0), 0);
        assert_eq!(interpolate(0, 100, 1.0), 100);
        assert_eq!(interpolate(100, 0, 0.5), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_smooth_move_ends_on_target() {
        let sim = MockSimulator::new();
        smooth_move(&sim, 300, 200, Duration::from_millis(160)).await.unwrap();

        assert_eq!(sim.mouse_position().await.unwrap(), (300, 200));
        let events = sim.events().await;
        assert!(events.len() > 2);
        assert_eq!(events.last(), Some(&InputEvent::MouseMove { x: 300, y: 200 }));
    }

    #[tokio::test]
    async fn test_smooth_move_zero_duration_jumps() {
        let sim = MockSimulator::new();
        smooth_move(&sim, 10, 20, Duration::ZERO).await.unwrap();
        assert_eq!(sim.events().await, vec![InputEvent::MouseMove { x: 10, y: 20 }]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let sim = MockSimulator::new();
        sim.set_failing(true).await;
        assert!(sim.click(MouseButton::Left).await.is_err());
        assert!(sim.events().await.is_empty());
    }
}
