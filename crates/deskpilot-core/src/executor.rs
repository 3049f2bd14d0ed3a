//! Action execution.
//!
//! Turns a validated [`Action`] into synthetic input. Each action finishes
//! with a settle delay so the target application can catch up before the
//! next one.

use crate::Action;
use async_trait::async_trait;
use deskpilot_vision::{
    map_key_name, parse_key_combination, InputError, InputSimulator, KeyInput, MouseButton,
    Region, ScreenCapture, TimingConfig,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("unknown key '{name}': {source}")]
    UnknownKey {
        name: String,
        #[source]
        source: InputError,
    },

    #[error("input injection failed: {0}")]
    Input(#[from] InputError),
}

/// Performs one action against the desktop.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn perform(&self, action: &Action) -> Result<(), ActionError>;
}

/// Executor backed by an [`InputSimulator`].
pub struct InputActionExecutor {
    input: Arc<dyn InputSimulator>,
    /// Used for best-effort highlights only
    capture: Option<Arc<dyn ScreenCapture>>,
    timing: TimingConfig,
}

impl InputActionExecutor {
    pub fn new(input: Arc<dyn InputSimulator>, timing: TimingConfig) -> Self {
        Self {
            input,
            capture: None,
            timing,
        }
    }

    pub fn with_capture(mut self, capture: Arc<dyn ScreenCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    async fn pause(duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    async fn click(&self, x: i32, y: i32) -> Result<(), ActionError> {
        if self.input.mouse_position().await? != (x, y) {
            self.input
                .mouse_move_smooth(x, y, self.timing.pointer_move)
                .await?;
        }
        self.input.click(MouseButton::Left).await?;
        Ok(())
    }

    async fn drag(&self, x: i32, y: i32) -> Result<(), ActionError> {
        self.input.button_down(MouseButton::Left).await?;
        let moved = self.input.mouse_move_smooth(x, y, self.timing.drag_move).await;
        // Never leave the button held
        let released = self.input.button_up(MouseButton::Left).await;
        moved?;
        released?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), ActionError> {
        let highlighted = self.highlight_input_field().await;
        if highlighted {
            Self::pause(self.timing.highlight_hold).await;
        }

        let result = self.type_chars(text).await;

        if highlighted {
            self.clear_highlight().await;
        }
        result
    }

    async fn type_chars(&self, text: &str) -> Result<(), ActionError> {
        for c in text.chars() {
            self.input.type_char(c).await?;
            Self::pause(self.timing.typing_interval).await;
        }
        Ok(())
    }

    async fn press(&self, name: &str) -> Result<(), ActionError> {
        let key = map_key_name(name).map_err(|source| ActionError::UnknownKey {
            name: name.to_string(),
            source,
        })?;
        let hold = if key.is_enter() {
            self.timing.enter_hold
        } else {
            self.timing.key_hold
        };

        self.input.key_down(key).await?;
        Self::pause(hold).await;
        self.input.key_up(key).await?;
        Ok(())
    }

    async fn hotkey(&self, combo: &str) -> Result<(), ActionError> {
        let keys = parse_key_combination(combo).map_err(|source| ActionError::UnknownKey {
            name: combo.to_string(),
            source,
        })?;

        let highlighted = self.highlight_active_window().await;
        let result = self.press_chord(&keys).await;
        if highlighted {
            self.clear_highlight().await;
        }
        result
    }

    /// Press keys left to right, release right to left.
    async fn press_chord(&self, keys: &[KeyInput]) -> Result<(), ActionError> {
        let mut pressed: Vec<KeyInput> = Vec::with_capacity(keys.len());
        let mut failure = None;

        for key in keys {
            match self.input.key_down(*key).await {
                Ok(()) => pressed.push(*key),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
            Self::pause(self.timing.hotkey_gap).await;
        }

        for key in pressed.iter().rev() {
            if let Err(e) = self.input.key_up(*key).await {
                failure.get_or_insert(e);
            }
            Self::pause(self.timing.hotkey_gap).await;
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn highlight_input_field(&self) -> bool {
        let Some(capture) = &self.capture else {
            return false;
        };
        let region = match self.input.mouse_position().await {
            Ok((x, y)) => Region::around_point(x, y),
            Err(e) => {
                warn!("Skipping input highlight: {}", e);
                return false;
            }
        };
        match capture.highlight_region(region).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not highlight input field: {}", e);
                false
            }
        }
    }

    async fn highlight_active_window(&self) -> bool {
        let Some(capture) = &self.capture else {
            return false;
        };
        match capture.active_window_region().await {
            Ok(Some(region)) => capture.highlight_region(region).await.is_ok(),
            Ok(None) => false,
            Err(e) => {
                debug!("No active window context: {}", e);
                false
            }
        }
    }

    async fn clear_highlight(&self) {
        if let Some(capture) = &self.capture {
            if let Err(e) = capture.clear_highlight().await {
                warn!("Could not clear highlight: {}", e);
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for InputActionExecutor {
    async fn perform(&self, action: &Action) -> Result<(), ActionError> {
        debug!(?action, "Performing action");

        match action {
            Action::Move { x, y } => {
                self.input
                    .mouse_move_smooth(*x, *y, self.timing.pointer_move)
                    .await?;
                Self::pause(self.timing.settle).await;
            }
            Action::Click { x, y } => {
                self.click(*x, *y).await?;
                Self::pause(self.timing.settle).await;
            }
            Action::Drag { x, y } => {
                self.drag(*x, *y).await?;
                Self::pause(self.timing.settle).await;
            }
            Action::Scroll { amount } => {
                self.input.scroll(*amount).await?;
                Self::pause(self.timing.settle).await;
            }
            Action::Type { text } => self.type_text(text).await?,
            Action::Press { key } => self.press(key).await?,
            Action::Hotkey { combo } => self.hotkey(combo).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_vision::capture::mock::MockCapture;
    use deskpilot_vision::input::mock::{InputEvent, MockSimulator};
    use deskpilot_vision::Key;

    fn executor(sim: &Arc<MockSimulator>) -> InputActionExecutor {
        InputActionExecutor::new(sim.clone(), TimingConfig::instant())
    }

    #[tokio::test]
    async fn test_click_moves_then_clicks() {
        let sim = Arc::new(MockSimulator::new());
        executor(&sim)
            .perform(&Action::Click { x: 40, y: 50 })
            .await
            .unwrap();

        assert_eq!(
            sim.events().await,
            vec![
                InputEvent::MouseMove { x: 40, y: 50 },
                InputEvent::Click(MouseButton::Left),
            ]
        );
    }

    #[tokio::test]
    async fn test_click_in_place_does_not_move() {
        let sim = Arc::new(MockSimulator::new());
        sim.mouse_move(7, 8).await.unwrap();
        sim.clear().await;

        executor(&sim)
            .perform(&Action::Click { x: 7, y: 8 })
            .await
            .unwrap();
        assert_eq!(sim.events().await, vec![InputEvent::Click(MouseButton::Left)]);
    }

    #[tokio::test]
    async fn test_drag_holds_button() {
        let sim = Arc::new(MockSimulator::new());
        executor(&sim)
            .perform(&Action::Drag { x: 300, y: 400 })
            .await
            .unwrap();

        assert_eq!(
            sim.events().await,
            vec![
                InputEvent::ButtonDown(MouseButton::Left),
                InputEvent::MouseMove { x: 300, y: 400 },
                InputEvent::ButtonUp(MouseButton::Left),
            ]
        );
    }

    #[tokio::test]
    async fn test_scroll_passes_sign_through() {
        let sim = Arc::new(MockSimulator::new());
        executor(&sim)
            .perform(&Action::Scroll { amount: -5 })
            .await
            .unwrap();
        assert_eq!(sim.events().await, vec![InputEvent::Scroll(-5)]);
    }

    #[tokio::test]
    async fn test_type_is_character_paced() {
        let sim = Arc::new(MockSimulator::new());
        executor(&sim)
            .perform(&Action::Type {
                text: "hi!".into(),
            })
            .await
            .unwrap();

        assert_eq!(
            sim.events().await,
            vec![
                InputEvent::Char('h'),
                InputEvent::Char('i'),
                InputEvent::Char('!'),
            ]
        );
    }

    #[tokio::test]
    async fn test_type_highlight_is_best_effort() {
        let sim = Arc::new(MockSimulator::new());
        let capture = Arc::new(MockCapture::unavailable());
        let exec = executor(&sim).with_capture(capture);

        exec.perform(&Action::Type { text: "ok".into() })
            .await
            .unwrap();
        assert_eq!(sim.typed_text().await, "ok");
    }

    #[tokio::test]
    async fn test_type_highlights_then_clears() {
        let sim = Arc::new(MockSimulator::new());
        sim.mouse_move(500, 300).await.unwrap();
        let capture = Arc::new(MockCapture::new(1920, 1080));
        let exec = executor(&sim).with_capture(capture.clone());

        exec.perform(&Action::Type { text: "x".into() })
            .await
            .unwrap();
        assert!(capture.highlight().await.is_none());
    }

    #[tokio::test]
    async fn test_press_maps_key_names() {
        let sim = Arc::new(MockSimulator::new());
        executor(&sim)
            .perform(&Action::Press {
                key: "return".into(),
            })
            .await
            .unwrap();

        let enter = KeyInput::Special(Key::Enter);
        assert_eq!(
            sim.events().await,
            vec![InputEvent::KeyDown(enter), InputEvent::KeyUp(enter)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_is_held_longer() {
        let sim = Arc::new(MockSimulator::new());
        let timing = TimingConfig::default();
        let exec = InputActionExecutor::new(sim.clone(), timing.clone());

        let start = tokio::time::Instant::now();
        exec.perform(&Action::Press { key: "a".into() }).await.unwrap();
        assert_eq!(start.elapsed(), timing.key_hold);

        let start = tokio::time::Instant::now();
        exec.perform(&Action::Press {
            key: "enter".into(),
        })
        .await
        .unwrap();
        assert_eq!(start.elapsed(), timing.enter_hold);
    }

    #[tokio::test]
    async fn test_unknown_key_fails() {
        let sim = Arc::new(MockSimulator::new());
        let err = executor(&sim)
            .perform(&Action::Press {
                key: "hyperdrive".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::UnknownKey { .. }));
        assert!(sim.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_hotkey_releases_in_reverse() {
        let sim = Arc::new(MockSimulator::new());
        executor(&sim)
            .perform(&Action::Hotkey {
                combo: "command+shift+4".into(),
            })
            .await
            .unwrap();

        let meta = KeyInput::Special(Key::Meta);
        let shift = KeyInput::Special(Key::Shift);
        let four = KeyInput::Char('4');
        assert_eq!(
            sim.events().await,
            vec![
                InputEvent::KeyDown(meta),
                InputEvent::KeyDown(shift),
                InputEvent::KeyDown(four),
                InputEvent::KeyUp(four),
                InputEvent::KeyUp(shift),
                InputEvent::KeyUp(meta),
            ]
        );
    }

    #[tokio::test]
    async fn test_input_failure_is_reported() {
        let sim = Arc::new(MockSimulator::new());
        sim.set_failing(true).await;

        let err = executor(&sim)
            .perform(&Action::Scroll { amount: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Input(_)));
    }
}
