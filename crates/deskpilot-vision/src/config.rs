//! Configuration for screen capture and input pacing.
//!
//! This module provides:
//! - Capture settings (artifact directory, highlight overlay)
//! - Timing configuration for synthetic input (animation, settle, key holds)
//! - Image encodings requested by model providers

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Image encoding used when a snapshot is sent to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ImageEncoding {
    /// The captured PNG, untouched
    Png,
    /// Thumbnailed and recompressed JPEG
    Jpeg {
        /// Longest side after thumbnailing
        max_dimension: u32,
        /// JPEG quality (1-100)
        quality: u8,
    },
}

impl ImageEncoding {
    /// Get the MIME type for this encoding.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }
}

/// Capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Directory the screenshot and its metadata are written to.
    /// Overwritten on every capture.
    pub artifact_dir: PathBuf,
    /// Highlight border colour (RGBA)
    pub highlight_color: [u8; 4],
    /// Highlight border thickness in pixels
    pub highlight_thickness: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            artifact_dir: std::env::temp_dir().join("deskpilot"),
            highlight_color: [0, 120, 255, 255],
            highlight_thickness: 3,
        }
    }
}

impl CaptureSettings {
    /// Path of the PNG artifact.
    pub fn screenshot_path(&self) -> PathBuf {
        self.artifact_dir.join("current_screen.png")
    }

    /// Path of the JSON metadata artifact.
    pub fn info_path(&self) -> PathBuf {
        self.artifact_dir.join("screen_info.json")
    }

    /// Use a different artifact directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }
}

/// Timing configuration for input simulation.
///
/// Every delay here is a settle delay: the target application needs time
/// to react to one synthetic event before the next one arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Animated pointer transition for click/move
    pub pointer_move: Duration,
    /// Animated pointer transition while dragging
    pub drag_move: Duration,
    /// Pause after a pointer action completes
    pub settle: Duration,
    /// How long a single key is held down
    pub key_hold: Duration,
    /// How long enter/return is held down
    pub enter_hold: Duration,
    /// Gap between keys of a hotkey, on press and on release
    pub hotkey_gap: Duration,
    /// Gap between typed characters
    pub typing_interval: Duration,
    /// How long a highlight stays before typing starts
    pub highlight_hold: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pointer_move: Duration::from_millis(500),
            drag_move: Duration::from_millis(1000),
            settle: Duration::from_millis(200),
            key_hold: Duration::from_millis(200),
            enter_hold: Duration::from_millis(300),
            hotkey_gap: Duration::from_millis(100),
            typing_interval: Duration::from_millis(100),
            highlight_hold: Duration::ZERO,
        }
    }
}

impl TimingConfig {
    /// Timing with every delay set to zero. Used by dry runs and tests.
    pub fn instant() -> Self {
        Self {
            pointer_move: Duration::ZERO,
            drag_move: Duration::ZERO,
            settle: Duration::ZERO,
            key_hold: Duration::ZERO,
            enter_hold: Duration::ZERO,
            hotkey_gap: Duration::ZERO,
            typing_interval: Duration::ZERO,
            highlight_hold: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capture_paths() {
        let settings = CaptureSettings::default().with_artifact_dir("/tmp/dp");
        assert_eq!(settings.screenshot_path(), PathBuf::from("/tmp/dp/current_screen.png"));
        assert_eq!(settings.info_path(), PathBuf::from("/tmp/dp/screen_info.json"));
        assert_eq!(settings.highlight_color, [0, 120, 255, 255]);
    }

    #[test]
    fn test_enter_hold_is_longer() {
        let timing = TimingConfig::default();
        assert!(timing.enter_hold > timing.key_hold);
    }

    #[test]
    fn test_image_encoding_mime() {
        assert_eq!(ImageEncoding::Png.mime_type(), "image/png");
        let jpeg = ImageEncoding::Jpeg { max_dimension: 800, quality: 85 };
        assert_eq!(jpeg.mime_type(), "image/jpeg");
    }
}
