//! Screen capture.
//!
//! This module provides:
//! - Platform-abstracted screen capture via the `ScreenCapture` trait
//! - Screen snapshots carrying the pointer position and display size
//! - A highlight overlay drawn into subsequent captures
//! - On-disk artifacts (`current_screen.png`, `screen_info.json`)
//! - Image encoding for model providers

use crate::config::{CaptureSettings, ImageEncoding};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during screen capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Screen capture not available on this platform")]
    NotAvailable,

    #[error("Failed to capture screen: {0}")]
    CaptureFailed(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Image encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Failed to write capture artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// A rectangular region on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// X coordinate of the top-left corner
    pub x: i32,
    /// Y coordinate of the top-left corner
    pub y: i32,
    /// Width of the region
    pub width: u32,
    /// Height of the region
    pub height: u32,
}

impl Region {
    /// Create a new region.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region of a text field around a point. Used to mark where typing goes.
    pub fn around_point(x: i32, y: i32) -> Self {
        Self::new(x - 50, y - 10, 100, 20)
    }

    /// Check if this region is valid (has positive dimensions).
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Check if a point is within this region.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

/// Metadata written next to the screenshot artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub screen_resolution: Resolution,
    pub mouse_position: PointerPosition,
    pub active_highlight: Option<Region>,
}

/// One capture of the primary display.
#[derive(Debug, Clone)]
pub struct ScreenSnapshot {
    /// The captured image, with any active highlight drawn in
    pub image: DynamicImage,
    /// Where the PNG artifact was written, if it was
    pub path: Option<PathBuf>,
    /// Pointer position at capture time
    pub pointer: PointerPosition,
    /// Highlight drawn into this image
    pub active_highlight: Option<Region>,
    pub captured_at: DateTime<Utc>,
}

impl ScreenSnapshot {
    /// Create a snapshot from an image.
    pub fn new(image: DynamicImage, pointer_x: i32, pointer_y: i32) -> Self {
        Self {
            image,
            path: None,
            pointer: PointerPosition {
                x: pointer_x,
                y: pointer_y,
            },
            active_highlight: None,
            captured_at: Utc::now(),
        }
    }

    /// Create a blank snapshot of a given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(DynamicImage::ImageRgba8(RgbaImage::new(width, height)), 0, 0)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Display size as (width, height).
    pub fn bounds(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Metadata for this snapshot.
    pub fn info(&self) -> ScreenInfo {
        ScreenInfo {
            screen_resolution: Resolution {
                width: self.width(),
                height: self.height(),
            },
            mouse_position: self.pointer,
            active_highlight: self.active_highlight,
        }
    }

    /// Encode the image for transmission to a model.
    pub fn encode(&self, encoding: ImageEncoding) -> CaptureResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());

        match encoding {
            ImageEncoding::Png => {
                self.image
                    .write_to(&mut buffer, image::ImageFormat::Png)
                    .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
            }
            ImageEncoding::Jpeg {
                max_dimension,
                quality,
            } => {
                let image = if self.width() > max_dimension || self.height() > max_dimension {
                    self.image.thumbnail(max_dimension, max_dimension)
                } else {
                    self.image.clone()
                };
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
            }
        }

        Ok(buffer.into_inner())
    }

    /// Encode to base64 for API transmission.
    pub fn to_base64(&self, encoding: ImageEncoding) -> CaptureResult<String> {
        let bytes = self.encode(encoding)?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &bytes,
        ))
    }
}

/// Draw a rectangular border into an image, clipped to the image bounds.
pub fn draw_highlight(image: &mut RgbaImage, region: Region, color: [u8; 4], thickness: u32) {
    if !region.is_valid() || thickness == 0 {
        return;
    }

    let (img_w, img_h) = (image.width() as i64, image.height() as i64);
    let left = region.x as i64;
    let top = region.y as i64;
    let right = left + region.width as i64 - 1;
    let bottom = top + region.height as i64 - 1;
    let t = thickness as i64;

    for y in top.max(0)..=bottom.min(img_h - 1) {
        for x in left.max(0)..=right.min(img_w - 1) {
            let on_border =
                x < left + t || x > right - t || y < top + t || y > bottom - t;
            if on_border {
                image.put_pixel(x as u32, y as u32, Rgba(color));
            }
        }
    }
}

/// Write `current_screen.png` and `screen_info.json`, replacing any
/// previous capture. Returns the screenshot path.
pub fn write_artifacts(
    snapshot: &ScreenSnapshot,
    settings: &CaptureSettings,
) -> CaptureResult<PathBuf> {
    std::fs::create_dir_all(&settings.artifact_dir)?;

    let path = settings.screenshot_path();
    let png = snapshot.encode(ImageEncoding::Png)?;
    std::fs::write(&path, png)?;

    let info = serde_json::to_string_pretty(&snapshot.info())
        .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
    std::fs::write(settings.info_path(), info)?;

    Ok(path)
}

/// Read the metadata artifact back.
pub fn read_screen_info(path: &Path) -> CaptureResult<ScreenInfo> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CaptureError::EncodingFailed(e.to_string()))
}

/// Trait for platform-specific screen capture implementations.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Check if screen capture is available on this platform.
    fn is_available(&self) -> bool;

    /// Capture the primary display.
    async fn capture(&self) -> CaptureResult<ScreenSnapshot>;

    /// Draw a border around a region in subsequent captures.
    async fn highlight_region(&self, region: Region) -> CaptureResult<()>;

    /// Remove the highlight.
    async fn clear_highlight(&self) -> CaptureResult<()>;

    /// Bounds of the focused window, when the platform can tell.
    async fn active_window_region(&self) -> CaptureResult<Option<Region>> {
        Ok(None)
    }
}

/// Platform-specific screen capture implementation using xcap.
#[cfg(feature = "gui-automation")]
pub mod platform {
    use super::*;
    use crate::input::InputSimulator;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Cross-platform screen capture implementation using xcap.
    pub struct XcapCapture {
        settings: CaptureSettings,
        input: Arc<dyn InputSimulator>,
        highlight: Mutex<Option<Region>>,
    }

    impl XcapCapture {
        /// Create a new xcap-based capture. The input simulator reports
        /// the pointer position recorded with each snapshot.
        pub fn new(settings: CaptureSettings, input: Arc<dyn InputSimulator>) -> Self {
            Self {
                settings,
                input,
                highlight: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ScreenCapture for XcapCapture {
        fn is_available(&self) -> bool {
            xcap::Monitor::all()
                .map(|monitors| !monitors.is_empty())
                .unwrap_or(false)
        }

        async fn capture(&self) -> CaptureResult<ScreenSnapshot> {
            let highlight = *self.highlight.lock().await;
            let (px, py) = match self.input.mouse_position().await {
                Ok(pos) => pos,
                Err(e) => {
                    tracing::warn!("Could not read pointer position: {}", e);
                    (0, 0)
                }
            };

            // Monitor handles are not Send on every platform; no await below.
            let mut image = xcap::Monitor::from_point(0, 0)
                .and_then(|monitor| monitor.capture_image())
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

            if let Some(region) = highlight {
                draw_highlight(
                    &mut image,
                    region,
                    self.settings.highlight_color,
                    self.settings.highlight_thickness,
                );
            }

            let mut snapshot = ScreenSnapshot::new(DynamicImage::ImageRgba8(image), px, py);
            snapshot.active_highlight = highlight;
            snapshot.path = Some(write_artifacts(&snapshot, &self.settings)?);

            tracing::debug!(
                width = snapshot.width(),
                height = snapshot.height(),
                "Captured screen"
            );
            Ok(snapshot)
        }

        async fn highlight_region(&self, region: Region) -> CaptureResult<()> {
            if !region.is_valid() {
                return Err(CaptureError::InvalidRegion(
                    "Region must have positive dimensions".to_string(),
                ));
            }
            *self.highlight.lock().await = Some(region);
            Ok(())
        }

        async fn clear_highlight(&self) -> CaptureResult<()> {
            *self.highlight.lock().await = None;
            Ok(())
        }

        async fn active_window_region(&self) -> CaptureResult<Option<Region>> {
            let windows = xcap::Window::all()
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

            Ok(windows
                .into_iter()
                .filter(|w| !w.is_minimized().unwrap_or(true))
                .find(|w| w.is_focused().unwrap_or(false))
                .and_then(|w| {
                    Some(Region::new(
                        w.x().ok()?,
                        w.y().ok()?,
                        w.width().ok()?,
                        w.height().ok()?,
                    ))
                }))
        }
    }
}

/// Create the default screen capture implementation for the current platform.
#[cfg(feature = "gui-automation")]
pub fn create_screen_capture(
    settings: CaptureSettings,
    input: std::sync::Arc<dyn crate::input::InputSimulator>,
) -> platform::XcapCapture {
    platform::XcapCapture::new(settings, input)
}

/// Without `gui-automation` every capture fails.
#[cfg(not(feature = "gui-automation"))]
pub fn create_screen_capture(
    _settings: CaptureSettings,
    _input: std::sync::Arc<dyn crate::input::InputSimulator>,
) -> mock::MockCapture {
    mock::MockCapture::unavailable()
}

/// Mock screen capture for tests and dry runs.
pub mod mock {
    use super::*;
    use tokio::sync::Mutex;

    /// Mock capture returning a blank image of a fixed size.
    pub struct MockCapture {
        width: u32,
        height: u32,
        pointer: (i32, i32),
        available: bool,
        highlight: Mutex<Option<Region>>,
        captures: Mutex<usize>,
    }

    impl MockCapture {
        /// A working mock of the given display size.
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pointer: (0, 0),
                available: true,
                highlight: Mutex::new(None),
                captures: Mutex::new(0),
            }
        }

        /// A mock whose every capture fails.
        pub fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::new(0, 0)
            }
        }

        pub fn with_pointer(mut self, x: i32, y: i32) -> Self {
            self.pointer = (x, y);
            self
        }

        /// Number of successful captures so far.
        pub async fn capture_count(&self) -> usize {
            *self.captures.lock().await
        }

        /// The current highlight.
        pub async fn highlight(&self) -> Option<Region> {
            *self.highlight.lock().await
        }
    }

    #[async_trait]
    impl ScreenCapture for MockCapture {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn capture(&self) -> CaptureResult<ScreenSnapshot> {
            if !self.available {
                return Err(CaptureError::NotAvailable);
            }
            *self.captures.lock().await += 1;

            let mut snapshot = ScreenSnapshot::blank(self.width, self.height);
            snapshot.pointer = PointerPosition {
                x: self.pointer.0,
                y: self.pointer.1,
            };
            snapshot.active_highlight = *self.highlight.lock().await;
            Ok(snapshot)
        }

        async fn highlight_region(&self, region: Region) -> CaptureResult<()> {
            if !self.available {
                return Err(CaptureError::NotAvailable);
            }
            *self.highlight.lock().await = Some(region);
            Ok(())
        }

        async fn clear_highlight(&self) -> CaptureResult<()> {
            *self.highlight.lock().await = None;
            Ok(())
        }
    }
}
