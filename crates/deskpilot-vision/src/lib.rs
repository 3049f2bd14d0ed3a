//! # Deskpilot Vision
//!
//! Screen capture and synthetic input for Deskpilot.
//!
//! This crate is the only part of Deskpilot that touches the operating
//! system's display and input devices.
//!
//! ## Features
//!
//! - **Screen Capture**: Primary-display snapshots with pointer position,
//!   a highlight overlay and on-disk artifacts
//! - **Input Simulation**: Pointer, wheel and keyboard injection with
//!   animated movement and configurable settle delays
//! - **Key Mapping**: Portable names for the keys a model may ask for
//!
//! Real backends (xcap, enigo) are behind the default `gui-automation`
//! feature. The `mock` modules are always available and are what tests
//! and dry runs use.
//!
//! ```rust,no_run
//! use deskpilot_vision::input::mock::MockSimulator;
//! use deskpilot_vision::{map_key_name, InputSimulator};
//!
//! # async fn demo() -> deskpilot_vision::InputResult<()> {
//! let sim = MockSimulator::new();
//! let enter = map_key_name("return")?;
//! sim.key_down(enter).await?;
//! sim.key_up(enter).await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod input;

// Re-export main types
pub use capture::{
    draw_highlight, write_artifacts, CaptureError, CaptureResult, PointerPosition, Region,
    Resolution, ScreenCapture, ScreenInfo, ScreenSnapshot,
};
pub use config::{CaptureSettings, ImageEncoding, TimingConfig};
pub use input::{
    map_key_name, parse_key_combination, smooth_move, InputError, InputResult, InputSimulator,
    Key, KeyInput, MouseButton,
};

use thiserror::Error;

/// Main error type for the vision crate.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Screen capture failed: {0}")]
    CaptureError(#[from] CaptureError),

    #[error("Input error: {0}")]
    InputError(#[from] InputError),
}

/// Result type for the vision crate.
pub type Result<T> = std::result::Result<T, VisionError>;
