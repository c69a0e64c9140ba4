//! The desktop primitives the capture stages rely on.

use anyhow::Result;
use clap::ValueEnum;
use image::RgbaImage;
use std::fmt;
use std::time::Duration;

use super::region::Region;

/// Key that turns the page in the viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PageKey {
    Left,
    #[default]
    Right,
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKey::Left => write!(f, "left"),
            PageKey::Right => write!(f, "right"),
        }
    }
}

/// Cursor, screen and keyboard access.
///
/// The real implementation talks to the OS; tests substitute a fake.
pub trait ScreenAutomation {
    /// Current cursor position in screen coordinates.
    fn cursor_position(&mut self) -> Result<(i32, i32)>;

    /// Grabs the pixels inside `region`.
    fn take_screenshot(&mut self, region: &Region) -> Result<RgbaImage>;

    /// Presses and releases `key`, holding it for `hold` in between.
    /// Delivered to whichever window has focus.
    fn send_key_pulse(&mut self, key: PageKey, hold: Duration) -> Result<()>;
}

/// Returns the platform backend.
#[cfg(windows)]
pub fn default_backend() -> Result<Box<dyn ScreenAutomation>> {
    Ok(Box::new(super::windows::WindowsScreen::new()?))
}

/// Returns the platform backend.
///
/// Only Windows has one; elsewhere this fails immediately.
#[cfg(not(windows))]
pub fn default_backend() -> Result<Box<dyn ScreenAutomation>> {
    Err(crate::error::PipelineError::CaptureUnavailable(format!(
        "no cursor/screen/keyboard backend for {}",
        std::env::consts::OS
    ))
    .into())
}
