//! Interactive selection of the capture rectangle.

use anyhow::{anyhow, Context, Result};
use std::fmt;

use super::backend::ScreenAutomation;
use crate::config::AppConfig;
use crate::interrupt::Pacer;

/// Screen rectangle sampled on every capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// X of the top-left corner, in screen coordinates
    pub x: i32,
    /// Y of the top-left corner, in screen coordinates
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Builds the rectangle spanned by two opposite corners, in either order.
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: a.0.abs_diff(b.0),
            height: a.1.abs_diff(b.1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) {}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Counts down, then reads the cursor.
fn sample_cursor(
    backend: &mut dyn ScreenAutomation,
    pacer: &Pacer,
    countdown_secs: u64,
) -> Result<(i32, i32)> {
    pacer.countdown(countdown_secs)?;
    backend
        .cursor_position()
        .context("Failed to read the cursor position")
}

/// Asks the user to point at two opposite corners and returns the rectangle between them.
///
/// The corners may be given in any order. A rectangle with no area is an error.
pub fn select_region(
    backend: &mut dyn ScreenAutomation,
    pacer: &Pacer,
    config: &AppConfig,
) -> Result<Region> {
    println!("Move the cursor to the top-left corner of the area to capture");
    let first = sample_cursor(backend, pacer, config.countdown_secs)?;
    crate::log(&format!("First corner set to ({}, {})", first.0, first.1));

    println!("Move the cursor to the bottom-right corner of the area to capture");
    let second = sample_cursor(backend, pacer, config.countdown_secs)?;
    crate::log(&format!("Second corner set to ({}, {})", second.0, second.1));

    let region = Region::from_corners(first, second);
    if region.is_empty() {
        return Err(anyhow!(
            "Selected area {} has no width or height. Pick two different corners.",
            region
        ));
    }

    crate::log(&format!("Capture region: {}", region));
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::backend::fake::FakeScreen;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_from_corners_top_left_first() {
        let region = Region::from_corners((10, 20), (110, 220));
        assert_eq!(
            region,
            Region {
                x: 10,
                y: 20,
                width: 100,
                height: 200
            }
        );
    }

    #[test]
    fn test_from_corners_any_order() {
        let expected = Region::from_corners((10, 20), (110, 220));
        assert_eq!(Region::from_corners((110, 220), (10, 20)), expected);
        // Top-right then bottom-left
        assert_eq!(Region::from_corners((110, 20), (10, 220)), expected);
        assert_eq!(Region::from_corners((10, 220), (110, 20)), expected);
    }

    #[test]
    fn test_from_corners_is_normalized() {
        let points = [-1500, -3, 0, 7, 42, 1919];
        for &ax in &points {
            for &ay in &points {
                for &bx in &points {
                    for &by in &points {
                        let r = Region::from_corners((ax, ay), (bx, by));
                        assert_eq!(r.x, ax.min(bx));
                        assert_eq!(r.y, ay.min(by));
                        assert_eq!(r.x as i64 + r.width as i64, ax.max(bx) as i64);
                        assert_eq!(r.y as i64 + r.height as i64, ay.max(by) as i64);
                    }
                }
            }
        }
    }

    #[test]
    fn test_select_region_normalizes() {
        let mut screen = FakeScreen::with_cursor(&[(800, 600), (200, 100)]);
        let stop = AtomicBool::new(false);

        let region =
            select_region(&mut screen, &Pacer::new(&stop), &AppConfig::instant()).unwrap();
        assert_eq!(
            region,
            Region {
                x: 200,
                y: 100,
                width: 600,
                height: 500
            }
        );
    }

    #[test]
    fn test_select_region_rejects_empty_area() {
        let mut screen = FakeScreen::with_cursor(&[(300, 100), (300, 400)]);
        let stop = AtomicBool::new(false);

        let result = select_region(&mut screen, &Pacer::new(&stop), &AppConfig::instant());
        assert!(result.is_err());
    }

    #[test]
    fn test_select_region_without_pointer_fails() {
        let mut screen = FakeScreen::default();
        let stop = AtomicBool::new(false);

        let result = select_region(&mut screen, &Pacer::new(&stop), &AppConfig::instant());
        assert!(result.is_err());
    }
}
