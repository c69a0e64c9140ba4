//! The page-by-page capture loop.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::backend::{PageKey, ScreenAutomation};
use super::region::Region;
use crate::config::AppConfig;
use crate::interrupt::Pacer;
use crate::paths::image_path;

/// What to capture and where to put it.
#[derive(Clone, Debug)]
pub struct CaptureJob<'a> {
    pub output_dir: &'a Path,
    pub start_page: u32,
    pub end_page: u32,
    pub chapter: Option<&'a str>,
    pub key: PageKey,
}

/// Captures every page in `start_page..=end_page`.
///
/// For each page: grab the region, save it as PNG, press the page key and wait
/// for the viewer to render the next page. Whether the page actually turned is
/// not verified. Any capture or save failure stops the run.
///
/// Returns the saved image paths in page order.
pub fn capture_pages(
    backend: &mut dyn ScreenAutomation,
    pacer: &Pacer,
    config: &AppConfig,
    job: &CaptureJob,
    region: &Region,
) -> Result<Vec<PathBuf>> {
    crate::log(&format!("Capture region: {}", region));

    println!("Click the window you want to capture");
    pacer.countdown(config.window_select_secs)?;

    let total = job.end_page.saturating_sub(job.start_page) as usize + 1;
    let mut saved = Vec::with_capacity(total);

    crate::log("Starting capture...");
    for (index, page) in (job.start_page..=job.end_page).enumerate() {
        pacer.check()?;

        let path = image_path(job.output_dir, page, job.chapter);
        let shot = backend
            .take_screenshot(region)
            .with_context(|| format!("Failed to capture page {}", page))?;
        shot.save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        crate::log(&format!("[{}/{}] Saved {}", index + 1, total, path.display()));
        saved.push(path);

        backend
            .send_key_pulse(job.key, config.key_hold())
            .with_context(|| format!("Failed to send {} key", job.key))?;
        pacer.sleep(config.shot_interval())?;
    }

    crate::log(&format!(
        "Saved {} images to {}",
        saved.len(),
        crate::paths::image_dir(job.output_dir).display()
    ));
    Ok(saved)
}
