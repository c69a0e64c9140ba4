//! Binding saved screenshots into one PDF.
//!
//! Two ways to pick the images:
//! - Range mode walks the same `start..=end` pages the capture used
//! - Scan mode takes every PNG in the image directory, ordered by page number
//!
//! A page that is missing or cannot be decoded is logged and skipped.
//! Failing to write the PDF is fatal. A stop request is honoured between
//! pages and before the write, in which case no PDF is produced.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::document::{PageLayout, PdfDocument};
use super::scan::scan_images;
use crate::config::PageGeometry;
use crate::error::PipelineError;
use crate::interrupt::Pacer;
use crate::paths::{image_dir, image_path, pdf_path};

/// Outcome of an assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    pub pdf_path: PathBuf,
    pub pages_added: usize,
    /// Images that were expected but could not be used
    pub skipped: Vec<PathBuf>,
}

/// Adds `path` as a page, or records it as skipped.
fn add_image<D: PdfDocument>(
    doc: &mut D,
    path: &Path,
    layout: PageLayout,
    skipped: &mut Vec<PathBuf>,
) {
    if !path.exists() {
        crate::log(&format!("Skipping {}: file not found", path.display()));
        skipped.push(path.to_path_buf());
        return;
    }

    let added = image::open(path)
        .map_err(anyhow::Error::from)
        .and_then(|img| doc.add_page(&img, layout));
    match added {
        Ok(()) => crate::log(&format!("Added {}", path.display())),
        Err(e) => {
            crate::log(&format!("Skipping {}: {}", path.display(), e));
            skipped.push(path.to_path_buf());
        }
    }
}

fn finish<D: PdfDocument>(
    mut doc: D,
    pacer: &Pacer,
    pdf_path: PathBuf,
    skipped: Vec<PathBuf>,
) -> Result<AssemblyReport> {
    pacer.check()?;
    if doc.page_count() == 0 {
        return Err(PipelineError::NoImages.into());
    }

    doc.write(&pdf_path)?;
    crate::log(&format!(
        "Saved {} pages to {}",
        doc.page_count(),
        pdf_path.display()
    ));
    if !skipped.is_empty() {
        crate::log(&format!("{} images were skipped", skipped.len()));
    }

    Ok(AssemblyReport {
        pdf_path,
        pages_added: doc.page_count(),
        skipped,
    })
}

/// Builds `pdf/{chapter}_{start}_{end}.pdf` from the screenshots of `start..=end`.
///
/// Each image gets a page of its own size.
pub fn assemble_range<D: PdfDocument>(
    mut doc: D,
    pacer: &Pacer,
    output_dir: &Path,
    start_page: u32,
    end_page: u32,
    chapter: Option<&str>,
) -> Result<AssemblyReport> {
    crate::log("Converting images to PDF");

    let mut skipped = Vec::new();
    for page in start_page..=end_page {
        pacer.check()?;
        let path = image_path(output_dir, page, chapter);
        add_image(&mut doc, &path, PageLayout::Natural, &mut skipped);
    }

    let pdf_path = pdf_path(
        output_dir,
        start_page as u64,
        end_page as u64,
        chapter,
    );
    finish(doc, pacer, pdf_path, skipped)
}

/// Builds a PDF from every screenshot in the image directory.
///
/// Images are scaled to the printable width of `geometry`. The output is named
/// after the lowest and highest page numbers found.
pub fn assemble_scan<D: PdfDocument>(
    mut doc: D,
    pacer: &Pacer,
    output_dir: &Path,
    chapter: Option<&str>,
    geometry: PageGeometry,
) -> Result<AssemblyReport> {
    let dir = image_dir(output_dir);
    crate::log(&format!("Scanning {} for images", dir.display()));

    let images = scan_images(&dir, chapter)?;
    let (Some(first), Some(last)) = (images.first(), images.last()) else {
        return Err(PipelineError::NoImages.into());
    };
    let pdf_path = pdf_path(output_dir, first.page, last.page, chapter);
    crate::log(&format!(
        "Found {} images, pages {} to {}",
        images.len(),
        first.page,
        last.page
    ));

    let mut skipped = Vec::new();
    for image in &images {
        pacer.check()?;
        add_image(
            &mut doc,
            &image.path,
            PageLayout::FitWidth(geometry),
            &mut skipped,
        );
    }

    finish(doc, pacer, pdf_path, skipped)
}
